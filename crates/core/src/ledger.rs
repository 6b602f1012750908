//! Per-patient interaction history.
//!
//! Each patient has one append-only ledger: a JSON array of interaction records. A record is the
//! caller's JSON object plus a `timestamp` (RFC 3339, UTC, microsecond precision) assigned when it
//! is written. Records are never changed or removed once appended.
//!
//! Appends to the same patient are serialised by a per-patient lock; appends to different patients
//! do not wait for each other. A patient's lock lives only while an append holds or waits on it.

use crate::constants::TIMESTAMP_FIELD;
use crate::repositories::{DocumentKey, DocumentRepository};
use crate::{MedexError, MedexResult};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use medex_types::PatientId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One stored interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Append-only interaction ledgers keyed by patient.
#[derive(Debug)]
pub struct PatientLedger {
    repo: Arc<dyn DocumentRepository>,
    locks: Mutex<HashMap<PatientId, Arc<Mutex<()>>>>,
}

impl PatientLedger {
    pub fn new(repo: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Appends `payload` to the patient's ledger, creating the ledger on first use.
    ///
    /// Any `timestamp` field in the payload is replaced by the server-assigned one. Stamps are
    /// strictly increasing within a ledger: when the clock has not moved past the previous record
    /// the new record is stamped one microsecond after it.
    ///
    /// # Returns
    ///
    /// The record as stored.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::Malformed` if the existing ledger cannot be parsed, or a storage error
    /// if it cannot be read or written.
    pub fn append_interaction(
        &self,
        patient: &PatientId,
        payload: Map<String, Value>,
    ) -> MedexResult<InteractionRecord> {
        self.append_at(patient, payload, Utc::now())
    }

    fn append_at(
        &self,
        patient: &PatientId,
        payload: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> MedexResult<InteractionRecord> {
        let lock = self.lock_for(patient)?;
        let appended = match lock.lock() {
            Ok(_guard) => self.append_locked(patient, payload, now),
            Err(_) => Err(MedexError::LockPoisoned("patient ledger")),
        };
        drop(lock);
        self.release_lock(patient);
        appended
    }

    /// Appends under the patient's lock, which the caller holds.
    fn append_locked(
        &self,
        patient: &PatientId,
        mut payload: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> MedexResult<InteractionRecord> {
        let key = DocumentKey::History(patient.clone());
        let mut records = self.read_records(&key)?.unwrap_or_default();

        let now = now.trunc_subsecs(6);
        let timestamp = match records.last() {
            Some(last) if now <= last.timestamp => last.timestamp + Duration::microseconds(1),
            _ => now,
        };

        payload.remove(TIMESTAMP_FIELD);
        let record = InteractionRecord { timestamp, payload };
        records.push(record.clone());

        let contents =
            serde_json::to_string_pretty(&records).map_err(|source| MedexError::Serialization {
                document: key.describe(),
                source,
            })?;
        self.repo.save(&key, &contents)?;

        tracing::info!(
            patient = %patient,
            records = records.len(),
            "interaction appended"
        );
        Ok(record)
    }

    /// The full ledger of `patient`, oldest record first.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::HistoryNotFound` when the patient has no ledger at all. A ledger that
    /// exists but holds no records is returned as an empty vector.
    pub fn history(&self, patient: &PatientId) -> MedexResult<Vec<InteractionRecord>> {
        let key = DocumentKey::History(patient.clone());
        self.read_records(&key)?
            .ok_or_else(|| MedexError::HistoryNotFound(patient.clone()))
    }

    fn read_records(&self, key: &DocumentKey) -> MedexResult<Option<Vec<InteractionRecord>>> {
        self.repo
            .load(key)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| MedexError::Malformed {
                    document: key.describe(),
                    source,
                })
            })
            .transpose()
    }

    fn lock_for(&self, patient: &PatientId) -> MedexResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| MedexError::LockPoisoned("patient ledger locks"))?;
        Ok(locks.entry(patient.clone()).or_default().clone())
    }

    /// Forgets the patient's lock once no append holds or waits on it.
    fn release_lock(&self, patient: &PatientId) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        if locks
            .get(patient)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(patient);
        }
    }
}

/// RFC 3339 timestamps, also accepting zone-less ISO-8601 stamps as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}
