//! Symptom rule and report types.
//!
//! Rules and reports share the same shape, a sorted mapping from [`SymptomKey`] to
//! [`Presence`], but play different roles: a rule is the expected pattern for one disease, a report
//! is what the patient answered so far. A key missing from a report means "not asked yet", never
//! "no".

use crate::{MedexError, MedexResult};
use medex_types::SymptomKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A yes/no answer or expectation for one symptom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Yes,
    No,
}

impl Presence {
    /// Parses `yes`/`no` in any letter case.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("yes") {
            Some(Presence::Yes)
        } else if value.eq_ignore_ascii_case("no") {
            Some(Presence::No)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Yes => "yes",
            Presence::No => "no",
        }
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Presence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Presence::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("expected yes or no, got '{s}'")))
    }
}

/// The expected yes/no pattern of symptoms that characterises one disease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiseaseRule(BTreeMap<SymptomKey, Presence>);

impl DiseaseRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected(&self, key: &SymptomKey) -> Option<Presence> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &SymptomKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SymptomKey> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymptomKey, Presence)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    /// Keys this disease expects to be present.
    pub fn present_symptoms(&self) -> Vec<SymptomKey> {
        self.iter()
            .filter(|(_, expected)| *expected == Presence::Yes)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn with(mut self, key: SymptomKey, expected: Presence) -> Self {
        self.0.insert(key, expected);
        self
    }

    /// Adds `key` as `No` unless the rule already mentions it. Returns whether the rule changed.
    pub(crate) fn backfill(&mut self, key: &SymptomKey) -> bool {
        if self.0.contains_key(key) {
            return false;
        }
        self.0.insert(key.clone(), Presence::No);
        true
    }
}

impl FromIterator<(SymptomKey, Presence)> for DiseaseRule {
    fn from_iter<I: IntoIterator<Item = (SymptomKey, Presence)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<BTreeMap<String, String>> for DiseaseRule {
    type Error = MedexError;

    fn try_from(raw: BTreeMap<String, String>) -> MedexResult<Self> {
        parse_answers(raw).map(Self)
    }
}

/// What the patient has answered so far, keyed by symptom.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct SymptomReport(BTreeMap<SymptomKey, Presence>);

impl SymptomReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a report from raw string pairs, validating keys and answers.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::Text` for an invalid symptom key and `MedexError::InvalidInput` for an
    /// answer other than yes/no.
    pub fn from_raw<K, V>(raw: impl IntoIterator<Item = (K, V)>) -> MedexResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        parse_answers(raw).map(Self)
    }

    pub fn with(mut self, key: SymptomKey, answer: Presence) -> Self {
        self.0.insert(key, answer);
        self
    }

    pub fn get(&self, key: &SymptomKey) -> Option<Presence> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &SymptomKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymptomKey, Presence)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }
}

impl TryFrom<BTreeMap<String, String>> for SymptomReport {
    type Error = MedexError;

    fn try_from(raw: BTreeMap<String, String>) -> MedexResult<Self> {
        Self::from_raw(raw)
    }
}

fn parse_answers<K, V>(
    raw: impl IntoIterator<Item = (K, V)>,
) -> MedexResult<BTreeMap<SymptomKey, Presence>>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut answers = BTreeMap::new();
    for (key, value) in raw {
        let key = SymptomKey::new(key.as_ref())?;
        let presence = Presence::parse(value.as_ref()).ok_or_else(|| {
            MedexError::InvalidInput(format!(
                "symptom '{key}' must be answered yes or no, got '{}'",
                value.as_ref()
            ))
        })?;
        // Keys that differ only in case or surrounding space name the same symptom.
        if answers.contains_key(&key) {
            return Err(MedexError::InvalidInput(format!(
                "symptom '{key}' is answered more than once"
            )));
        }
        answers.insert(key, presence);
    }
    Ok(answers)
}
