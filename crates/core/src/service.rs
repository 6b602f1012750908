//! The medex service: the seven operations front ends call.
//!
//! [`MedexService`] ties the knowledge store, the scoring engine, the question recommender and the
//! patient ledger together behind one cheaply clonable handle. It is constructed once at process
//! start and shared; there is no global state.

use crate::config::CoreConfig;
use crate::constants::NO_CONFIDENT_MATCH_MESSAGE;
use crate::knowledge::{KnowledgeStore, RuleAdded};
use crate::ledger::{InteractionRecord, PatientLedger};
use crate::model::{DiseaseRule, SymptomReport};
use crate::repositories::{DocumentRepository, FileRepository};
use crate::{questions, scoring, MedexResult};
use medex_types::{DiseaseName, NonEmptyText, PatientId, SymptomKey};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of a diagnosis attempt.
///
/// Not finding a confident match is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    Confident {
        disease: DiseaseName,
        score: usize,
        description: String,
        treatment: String,
    },
    NoConfidentMatch {
        message: String,
    },
}

/// Description and treatment text for one disease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseExplanation {
    pub disease: DiseaseName,
    pub description: String,
    pub treatment: String,
}

/// Diagnosis, recommendation, rule and history operations. No API concerns.
#[derive(Clone, Debug)]
pub struct MedexService {
    knowledge: Arc<KnowledgeStore>,
    ledger: Arc<PatientLedger>,
}

impl MedexService {
    /// Opens the file-backed store described by `cfg`, creating missing directories and empty
    /// mappings first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the layout cannot be created or a mapping is malformed.
    pub fn open(cfg: Arc<CoreConfig>) -> MedexResult<Self> {
        let repo = FileRepository::new(cfg.clone());
        repo.prepare()?;
        tracing::info!(data_dir = %cfg.data_dir().display(), "opening knowledge store");
        Self::with_repository(Arc::new(repo))
    }

    /// Builds the service over any repository, e.g. a `MemoryRepository` in tests.
    pub fn with_repository(repo: Arc<dyn DocumentRepository>) -> MedexResult<Self> {
        let knowledge = KnowledgeStore::load(repo.clone())?;
        Ok(Self {
            knowledge: Arc::new(knowledge),
            ledger: Arc::new(PatientLedger::new(repo)),
        })
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn ledger(&self) -> &PatientLedger {
        &self.ledger
    }

    /// Re-reads the knowledge mappings from storage.
    pub fn reload(&self) -> MedexResult<()> {
        self.knowledge.reload()
    }

    /// Scores every known disease against `report` and returns the best match with its
    /// documents.
    pub fn diagnose(&self, report: &SymptomReport) -> MedexResult<Diagnosis> {
        let best = self
            .knowledge
            .read(|base| scoring::best_match(base, report))?;

        let Some(best) = best else {
            return Ok(Diagnosis::NoConfidentMatch {
                message: NO_CONFIDENT_MATCH_MESSAGE.to_owned(),
            });
        };

        Ok(Diagnosis::Confident {
            description: self.knowledge.description(&best.disease)?,
            treatment: self.knowledge.treatment(&best.disease)?,
            disease: best.disease,
            score: best.score,
        })
    }

    /// All known symptom keys in ascending order.
    pub fn list_symptoms(&self) -> MedexResult<Vec<SymptomKey>> {
        self.knowledge
            .read(|base| base.symptom_catalog().into_iter().collect())
    }

    /// Questions for the symptoms not yet in `report`, most discriminating first.
    pub fn suggest_questions(&self, report: &SymptomReport) -> MedexResult<Vec<String>> {
        self.knowledge
            .read(|base| questions::suggest_questions(base, report))
    }

    /// Adds a rule for a new disease. See [`KnowledgeStore::add_rule`].
    pub fn add_rule(&self, disease: DiseaseName, rule: DiseaseRule) -> MedexResult<RuleAdded> {
        self.knowledge.add_rule(disease, rule)
    }

    /// Registers a new symptom and its question. See [`KnowledgeStore::add_symptom`].
    pub fn add_symptom(&self, key: SymptomKey, question: &NonEmptyText) -> MedexResult<()> {
        self.knowledge.add_symptom(key, question)
    }

    /// Stores the description and treatment texts of `disease`.
    pub fn document_disease(
        &self,
        disease: &DiseaseName,
        description: &NonEmptyText,
        treatment: &NonEmptyText,
    ) -> MedexResult<()> {
        self.knowledge
            .write_documents(disease, description, treatment)
    }

    /// Description and treatment of `disease`, with placeholders for missing texts.
    pub fn explain_disease(&self, disease: &DiseaseName) -> MedexResult<DiseaseExplanation> {
        Ok(DiseaseExplanation {
            disease: disease.clone(),
            description: self.knowledge.description(disease)?,
            treatment: self.knowledge.treatment(disease)?,
        })
    }

    /// Every interaction recorded for `patient`. Fails with `HistoryNotFound` for a patient
    /// never seen.
    pub fn patient_history(&self, patient: &PatientId) -> MedexResult<Vec<InteractionRecord>> {
        self.ledger.history(patient)
    }

    /// Stamps and appends one interaction to the patient's ledger.
    pub fn append_interaction(
        &self,
        patient: &PatientId,
        interaction: Map<String, Value>,
    ) -> MedexResult<InteractionRecord> {
        self.ledger.append_interaction(patient, interaction)
    }
}
