//! Document repositories.
//!
//! Everything the core persists is a named UTF-8 document addressed by a [`DocumentKey`]. The
//! knowledge store and the ledger only ever talk to a [`DocumentRepository`], so the scoring and
//! recommender logic never touches the filesystem directly.
//!
//! - [`FileRepository`]: the on-disk layout under `CoreConfig::data_dir`
//! - [`MemoryRepository`]: an in-memory fake for tests and embedding

mod file;
mod memory;

pub use file::FileRepository;
pub use memory::MemoryRepository;

use crate::constants::{QUESTIONS_FILENAME, RULES_FILENAME, SYMPTOM_LISTS_FILENAME};
use crate::MedexResult;
use medex_types::{DiseaseName, PatientId};

/// Address of one persisted document.
///
/// This enum is deliberately closed: the core owns a fixed set of mappings plus per-disease and
/// per-patient documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// disease -> rule mapping
    Rules,
    /// disease -> list of present symptoms
    SymptomLists,
    /// symptom -> question text
    Questions,
    Description(DiseaseName),
    Treatment(DiseaseName),
    /// One patient's interaction ledger
    History(PatientId),
}

impl DocumentKey {
    /// Human-readable name used in logs and error messages.
    pub fn describe(&self) -> String {
        match self {
            DocumentKey::Rules => RULES_FILENAME.to_owned(),
            DocumentKey::SymptomLists => SYMPTOM_LISTS_FILENAME.to_owned(),
            DocumentKey::Questions => QUESTIONS_FILENAME.to_owned(),
            DocumentKey::Description(disease) => format!("description of {disease}"),
            DocumentKey::Treatment(disease) => format!("treatment of {disease}"),
            DocumentKey::History(patient) => format!("history of {patient}"),
        }
    }
}

/// Storage capability used by the knowledge store and the ledger.
///
/// # Contract
/// - `load` returns `Ok(None)` when the document does not exist; any other failure is an error.
/// - `save` replaces the whole document. Readers observe either the old or the new contents,
///   never a partial write.
pub trait DocumentRepository: Send + Sync + std::fmt::Debug {
    fn exists(&self, key: &DocumentKey) -> MedexResult<bool>;

    fn load(&self, key: &DocumentKey) -> MedexResult<Option<String>>;

    fn save(&self, key: &DocumentKey, contents: &str) -> MedexResult<()>;
}
