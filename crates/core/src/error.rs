use medex_types::{DiseaseName, PatientId, SymptomKey, TextError};

#[derive(Debug, thiserror::Error)]
pub enum MedexError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read {document}: {source}")]
    FileRead {
        document: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {document}: {source}")]
    FileWrite {
        document: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{document} is malformed: {source}")]
    Malformed {
        document: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {document}: {source}")]
    Serialization {
        document: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("disease '{0}' already exists")]
    DuplicateDisease(DiseaseName),
    #[error("symptom '{0}' already exists")]
    DuplicateSymptom(SymptomKey),
    #[error("no history found for patient {0}")]
    HistoryNotFound(PatientId),
}

impl MedexError {
    /// True for failures of the persisted state itself. Everything else is a condition the caller
    /// is expected to handle and carry on.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            MedexError::StorageDirCreation(_)
                | MedexError::FileRead { .. }
                | MedexError::FileWrite { .. }
                | MedexError::Malformed { .. }
                | MedexError::Serialization { .. }
                | MedexError::LockPoisoned(_)
        )
    }
}

pub type MedexResult<T> = std::result::Result<T, MedexError>;
