//! In-memory document repository.

use crate::repositories::{DocumentKey, DocumentRepository};
use crate::{MedexError, MedexResult};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    documents: RwLock<HashMap<DocumentKey, String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a repository with existing documents.
    pub fn with_documents(documents: impl IntoIterator<Item = (DocumentKey, String)>) -> Self {
        Self {
            documents: RwLock::new(documents.into_iter().collect()),
        }
    }
}

impl DocumentRepository for MemoryRepository {
    fn exists(&self, key: &DocumentKey) -> MedexResult<bool> {
        let documents = self
            .documents
            .read()
            .map_err(|_| MedexError::LockPoisoned("memory repository"))?;
        Ok(documents.contains_key(key))
    }

    fn load(&self, key: &DocumentKey) -> MedexResult<Option<String>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| MedexError::LockPoisoned("memory repository"))?;
        Ok(documents.get(key).cloned())
    }

    fn save(&self, key: &DocumentKey, contents: &str) -> MedexResult<()> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| MedexError::LockPoisoned("memory repository"))?;
        documents.insert(key.clone(), contents.to_owned());
        Ok(())
    }
}
