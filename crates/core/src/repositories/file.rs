//! Filesystem-backed document repository.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   disease_rules.json
//!   disease_symptoms.json
//!   symptom_questions.json
//!   disease_descriptions/<disease>.txt
//!   disease_treatments/<disease>.txt
//!   patients/<patient_id>.json
//! ```
//!
//! Writes go to a temporary sibling file which is synced and then renamed over the destination,
//! so a reader never sees a half-written document.

use crate::config::CoreConfig;
use crate::constants::{DOCUMENT_EXTENSION, JSON_EXTENSION};
use crate::repositories::{DocumentKey, DocumentRepository};
use crate::{MedexError, MedexResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Document repository rooted at the configured data directory.
#[derive(Clone, Debug)]
pub struct FileRepository {
    cfg: Arc<CoreConfig>,
}

impl FileRepository {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Creates the data directory layout and empty mapping files that are missing.
    ///
    /// Existing files are left untouched, so this is safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::StorageDirCreation` if a directory cannot be created, or
    /// `MedexError::FileWrite` if an empty mapping cannot be written.
    pub fn prepare(&self) -> MedexResult<()> {
        for dir in [
            self.cfg.data_dir().to_path_buf(),
            self.cfg.descriptions_dir(),
            self.cfg.treatments_dir(),
            self.cfg.patients_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(MedexError::StorageDirCreation)?;
        }

        for key in [
            DocumentKey::Rules,
            DocumentKey::SymptomLists,
            DocumentKey::Questions,
        ] {
            if !self.exists(&key)? {
                tracing::info!("creating empty {}", key.describe());
                self.save(&key, "{}")?;
            }
        }

        Ok(())
    }

    /// Resolves the on-disk location of a document.
    pub fn path_for(&self, key: &DocumentKey) -> PathBuf {
        match key {
            DocumentKey::Rules => self.cfg.rules_file(),
            DocumentKey::SymptomLists => self.cfg.symptom_lists_file(),
            DocumentKey::Questions => self.cfg.questions_file(),
            DocumentKey::Description(disease) => self
                .cfg
                .descriptions_dir()
                .join(format!("{disease}.{DOCUMENT_EXTENSION}")),
            DocumentKey::Treatment(disease) => self
                .cfg
                .treatments_dir()
                .join(format!("{disease}.{DOCUMENT_EXTENSION}")),
            DocumentKey::History(patient) => self
                .cfg
                .patients_dir()
                .join(format!("{patient}.{JSON_EXTENSION}")),
        }
    }
}

impl DocumentRepository for FileRepository {
    fn exists(&self, key: &DocumentKey) -> MedexResult<bool> {
        Ok(self.path_for(key).is_file())
    }

    fn load(&self, key: &DocumentKey) -> MedexResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MedexError::FileRead {
                document: key.describe(),
                source,
            }),
        }
    }

    fn save(&self, key: &DocumentKey, contents: &str) -> MedexResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(MedexError::StorageDirCreation)?;
        }

        atomic_write(&path, contents.as_bytes()).map_err(|source| MedexError::FileWrite {
            document: key.describe(),
            source,
        })
    }
}

/// Write `data` to `dest` via a synced temp file and a rename.
fn atomic_write(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let file_name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dest.with_file_name(format!(
        ".{file_name}.{}.tmp",
        uuid::Uuid::new_v4().simple()
    ));

    let write_tmp = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()
    };

    if let Err(e) = write_tmp().and_then(|()| fs::rename(&tmp, dest)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    Ok(())
}
