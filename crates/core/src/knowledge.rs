//! Diagnostic knowledge: disease rules, symptom questions and disease documents.
//!
//! ## Ownership
//!
//! [`KnowledgeStore`] is the only writer of the three knowledge mappings and of the per-disease
//! description/treatment texts. It keeps the mappings in memory as a [`KnowledgeBase`] behind a
//! lock. Every mutation holds the write lock across the whole read-modify-persist cycle and starts
//! from freshly re-read mappings, so two writers in one process can never lose each other's
//! update, and a write made through another handle on the same data directory is seen before
//! the next one is made.
//!
//! ## Catalog invariant
//!
//! The symptom catalog is not stored: it is the union of the keys of all rules. Whenever a new
//! key enters the catalog (through [`KnowledgeStore::add_rule`] or
//! [`KnowledgeStore::add_symptom`]) every other rule is backfilled with that key set to `no`.

use crate::constants::{DESCRIPTION_PLACEHOLDER, TREATMENT_PLACEHOLDER};
use crate::logging::sanitise_for_log;
use crate::model::DiseaseRule;
use crate::repositories::{DocumentKey, DocumentRepository};
use crate::{MedexError, MedexResult};
use medex_types::{DiseaseName, NonEmptyText, SymptomKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

/// In-memory view of the three knowledge mappings.
///
/// All mappings are sorted by key. Scoring and question ranking iterate in that order, which makes
/// their tie-breaks alphabetical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    rules: BTreeMap<DiseaseName, DiseaseRule>,
    symptom_lists: BTreeMap<DiseaseName, Vec<SymptomKey>>,
    questions: BTreeMap<SymptomKey, String>,
}

impl KnowledgeBase {
    pub fn new(
        rules: BTreeMap<DiseaseName, DiseaseRule>,
        symptom_lists: BTreeMap<DiseaseName, Vec<SymptomKey>>,
        questions: BTreeMap<SymptomKey, String>,
    ) -> Self {
        Self {
            rules,
            symptom_lists,
            questions,
        }
    }

    pub fn with_rule(mut self, disease: DiseaseName, rule: DiseaseRule) -> Self {
        self.rules.insert(disease, rule);
        self
    }

    pub fn with_question(mut self, key: SymptomKey, question: impl Into<String>) -> Self {
        self.questions.insert(key, question.into());
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = (&DiseaseName, &DiseaseRule)> {
        self.rules.iter()
    }

    pub fn rule(&self, disease: &DiseaseName) -> Option<&DiseaseRule> {
        self.rules.get(disease)
    }

    pub fn contains_disease(&self, disease: &DiseaseName) -> bool {
        self.rules.contains_key(disease)
    }

    pub fn disease_count(&self) -> usize {
        self.rules.len()
    }

    /// Every symptom key mentioned by at least one rule.
    pub fn symptom_catalog(&self) -> BTreeSet<SymptomKey> {
        self.rules
            .values()
            .flat_map(|rule| rule.keys().cloned())
            .collect()
    }

    /// The question to ask for `key`, or a generated one when none is stored.
    pub fn question_for(&self, key: &SymptomKey) -> String {
        self.questions
            .get(key)
            .cloned()
            .unwrap_or_else(|| format!("Do you have this symptom: {key}? (yes/no)"))
    }

    pub fn has_question(&self, key: &SymptomKey) -> bool {
        self.questions.contains_key(key)
    }

    /// Symptoms recorded as present for `disease`, if the disease has a recorded list.
    pub fn symptoms_of(&self, disease: &DiseaseName) -> Option<&[SymptomKey]> {
        self.symptom_lists.get(disease).map(Vec::as_slice)
    }
}

/// Outcome of a successful [`KnowledgeStore::add_rule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAdded {
    pub disease: DiseaseName,
    /// Keys that were not in the catalog before and were backfilled into the other rules.
    pub introduced: Vec<SymptomKey>,
}

/// Persisted knowledge with an explicit load/reload lifecycle.
#[derive(Debug)]
pub struct KnowledgeStore {
    repo: Arc<dyn DocumentRepository>,
    base: RwLock<KnowledgeBase>,
}

impl KnowledgeStore {
    /// Reads the three mappings from `repo`.
    ///
    /// A missing mapping is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::Malformed` if a mapping exists but is not valid, and
    /// `MedexError::FileRead` if it cannot be read at all.
    pub fn load(repo: Arc<dyn DocumentRepository>) -> MedexResult<Self> {
        let base = read_base(repo.as_ref())?;
        tracing::info!(
            diseases = base.disease_count(),
            questions = base.questions.len(),
            "knowledge base loaded"
        );
        Ok(Self {
            repo,
            base: RwLock::new(base),
        })
    }

    /// Re-reads the mappings, replacing the in-memory view.
    ///
    /// On error the previous view is kept.
    pub fn reload(&self) -> MedexResult<()> {
        let mut guard = self
            .base
            .write()
            .map_err(|_| MedexError::LockPoisoned("knowledge base"))?;
        *guard = read_base(self.repo.as_ref())?;
        tracing::info!(diseases = guard.disease_count(), "knowledge base reloaded");
        Ok(())
    }

    /// Runs `f` against the current knowledge base under the read lock.
    pub fn read<T>(&self, f: impl FnOnce(&KnowledgeBase) -> T) -> MedexResult<T> {
        let guard = self
            .base
            .read()
            .map_err(|_| MedexError::LockPoisoned("knowledge base"))?;
        Ok(f(&guard))
    }

    /// A copy of the current knowledge base.
    pub fn snapshot(&self) -> MedexResult<KnowledgeBase> {
        self.read(KnowledgeBase::clone)
    }

    /// Stored description of `disease`, or a fixed placeholder when there is none.
    pub fn description(&self, disease: &DiseaseName) -> MedexResult<String> {
        self.document(&DocumentKey::Description(disease.clone()), DESCRIPTION_PLACEHOLDER)
    }

    /// Stored treatment advice for `disease`, or a fixed placeholder when there is none.
    pub fn treatment(&self, disease: &DiseaseName) -> MedexResult<String> {
        self.document(&DocumentKey::Treatment(disease.clone()), TREATMENT_PLACEHOLDER)
    }

    fn document(&self, key: &DocumentKey, placeholder: &str) -> MedexResult<String> {
        let text = self.repo.load(key)?;
        Ok(text
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| placeholder.to_owned()))
    }

    /// Stores the description and treatment texts for `disease`, replacing earlier ones.
    ///
    /// The disease does not need a rule yet; documents may be written before or after it.
    pub fn write_documents(
        &self,
        disease: &DiseaseName,
        description: &NonEmptyText,
        treatment: &NonEmptyText,
    ) -> MedexResult<()> {
        let _guard = self
            .base
            .write()
            .map_err(|_| MedexError::LockPoisoned("knowledge base"))?;

        self.repo.save(
            &DocumentKey::Description(disease.clone()),
            description.as_str(),
        )?;
        self.repo
            .save(&DocumentKey::Treatment(disease.clone()), treatment.as_str())?;

        tracing::info!(%disease, "disease documents written");
        Ok(())
    }

    /// Adds a rule for a disease the store has never seen.
    ///
    /// The rule is stored as given. Keys it introduces to the catalog are backfilled as `no` into
    /// every pre-existing rule, and the disease's present symptoms are recorded in the symptom
    /// lists mapping.
    ///
    /// The mappings are re-read from storage under the write lock, so rules written by another
    /// handle on the same data directory are neither lost nor duplicated.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::DuplicateDisease` if `disease` already has a rule (nothing is
    /// written), `MedexError::InvalidInput` for a rule without symptoms, or a storage error if
    /// persisting fails.
    pub fn add_rule(&self, disease: DiseaseName, rule: DiseaseRule) -> MedexResult<RuleAdded> {
        if rule.is_empty() {
            return Err(MedexError::InvalidInput(format!(
                "rule for '{disease}' must mention at least one symptom"
            )));
        }

        let mut guard = self
            .base
            .write()
            .map_err(|_| MedexError::LockPoisoned("knowledge base"))?;
        let mut current = read_base(self.repo.as_ref())?;

        if current.contains_disease(&disease) {
            *guard = current;
            return Err(MedexError::DuplicateDisease(disease));
        }

        let catalog = current.symptom_catalog();
        let introduced: Vec<SymptomKey> = rule
            .keys()
            .filter(|key| !catalog.contains(*key))
            .cloned()
            .collect();

        for existing in current.rules.values_mut() {
            for key in &introduced {
                existing.backfill(key);
            }
        }
        current
            .symptom_lists
            .insert(disease.clone(), rule.present_symptoms());
        current.rules.insert(disease.clone(), rule);

        let rules = to_document(&DocumentKey::Rules, &current.rules)?;
        let symptom_lists = to_document(&DocumentKey::SymptomLists, &current.symptom_lists)?;
        // The rules document is the commit point: a list entry without a rule is harmless and is
        // replaced when the disease is added again.
        self.repo.save(&DocumentKey::SymptomLists, &symptom_lists)?;
        self.repo.save(&DocumentKey::Rules, &rules)?;
        *guard = current;

        tracing::info!(
            disease = %sanitise_for_log(disease.as_str()),
            introduced = introduced.len(),
            "disease rule added"
        );

        Ok(RuleAdded {
            disease,
            introduced,
        })
    }

    /// Registers a new symptom with the question used to ask about it.
    ///
    /// Every existing rule that does not mention the key yet gets it as `no`. Like
    /// [`KnowledgeStore::add_rule`], this works on freshly re-read mappings.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::DuplicateSymptom` if the key already has a question.
    pub fn add_symptom(&self, key: SymptomKey, question: &NonEmptyText) -> MedexResult<()> {
        let mut guard = self
            .base
            .write()
            .map_err(|_| MedexError::LockPoisoned("knowledge base"))?;
        let mut current = read_base(self.repo.as_ref())?;

        if current.has_question(&key) {
            *guard = current;
            return Err(MedexError::DuplicateSymptom(key));
        }

        current
            .questions
            .insert(key.clone(), question.as_str().to_owned());
        let mut backfilled = 0usize;
        for rule in current.rules.values_mut() {
            if rule.backfill(&key) {
                backfilled += 1;
            }
        }

        let questions = to_document(&DocumentKey::Questions, &current.questions)?;
        let rules = if backfilled > 0 {
            Some(to_document(&DocumentKey::Rules, &current.rules)?)
        } else {
            None
        };
        self.repo.save(&DocumentKey::Questions, &questions)?;
        if let Some(rules) = rules {
            self.repo.save(&DocumentKey::Rules, &rules)?;
        }
        *guard = current;

        tracing::info!(symptom = %key, backfilled, "symptom added");
        Ok(())
    }
}

fn to_document<T: Serialize>(key: &DocumentKey, value: &T) -> MedexResult<String> {
    serde_json::to_string_pretty(value).map_err(|source| MedexError::Serialization {
        document: key.describe(),
        source,
    })
}

fn read_base(repo: &dyn DocumentRepository) -> MedexResult<KnowledgeBase> {
    Ok(KnowledgeBase {
        rules: read_mapping(repo, &DocumentKey::Rules)?,
        symptom_lists: read_mapping(repo, &DocumentKey::SymptomLists)?,
        questions: read_mapping(repo, &DocumentKey::Questions)?,
    })
}

fn read_mapping<T>(repo: &dyn DocumentRepository, key: &DocumentKey) -> MedexResult<T>
where
    T: DeserializeOwned + Default,
{
    match repo.load(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| MedexError::Malformed {
            document: key.describe(),
            source,
        }),
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Presence;
    use crate::repositories::{FileRepository, MemoryRepository};
    use crate::CoreConfig;
    use tempfile::TempDir;

    fn key(k: &str) -> SymptomKey {
        SymptomKey::new(k).unwrap()
    }

    fn disease(d: &str) -> DiseaseName {
        DiseaseName::new(d).unwrap()
    }

    fn text(t: &str) -> NonEmptyText {
        NonEmptyText::new(t).unwrap()
    }

    fn rule(pairs: &[(&str, Presence)]) -> DiseaseRule {
        pairs.iter().map(|(k, p)| (key(k), *p)).collect()
    }

    fn empty_store() -> (Arc<MemoryRepository>, KnowledgeStore) {
        let repo = Arc::new(MemoryRepository::new());
        let store = KnowledgeStore::load(repo.clone()).expect("empty store should load");
        (repo, store)
    }

    #[test]
    fn test_load_treats_missing_mappings_as_empty() {
        let (_repo, store) = empty_store();
        let base = store.snapshot().expect("snapshot should succeed");
        assert_eq!(base, KnowledgeBase::default());
    }

    #[test]
    fn test_load_rejects_malformed_rules() {
        let repo = Arc::new(MemoryRepository::with_documents([(
            DocumentKey::Rules,
            "{ not json".to_owned(),
        )]));

        let err = KnowledgeStore::load(repo).expect_err("malformed rules should fail");
        assert!(matches!(err, MedexError::Malformed { .. }));
        assert!(err.is_storage());
    }

    #[test]
    fn test_load_rejects_unknown_presence_value() {
        let repo = Arc::new(MemoryRepository::with_documents([(
            DocumentKey::Rules,
            r#"{"Flu": {"fever": "often"}}"#.to_owned(),
        )]));

        let err = KnowledgeStore::load(repo).expect_err("bad presence should fail");
        assert!(matches!(err, MedexError::Malformed { .. }));
    }

    #[test]
    fn test_add_rule_persists_pretty_sorted_json() {
        let (repo, store) = empty_store();

        store
            .add_rule(
                disease("Flu"),
                rule(&[("fever", Presence::Yes), ("cough", Presence::Yes)]),
            )
            .expect("add_rule should succeed");

        let raw = repo.load(&DocumentKey::Rules).unwrap().unwrap();
        assert_eq!(
            raw,
            "{\n  \"Flu\": {\n    \"cough\": \"yes\",\n    \"fever\": \"yes\"\n  }\n}"
        );

        let lists = repo.load(&DocumentKey::SymptomLists).unwrap().unwrap();
        let lists: BTreeMap<String, Vec<String>> = serde_json::from_str(&lists).unwrap();
        assert_eq!(lists["Flu"], vec!["cough".to_string(), "fever".to_string()]);
    }

    #[test]
    fn test_add_rule_twice_is_rejected_and_first_rule_kept() {
        let (_repo, store) = empty_store();
        let first = rule(&[("fever", Presence::Yes), ("cough", Presence::Yes)]);

        store
            .add_rule(disease("Flu"), first.clone())
            .expect("first add should succeed");
        let err = store
            .add_rule(disease("Flu"), rule(&[("rash", Presence::Yes)]))
            .expect_err("second add should fail");

        assert!(matches!(err, MedexError::DuplicateDisease(ref d) if d.as_str() == "Flu"));
        let stored = store
            .read(|kb| kb.rule(&disease("Flu")).cloned())
            .unwrap()
            .expect("rule should still exist");
        assert_eq!(stored, first);
        assert!(!store.read(|kb| kb.symptom_catalog()).unwrap().contains(&key("rash")));
    }

    #[test]
    fn test_add_rule_backfills_new_keys_into_existing_rules() {
        let (_repo, store) = empty_store();
        store
            .add_rule(disease("Flu"), rule(&[("fever", Presence::Yes)]))
            .unwrap();

        let added = store
            .add_rule(
                disease("Measles"),
                rule(&[("fever", Presence::Yes), ("rash", Presence::Yes)]),
            )
            .expect("add_rule should succeed");

        assert_eq!(added.introduced, vec![key("rash")]);
        let flu = store
            .read(|kb| kb.rule(&disease("Flu")).cloned())
            .unwrap()
            .unwrap();
        assert_eq!(flu.expected(&key("rash")), Some(Presence::No));
        assert_eq!(flu.expected(&key("fever")), Some(Presence::Yes));
    }

    #[test]
    fn test_add_rule_does_not_pad_new_rule_with_catalog() {
        let (_repo, store) = empty_store();
        store
            .add_rule(
                disease("Flu"),
                rule(&[("fever", Presence::Yes), ("cough", Presence::Yes)]),
            )
            .unwrap();
        store
            .add_rule(disease("Eczema"), rule(&[("rash", Presence::Yes)]))
            .unwrap();

        let eczema = store
            .read(|kb| kb.rule(&disease("Eczema")).cloned())
            .unwrap()
            .unwrap();
        assert_eq!(eczema.len(), 1);
        assert!(!eczema.contains(&key("fever")));
    }

    #[test]
    fn test_add_rule_rejects_empty_rule() {
        let (_repo, store) = empty_store();
        let err = store
            .add_rule(disease("Nothing"), DiseaseRule::new())
            .expect_err("empty rule should fail");
        assert!(matches!(err, MedexError::InvalidInput(_)));
    }

    #[test]
    fn test_add_symptom_backfills_and_stores_question() {
        let (repo, store) = empty_store();
        store
            .add_rule(disease("Flu"), rule(&[("fever", Presence::Yes)]))
            .unwrap();

        store
            .add_symptom(key("nausea"), &text("Do you feel sick to your stomach?"))
            .expect("add_symptom should succeed");

        let base = store.snapshot().unwrap();
        assert_eq!(
            base.rule(&disease("Flu")).unwrap().expected(&key("nausea")),
            Some(Presence::No)
        );
        assert_eq!(
            base.question_for(&key("nausea")),
            "Do you feel sick to your stomach?"
        );
        let raw = repo.load(&DocumentKey::Questions).unwrap().unwrap();
        assert!(raw.contains("nausea"));
    }

    #[test]
    fn test_add_symptom_rejects_existing_question() {
        let (_repo, store) = empty_store();
        store
            .add_symptom(key("fever"), &text("Do you have a fever?"))
            .unwrap();

        let err = store
            .add_symptom(key("Fever"), &text("Are you hot?"))
            .expect_err("duplicate symptom should fail");
        assert!(matches!(err, MedexError::DuplicateSymptom(_)));
        assert_eq!(
            store.read(|kb| kb.question_for(&key("fever"))).unwrap(),
            "Do you have a fever?"
        );
    }

    #[test]
    fn test_question_for_falls_back_to_generated_text() {
        let base = KnowledgeBase::default();
        assert_eq!(
            base.question_for(&key("chills")),
            "Do you have this symptom: chills? (yes/no)"
        );
    }

    #[test]
    fn test_documents_fall_back_to_placeholders() {
        let (_repo, store) = empty_store();
        let unknown = disease("Unknown");

        assert_eq!(store.description(&unknown).unwrap(), DESCRIPTION_PLACEHOLDER);
        assert_eq!(store.treatment(&unknown).unwrap(), TREATMENT_PLACEHOLDER);
    }

    #[test]
    fn test_write_documents_then_read_trimmed() {
        let (repo, store) = empty_store();
        let flu = disease("Flu");

        store
            .write_documents(
                &flu,
                &text("Viral infection of the airways."),
                &text("Rest, fluids and paracetamol."),
            )
            .expect("write_documents should succeed");
        repo.save(
            &DocumentKey::Description(flu.clone()),
            "\n  Viral infection of the airways.  \n",
        )
        .unwrap();

        assert_eq!(
            store.description(&flu).unwrap(),
            "Viral infection of the airways."
        );
        assert_eq!(store.treatment(&flu).unwrap(), "Rest, fluids and paracetamol.");
    }

    #[test]
    fn test_blank_document_reads_as_placeholder() {
        let flu = disease("Flu");
        let repo = Arc::new(MemoryRepository::with_documents([(
            DocumentKey::Treatment(flu.clone()),
            "   \n".to_owned(),
        )]));
        let store = KnowledgeStore::load(repo).unwrap();

        assert_eq!(store.treatment(&flu).unwrap(), TREATMENT_PLACEHOLDER);
    }

    #[test]
    fn test_reload_picks_up_external_changes() {
        let (repo, store) = empty_store();
        repo.save(&DocumentKey::Rules, r#"{"Flu": {"fever": "yes"}}"#)
            .unwrap();

        assert_eq!(store.read(|kb| kb.disease_count()).unwrap(), 0);
        store.reload().expect("reload should succeed");
        assert_eq!(store.read(|kb| kb.disease_count()).unwrap(), 1);
    }

    #[test]
    fn test_reload_keeps_previous_view_on_error() {
        let (repo, store) = empty_store();
        store
            .add_rule(disease("Flu"), rule(&[("fever", Presence::Yes)]))
            .unwrap();
        repo.save(&DocumentKey::Rules, "[1, 2").unwrap();

        assert!(store.reload().is_err());
        assert_eq!(store.read(|kb| kb.disease_count()).unwrap(), 1);
    }

    #[test]
    fn test_file_backed_store_survives_restart() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(CoreConfig::new(temp_dir.path().to_path_buf()).unwrap());
        let repo = Arc::new(FileRepository::new(cfg.clone()));
        repo.prepare().unwrap();

        {
            let store = KnowledgeStore::load(repo.clone()).unwrap();
            store
                .add_rule(disease("Grippe aviaire"), rule(&[("fièvre", Presence::Yes)]))
                .unwrap();
        }

        let store = KnowledgeStore::load(Arc::new(FileRepository::new(cfg.clone()))).unwrap();
        assert!(store
            .read(|kb| kb.contains_disease(&disease("Grippe aviaire")))
            .unwrap());
        let raw = std::fs::read_to_string(cfg.rules_file()).unwrap();
        assert!(raw.contains("fièvre"), "non-ASCII keys are stored verbatim");
    }

    #[test]
    fn test_add_rule_sees_rules_written_by_another_handle() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(CoreConfig::new(temp_dir.path().to_path_buf()).unwrap());
        let repo = Arc::new(FileRepository::new(cfg.clone()));
        repo.prepare().unwrap();

        let first = KnowledgeStore::load(repo.clone()).expect("first handle should load");
        let second = KnowledgeStore::load(repo.clone()).expect("second handle should load");

        first
            .add_rule(disease("Flu"), rule(&[("fever", Presence::Yes)]))
            .expect("first add should succeed");
        let err = second
            .add_rule(disease("Flu"), rule(&[("rash", Presence::Yes)]))
            .expect_err("rule added through the other handle should count");
        assert!(matches!(err, MedexError::DuplicateDisease(_)));

        second
            .add_rule(disease("Measles"), rule(&[("rash", Presence::Yes)]))
            .expect("second handle should add a new disease");

        let reopened = KnowledgeStore::load(Arc::new(FileRepository::new(cfg))).unwrap();
        let base = reopened.snapshot().unwrap();
        assert_eq!(
            base.rule(&disease("Flu")),
            Some(&rule(&[("fever", Presence::Yes), ("rash", Presence::No)]))
        );
        assert!(base.contains_disease(&disease("Measles")));
        assert_eq!(base.symptoms_of(&disease("Flu")), Some(&[key("fever")][..]));
    }

    #[test]
    fn test_concurrent_add_rule_keeps_every_disease() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(CoreConfig::new(temp_dir.path().to_path_buf()).unwrap());
        let repo = Arc::new(FileRepository::new(cfg.clone()));
        repo.prepare().unwrap();
        let store = Arc::new(KnowledgeStore::load(repo).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let symptom = format!("symptom_{i}");
                    store
                        .add_rule(
                            disease(&format!("Disease {i}")),
                            rule(&[(symptom.as_str(), Presence::Yes)]),
                        )
                        .expect("add_rule should succeed");
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread should not panic");
        }

        let reopened = KnowledgeStore::load(Arc::new(FileRepository::new(cfg))).unwrap();
        let base = reopened.snapshot().unwrap();
        assert_eq!(base.disease_count(), 8);
        assert_eq!(base.symptom_catalog().len(), 8);
        for i in 0..8 {
            let stored = base.rule(&disease(&format!("Disease {i}"))).unwrap();
            assert_eq!(
                stored.expected(&key(&format!("symptom_{i}"))),
                Some(Presence::Yes)
            );
        }
    }

    #[derive(Debug)]
    struct RejectingRepository {
        inner: MemoryRepository,
        rejected: DocumentKey,
    }

    impl DocumentRepository for RejectingRepository {
        fn exists(&self, key: &DocumentKey) -> MedexResult<bool> {
            self.inner.exists(key)
        }

        fn load(&self, key: &DocumentKey) -> MedexResult<Option<String>> {
            self.inner.load(key)
        }

        fn save(&self, key: &DocumentKey, contents: &str) -> MedexResult<()> {
            if *key == self.rejected {
                return Err(MedexError::FileWrite {
                    document: key.describe(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.save(key, contents)
        }
    }

    #[test]
    fn test_failed_add_rule_commits_nothing() {
        let repo = Arc::new(RejectingRepository {
            inner: MemoryRepository::new(),
            rejected: DocumentKey::SymptomLists,
        });
        let store = KnowledgeStore::load(repo.clone()).unwrap();

        let err = store
            .add_rule(disease("Flu"), rule(&[("fever", Presence::Yes)]))
            .expect_err("add_rule should fail");

        assert!(err.is_storage());
        assert_eq!(repo.load(&DocumentKey::Rules).unwrap(), None);
        assert_eq!(store.read(|kb| kb.disease_count()).unwrap(), 0);
    }
}
