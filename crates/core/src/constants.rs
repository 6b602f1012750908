//! Constants used throughout the medex core crate.
//!
//! This module contains all path, filename and fixed-text constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for knowledge and patient data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Filename for the disease -> symptom rule mapping.
pub const RULES_FILENAME: &str = "disease_rules.json";

/// Filename for the disease -> present-symptom list mapping.
pub const SYMPTOM_LISTS_FILENAME: &str = "disease_symptoms.json";

/// Filename for the symptom -> question mapping.
pub const QUESTIONS_FILENAME: &str = "symptom_questions.json";

/// Directory name for per-disease description texts.
pub const DESCRIPTIONS_DIR_NAME: &str = "disease_descriptions";

/// Directory name for per-disease treatment texts.
pub const TREATMENTS_DIR_NAME: &str = "disease_treatments";

/// Directory name for per-patient interaction ledgers.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Extension of description and treatment documents.
pub const DOCUMENT_EXTENSION: &str = "txt";

/// Extension of structured documents.
pub const JSON_EXTENSION: &str = "json";

/// Returned when a disease has no stored description.
pub const DESCRIPTION_PLACEHOLDER: &str = "Description unavailable for this disease.";

/// Returned when a disease has no stored treatment.
pub const TREATMENT_PLACEHOLDER: &str = "Advice or treatment unavailable for this disease.";

/// Returned when no disease scores above zero.
pub const NO_CONFIDENT_MATCH_MESSAGE: &str =
    "No disease detected with confidence from the provided symptoms.";

/// Field added to every ledger record at write time.
pub const TIMESTAMP_FIELD: &str = "timestamp";
