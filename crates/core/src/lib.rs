//! # Medex Core
//!
//! Core logic for the medex rule-based diagnosis assistant.
//!
//! This crate owns the knowledge base and everything computed from it:
//! - Disease rules, symptom questions and disease documents, persisted under the data directory
//! - Scoring a patient's symptom report against every rule
//! - Recommending the next questions to ask
//! - Adding rules and symptoms at runtime
//! - Append-only per-patient interaction ledgers
//!
//! **No API concerns**: HTTP servers, CLI parsing and agent runtimes belong in `api-rest`,
//! `medex-cli` or the caller. [`tools`] exposes the operations as function calls for agents.

pub mod config;
pub mod constants;
pub mod error;
pub mod knowledge;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod questions;
pub mod repositories;
pub mod scoring;
pub mod service;
pub mod tools;

pub use config::CoreConfig;
pub use constants::DEFAULT_DATA_DIR;
pub use error::{MedexError, MedexResult};
pub use knowledge::{KnowledgeBase, KnowledgeStore, RuleAdded};
pub use ledger::{InteractionRecord, PatientLedger};
pub use model::{DiseaseRule, Presence, SymptomReport};
pub use service::{Diagnosis, DiseaseExplanation, MedexService};

pub use medex_types::{DiseaseName, NonEmptyText, PatientId, SymptomKey, TextError};
