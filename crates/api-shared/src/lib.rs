//! # API Shared
//!
//! Shared definitions for the medex front ends.
//!
//! Contains:
//! - Request and response bodies (`dto` module), with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Symptom answers travel as plain string maps here; validation happens in `medex-core`.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
