//! Function-call contract for conversational agents.
//!
//! An agent runtime registers [`declarations`] as callable functions and forwards each call as a
//! tool name plus JSON arguments to [`dispatch`]. Responses use a status envelope:
//!
//! ```json
//! {"status": "success", "diagnosis": "Flu", "score": 2, ...}
//! {"status": "error", "message": "disease 'Flu' already exists"}
//! ```
//!
//! Conditions the conversation can recover from (no confident match, duplicate rule, unknown
//! patient, bad arguments) come back as `error` envelopes. Only storage failures are returned as
//! `Err`.

use crate::ledger::InteractionRecord;
use crate::logging::sanitise_for_log;
use crate::model::{DiseaseRule, SymptomReport};
use crate::service::{Diagnosis, MedexService};
use crate::{MedexError, MedexResult};
use chrono::SecondsFormat;
use medex_types::{DiseaseName, PatientId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Diagnose { symptoms: SymptomReport },
    ListSymptoms,
    SuggestQuestions { symptoms: SymptomReport },
    AddNewRule { disease: DiseaseName, symptoms: DiseaseRule },
    ExplainDisease { disease: DiseaseName },
    GetPatientHistory { patient_id: PatientId },
    SavePatientInteraction {
        patient_id: PatientId,
        interaction: Map<String, Value>,
    },
}

#[derive(Deserialize)]
struct DiagnoseArgs {
    symptoms: SymptomReport,
}

#[derive(Deserialize)]
struct SuggestQuestionsArgs {
    #[serde(default)]
    symptoms: Option<SymptomReport>,
}

#[derive(Deserialize)]
struct AddNewRuleArgs {
    disease: DiseaseName,
    symptoms: DiseaseRule,
}

#[derive(Deserialize)]
struct DiseaseArgs {
    disease: DiseaseName,
}

#[derive(Deserialize)]
struct PatientArgs {
    patient_id: PatientId,
}

#[derive(Deserialize)]
struct InteractionArgs {
    patient_id: PatientId,
    interaction: Map<String, Value>,
}

impl ToolCall {
    /// Names accepted by [`ToolCall::decode`], in declaration order.
    pub const NAMES: [&'static str; 7] = [
        "diagnose",
        "list_symptoms",
        "suggest_questions",
        "add_new_rule",
        "explain_disease",
        "get_patient_history",
        "save_patient_interaction",
    ];

    /// Decodes a call from its tool name and JSON arguments. `null` arguments mean `{}`.
    ///
    /// # Errors
    ///
    /// Returns `MedexError::InvalidInput` for an unknown tool or arguments that do not fit it.
    pub fn decode(name: &str, args: Value) -> MedexResult<Self> {
        let args = if args.is_null() {
            Value::Object(Map::new())
        } else {
            args
        };

        let call = match name {
            "diagnose" => {
                let a: DiagnoseArgs = parse_args(name, args)?;
                ToolCall::Diagnose {
                    symptoms: a.symptoms,
                }
            }
            "list_symptoms" => ToolCall::ListSymptoms,
            "suggest_questions" => {
                let a: SuggestQuestionsArgs = parse_args(name, args)?;
                ToolCall::SuggestQuestions {
                    symptoms: a.symptoms.unwrap_or_default(),
                }
            }
            "add_new_rule" => {
                let a: AddNewRuleArgs = parse_args(name, args)?;
                ToolCall::AddNewRule {
                    disease: a.disease,
                    symptoms: a.symptoms,
                }
            }
            "explain_disease" => {
                let a: DiseaseArgs = parse_args(name, args)?;
                ToolCall::ExplainDisease { disease: a.disease }
            }
            "get_patient_history" => {
                let a: PatientArgs = parse_args(name, args)?;
                ToolCall::GetPatientHistory {
                    patient_id: a.patient_id,
                }
            }
            "save_patient_interaction" => {
                let a: InteractionArgs = parse_args(name, args)?;
                ToolCall::SavePatientInteraction {
                    patient_id: a.patient_id,
                    interaction: a.interaction,
                }
            }
            other => {
                return Err(MedexError::InvalidInput(format!(
                    "unknown tool '{}'",
                    sanitise_for_log(other)
                )))
            }
        };
        Ok(call)
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(name: &str, args: Value) -> MedexResult<T> {
    serde_json::from_value(args)
        .map_err(|e| MedexError::InvalidInput(format!("invalid arguments for {name}: {e}")))
}

/// Status envelope returned to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse {
    Success(Map<String, Value>),
    Error { message: String },
}

impl ToolResponse {
    fn success(fields: Value) -> Self {
        match fields {
            Value::Object(map) => ToolResponse::Success(map),
            other => {
                let mut map = Map::new();
                map.insert("result".to_owned(), other);
                ToolResponse::Success(map)
            }
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ToolResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResponse::Success(_))
    }

    pub fn to_value(&self) -> Value {
        match self {
            ToolResponse::Success(fields) => {
                let mut map = fields.clone();
                map.insert("status".to_owned(), json!("success"));
                Value::Object(map)
            }
            ToolResponse::Error { message } => json!({"status": "error", "message": message}),
        }
    }
}

/// Decodes and runs one tool call.
///
/// # Errors
///
/// Only storage failures are returned as `Err`; everything else becomes an error envelope.
pub fn dispatch(service: &MedexService, name: &str, args: Value) -> MedexResult<ToolResponse> {
    match ToolCall::decode(name, args) {
        Ok(call) => call_tool(service, call),
        Err(e) => {
            tracing::warn!("rejected tool call: {e}");
            Ok(ToolResponse::error(e.to_string()))
        }
    }
}

/// Runs a decoded tool call against `service`.
pub fn call_tool(service: &MedexService, call: ToolCall) -> MedexResult<ToolResponse> {
    recoverable(run(service, call))
}

fn run(service: &MedexService, call: ToolCall) -> MedexResult<ToolResponse> {
    let response = match call {
        ToolCall::Diagnose { symptoms } => match service.diagnose(&symptoms)? {
            Diagnosis::Confident {
                disease,
                score,
                description,
                treatment,
            } => ToolResponse::success(json!({
                "diagnosis": disease,
                "score": score,
                "description": description,
                "treatment": treatment,
            })),
            Diagnosis::NoConfidentMatch { message } => ToolResponse::error(message),
        },
        ToolCall::ListSymptoms => {
            ToolResponse::success(json!({ "symptoms": service.list_symptoms()? }))
        }
        ToolCall::SuggestQuestions { symptoms } => ToolResponse::success(json!({
            "questions": service.suggest_questions(&symptoms)?
        })),
        ToolCall::AddNewRule { disease, symptoms } => {
            let added = service.add_rule(disease, symptoms)?;
            ToolResponse::success(json!({
                "message": format!("New disease '{}' added successfully.", added.disease),
                "introduced_symptoms": added.introduced,
            }))
        }
        ToolCall::ExplainDisease { disease } => {
            let explanation = service.explain_disease(&disease)?;
            ToolResponse::success(json!({
                "disease": explanation.disease,
                "description": explanation.description,
                "treatment": explanation.treatment,
            }))
        }
        ToolCall::GetPatientHistory { patient_id } => {
            let history: Vec<InteractionRecord> = service.patient_history(&patient_id)?;
            ToolResponse::success(json!({ "history": history }))
        }
        ToolCall::SavePatientInteraction {
            patient_id,
            interaction,
        } => {
            let record = service.append_interaction(&patient_id, interaction)?;
            ToolResponse::success(json!({
                "message": format!("Interaction saved for {patient_id}."),
                "timestamp": record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            }))
        }
    };
    Ok(response)
}

fn recoverable(result: MedexResult<ToolResponse>) -> MedexResult<ToolResponse> {
    match result {
        Err(e) if !e.is_storage() => Ok(ToolResponse::error(e.to_string())),
        other => other,
    }
}

/// Function declarations for agent runtimes, one per tool.
pub fn declarations() -> Vec<Value> {
    let report_schema = json!({
        "type": "object",
        "description": "Symptom answers keyed by symptom, each \"yes\" or \"no\".",
        "additionalProperties": {"type": "string", "enum": ["yes", "no"]}
    });

    vec![
        json!({
            "name": "diagnose",
            "description": "Find the disease that best matches the reported symptoms.",
            "parameters": {
                "type": "object",
                "properties": {"symptoms": report_schema},
                "required": ["symptoms"]
            }
        }),
        json!({
            "name": "list_symptoms",
            "description": "List every symptom the knowledge base knows about.",
            "parameters": {"type": "object", "properties": {}}
        }),
        json!({
            "name": "suggest_questions",
            "description": "Suggest the next most discriminating questions to ask.",
            "parameters": {
                "type": "object",
                "properties": {"symptoms": report_schema}
            }
        }),
        json!({
            "name": "add_new_rule",
            "description": "Add a diagnostic rule for a disease that is not known yet.",
            "parameters": {
                "type": "object",
                "properties": {
                    "disease": {"type": "string"},
                    "symptoms": report_schema
                },
                "required": ["disease", "symptoms"]
            }
        }),
        json!({
            "name": "explain_disease",
            "description": "Give the description and treatment advice for a disease.",
            "parameters": {
                "type": "object",
                "properties": {"disease": {"type": "string"}},
                "required": ["disease"]
            }
        }),
        json!({
            "name": "get_patient_history",
            "description": "Fetch every recorded interaction for a patient.",
            "parameters": {
                "type": "object",
                "properties": {"patient_id": {"type": "string"}},
                "required": ["patient_id"]
            }
        }),
        json!({
            "name": "save_patient_interaction",
            "description": "Record one interaction (symptoms, results) in the patient's history.",
            "parameters": {
                "type": "object",
                "properties": {
                    "patient_id": {"type": "string"},
                    "interaction": {"type": "object"}
                },
                "required": ["patient_id", "interaction"]
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{DocumentKey, DocumentRepository, MemoryRepository};
    use std::sync::Arc;

    fn memory_service() -> (Arc<MemoryRepository>, MedexService) {
        let repo = Arc::new(MemoryRepository::new());
        let service = MedexService::with_repository(repo.clone()).expect("service should build");
        (repo, service)
    }

    fn call(service: &MedexService, name: &str, args: Value) -> Value {
        dispatch(service, name, args)
            .expect("dispatch should not fail")
            .to_value()
    }

    #[test]
    fn test_declarations_cover_every_tool() {
        let names: Vec<String> = declarations()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ToolCall::NAMES);
    }

    #[test]
    fn test_rule_then_diagnose_through_tools() {
        let (_repo, service) = memory_service();

        let added = call(
            &service,
            "add_new_rule",
            json!({"disease": "Flu", "symptoms": {"fever": "yes", "cough": "yes"}}),
        );
        assert_eq!(added["status"], "success");
        assert_eq!(added["message"], "New disease 'Flu' added successfully.");

        let diagnosis = call(
            &service,
            "diagnose",
            json!({"symptoms": {"fever": "YES", "cough": "yes"}}),
        );
        assert_eq!(diagnosis["status"], "success");
        assert_eq!(diagnosis["diagnosis"], "Flu");
        assert_eq!(diagnosis["score"], 2);
        assert_eq!(diagnosis["description"], crate::constants::DESCRIPTION_PLACEHOLDER);
    }

    #[test]
    fn test_duplicate_rule_is_an_error_envelope() {
        let (_repo, service) = memory_service();
        let args = json!({"disease": "Flu", "symptoms": {"fever": "yes"}});

        call(&service, "add_new_rule", args.clone());
        let second = call(&service, "add_new_rule", args);

        assert_eq!(second["status"], "error");
        assert_eq!(second["message"], "disease 'Flu' already exists");
    }

    #[test]
    fn test_no_match_is_an_error_envelope() {
        let (_repo, service) = memory_service();
        let response = call(&service, "diagnose", json!({"symptoms": {}}));
        assert_eq!(
            response,
            json!({
                "status": "error",
                "message": crate::constants::NO_CONFIDENT_MATCH_MESSAGE
            })
        );
    }

    #[test]
    fn test_suggest_questions_accepts_missing_arguments() {
        let (_repo, service) = memory_service();
        call(
            &service,
            "add_new_rule",
            json!({"disease": "Flu", "symptoms": {"fever": "yes"}}),
        );

        for args in [Value::Null, json!({}), json!({"symptoms": null})] {
            let response = call(&service, "suggest_questions", args);
            assert_eq!(
                response["questions"],
                json!(["Do you have this symptom: fever? (yes/no)"])
            );
        }
    }

    #[test]
    fn test_history_tools() {
        let (_repo, service) = memory_service();

        let missing = call(&service, "get_patient_history", json!({"patient_id": "p9"}));
        assert_eq!(missing["status"], "error");
        assert_eq!(missing["message"], "no history found for patient p9");

        let saved = call(
            &service,
            "save_patient_interaction",
            json!({"patient_id": "p9", "interaction": {"diagnosis": "Flu"}}),
        );
        assert_eq!(saved["status"], "success");
        assert_eq!(saved["message"], "Interaction saved for p9.");

        let history = call(&service, "get_patient_history", json!({"patient_id": "p9"}));
        assert_eq!(history["history"][0]["diagnosis"], "Flu");
        assert!(history["history"][0]["timestamp"].is_string());
    }

    #[test]
    fn test_bad_calls_are_error_envelopes() {
        let (_repo, service) = memory_service();

        let unknown = call(&service, "prescribe", json!({}));
        assert_eq!(unknown["message"], "invalid input: unknown tool 'prescribe'");

        let bad_answer = call(&service, "diagnose", json!({"symptoms": {"fever": "maybe"}}));
        assert_eq!(bad_answer["status"], "error");

        let traversal = call(&service, "explain_disease", json!({"disease": "../secrets"}));
        assert_eq!(traversal["status"], "error");

        let not_object = call(
            &service,
            "save_patient_interaction",
            json!({"patient_id": "p1", "interaction": [1, 2]}),
        );
        assert_eq!(not_object["status"], "error");
    }

    #[test]
    fn test_storage_failures_propagate() {
        let (repo, service) = memory_service();
        repo.save(
            &DocumentKey::History(PatientId::new("p1").unwrap()),
            "not json",
        )
        .unwrap();

        let err = dispatch(&service, "get_patient_history", json!({"patient_id": "p1"}))
            .expect_err("corrupt ledger should propagate");
        assert!(err.is_storage());
    }

    #[test]
    fn test_success_serialises_with_status_tag() {
        let response = ToolResponse::success(json!({"symptoms": ["fever"]}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "success", "symptoms": ["fever"]})
        );
        assert_eq!(response.to_value(), serde_json::to_value(&response).unwrap());
    }
}
