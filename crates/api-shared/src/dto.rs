//! Request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Symptom answers keyed by symptom, each `"yes"` or `"no"`.
pub type RawAnswers = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagnoseReq {
    #[schema(value_type = Object)]
    pub symptoms: RawAnswers,
}

/// Outcome of a diagnosis. `matched` is false when no rule scored above zero, in which case only
/// `message` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiagnoseRes {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treatment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListSymptomsRes {
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddSymptomReq {
    pub symptom: String,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddSymptomRes {
    pub symptom: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuggestQuestionsReq {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub symptoms: RawAnswers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuggestQuestionsRes {
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddRuleReq {
    pub disease: String,
    #[schema(value_type = Object)]
    pub symptoms: RawAnswers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddRuleRes {
    pub message: String,
    pub disease: String,
    /// Symptom keys the rule added to the catalog.
    pub introduced_symptoms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiseaseInfoRes {
    pub disease: String,
    pub description: String,
    pub treatment: String,
    /// Symptoms recorded as expected-present when the rule was added. Empty for unknown diseases.
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiseaseDocumentsReq {
    pub description: String,
    pub treatment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryRes {
    pub patient_id: String,
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaveInteractionReq {
    #[schema(value_type = Object)]
    pub interaction: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaveInteractionRes {
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReloadRes {
    pub diseases: usize,
    pub symptoms: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_match_omits_diagnosis_fields() {
        let res = DiagnoseRes {
            matched: false,
            diagnosis: None,
            score: None,
            description: None,
            treatment: None,
            message: Some("nothing".into()),
        };
        assert_eq!(
            serde_json::to_value(&res).unwrap(),
            json!({"matched": false, "message": "nothing"})
        );
    }

    #[test]
    fn test_suggest_questions_body_is_optional() {
        let req: SuggestQuestionsReq = serde_json::from_value(json!({})).unwrap();
        assert!(req.symptoms.is_empty());
    }
}
