//! # API REST
//!
//! REST API implementation for medex.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Uses `api-shared` for request and response bodies and `medex-core` for every operation.

#![warn(rust_2018_idioms)]

use api_shared::{
    AddRuleReq, AddRuleRes, AddSymptomReq, AddSymptomRes, DiagnoseReq, DiagnoseRes,
    DiseaseDocumentsReq, DiseaseInfoRes, ErrorRes, HealthRes, HealthService, HistoryRes,
    ListSymptomsRes, ReloadRes, SaveInteractionReq, SaveInteractionRes, SuggestQuestionsReq,
    SuggestQuestionsRes,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::SecondsFormat;
use medex_core::{
    tools, Diagnosis, DiseaseName, DiseaseRule, MedexError, MedexService, NonEmptyText, PatientId,
    SymptomKey, SymptomReport,
};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server.
#[derive(Clone)]
pub struct AppState {
    pub service: MedexService,
}

type ApiError = (StatusCode, Json<ErrorRes>);

/// Maps a core error onto a status code. Storage failures are logged and hidden from the caller.
fn api_error(context: &str, e: MedexError) -> ApiError {
    let status = match &e {
        e if e.is_storage() => StatusCode::INTERNAL_SERVER_ERROR,
        MedexError::DuplicateDisease(_) | MedexError::DuplicateSymptom(_) => StatusCode::CONFLICT,
        MedexError::HistoryNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("{context} error: {:?}", e);
        "Internal error".to_owned()
    } else {
        tracing::warn!("{context} rejected: {e}");
        e.to_string()
    };
    (status, Json(ErrorRes { message }))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        diagnose,
        list_symptoms,
        add_symptom,
        suggest_questions,
        add_rule,
        explain_disease,
        document_disease,
        patient_history,
        save_interaction,
        call_tool,
        reload,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        DiagnoseReq,
        DiagnoseRes,
        ListSymptomsRes,
        AddSymptomReq,
        AddSymptomRes,
        SuggestQuestionsReq,
        SuggestQuestionsRes,
        AddRuleReq,
        AddRuleRes,
        DiseaseInfoRes,
        DiseaseDocumentsReq,
        HistoryRes,
        SaveInteractionReq,
        SaveInteractionRes,
        ReloadRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router over `state`, with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/diagnose", post(diagnose))
        .route("/symptoms", get(list_symptoms).post(add_symptom))
        .route("/questions", post(suggest_questions))
        .route("/rules", post(add_rule))
        .route("/diseases/:name", get(explain_disease))
        .route("/diseases/:name/documents", put(document_disease))
        .route(
            "/patients/:id/history",
            get(patient_history).post(save_interaction),
        )
        .route("/tools/:name", post(call_tool))
        .route("/admin/reload", post(reload))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the REST API until the server fails.
///
/// # Errors
/// Returns an error if the address cannot be bound or the HTTP server fails while running.
pub async fn serve(addr: &str, service: MedexService) -> anyhow::Result<()> {
    let app = router(AppState { service });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ medex REST listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/diagnose",
    request_body = DiagnoseReq,
    responses(
        (status = 200, description = "Best matching disease, or no confident match", body = DiagnoseRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Score a symptom report against every rule.
///
/// A report matching nothing is not an error: the response has `matched: false` and a message.
#[axum::debug_handler]
async fn diagnose(
    State(state): State<AppState>,
    Json(req): Json<DiagnoseReq>,
) -> Result<Json<DiagnoseRes>, ApiError> {
    let report = SymptomReport::try_from(req.symptoms).map_err(|e| api_error("Diagnose", e))?;

    let res = match state
        .service
        .diagnose(&report)
        .map_err(|e| api_error("Diagnose", e))?
    {
        Diagnosis::Confident {
            disease,
            score,
            description,
            treatment,
        } => DiagnoseRes {
            matched: true,
            diagnosis: Some(disease.to_string()),
            score: Some(score),
            description: Some(description),
            treatment: Some(treatment),
            message: None,
        },
        Diagnosis::NoConfidentMatch { message } => DiagnoseRes {
            matched: false,
            diagnosis: None,
            score: None,
            description: None,
            treatment: None,
            message: Some(message),
        },
    };
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/symptoms",
    responses(
        (status = 200, description = "Every known symptom, sorted", body = ListSymptomsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_symptoms(State(state): State<AppState>) -> Result<Json<ListSymptomsRes>, ApiError> {
    let symptoms = state
        .service
        .list_symptoms()
        .map_err(|e| api_error("List symptoms", e))?;
    Ok(Json(ListSymptomsRes {
        symptoms: symptoms.iter().map(ToString::to_string).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/symptoms",
    request_body = AddSymptomReq,
    responses(
        (status = 201, description = "Symptom registered", body = AddSymptomRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 409, description = "Symptom already has a question", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a new symptom with its question text. Existing rules get the symptom as "no".
#[axum::debug_handler]
async fn add_symptom(
    State(state): State<AppState>,
    Json(req): Json<AddSymptomReq>,
) -> Result<(StatusCode, Json<AddSymptomRes>), ApiError> {
    let key = SymptomKey::new(&req.symptom).map_err(|e| api_error("Add symptom", e.into()))?;
    let question =
        NonEmptyText::new(&req.question).map_err(|e| api_error("Add symptom", e.into()))?;

    state
        .service
        .add_symptom(key.clone(), &question)
        .map_err(|e| api_error("Add symptom", e))?;
    Ok((
        StatusCode::CREATED,
        Json(AddSymptomRes {
            symptom: key.to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/questions",
    request_body = SuggestQuestionsReq,
    responses(
        (status = 200, description = "Questions for unasked symptoms, most shared first", body = SuggestQuestionsRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn suggest_questions(
    State(state): State<AppState>,
    Json(req): Json<SuggestQuestionsReq>,
) -> Result<Json<SuggestQuestionsRes>, ApiError> {
    let report =
        SymptomReport::try_from(req.symptoms).map_err(|e| api_error("Suggest questions", e))?;
    let questions = state
        .service
        .suggest_questions(&report)
        .map_err(|e| api_error("Suggest questions", e))?;
    Ok(Json(SuggestQuestionsRes { questions }))
}

#[utoipa::path(
    post,
    path = "/rules",
    request_body = AddRuleReq,
    responses(
        (status = 201, description = "Rule added", body = AddRuleRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 409, description = "Disease already has a rule", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Add a rule for a disease that is not known yet.
#[axum::debug_handler]
async fn add_rule(
    State(state): State<AppState>,
    Json(req): Json<AddRuleReq>,
) -> Result<(StatusCode, Json<AddRuleRes>), ApiError> {
    let disease = DiseaseName::new(&req.disease).map_err(|e| api_error("Add rule", e.into()))?;
    let rule = DiseaseRule::try_from(req.symptoms).map_err(|e| api_error("Add rule", e))?;

    let added = state
        .service
        .add_rule(disease, rule)
        .map_err(|e| api_error("Add rule", e))?;
    Ok((
        StatusCode::CREATED,
        Json(AddRuleRes {
            message: format!("New disease '{}' added successfully.", added.disease),
            disease: added.disease.to_string(),
            introduced_symptoms: added.introduced.iter().map(ToString::to_string).collect(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/diseases/{name}",
    params(("name" = String, Path, description = "Disease name")),
    responses(
        (status = 200, description = "Description and treatment", body = DiseaseInfoRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Description and treatment of a disease. Missing texts come back as placeholders.
#[axum::debug_handler]
async fn explain_disease(
    State(state): State<AppState>,
    AxumPath(name): AxumPath<String>,
) -> Result<Json<DiseaseInfoRes>, ApiError> {
    let disease = DiseaseName::new(&name).map_err(|e| api_error("Explain disease", e.into()))?;

    let explanation = state
        .service
        .explain_disease(&disease)
        .map_err(|e| api_error("Explain disease", e))?;
    let symptoms = state
        .service
        .knowledge()
        .read(|base| {
            base.symptoms_of(&disease)
                .unwrap_or_default()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
        })
        .map_err(|e| api_error("Explain disease", e))?;

    Ok(Json(DiseaseInfoRes {
        disease: explanation.disease.to_string(),
        description: explanation.description,
        treatment: explanation.treatment,
        symptoms,
    }))
}

#[utoipa::path(
    put,
    path = "/diseases/{name}/documents",
    params(("name" = String, Path, description = "Disease name")),
    request_body = DiseaseDocumentsReq,
    responses(
        (status = 204, description = "Documents stored"),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn document_disease(
    State(state): State<AppState>,
    AxumPath(name): AxumPath<String>,
    Json(req): Json<DiseaseDocumentsReq>,
) -> Result<StatusCode, ApiError> {
    let disease = DiseaseName::new(&name).map_err(|e| api_error("Document disease", e.into()))?;
    let description =
        NonEmptyText::new(&req.description).map_err(|e| api_error("Document disease", e.into()))?;
    let treatment =
        NonEmptyText::new(&req.treatment).map_err(|e| api_error("Document disease", e.into()))?;

    state
        .service
        .document_disease(&disease, &description, &treatment)
        .map_err(|e| api_error("Document disease", e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/history",
    params(("id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Every recorded interaction, oldest first", body = HistoryRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "No history for this patient", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn patient_history(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<HistoryRes>, ApiError> {
    let patient = PatientId::new(&id).map_err(|e| api_error("Patient history", e.into()))?;

    let records = state
        .service
        .patient_history(&patient)
        .map_err(|e| api_error("Patient history", e))?;
    let history = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()
        .map_err(|source| {
            api_error(
                "Patient history",
                MedexError::Serialization {
                    document: format!("history of {patient}"),
                    source,
                },
            )
        })?;

    Ok(Json(HistoryRes {
        patient_id: patient.to_string(),
        history,
    }))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/history",
    params(("id" = String, Path, description = "Patient identifier")),
    request_body = SaveInteractionReq,
    responses(
        (status = 201, description = "Interaction appended", body = SaveInteractionRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Append one interaction to the patient's ledger. The server assigns the timestamp.
#[axum::debug_handler]
async fn save_interaction(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SaveInteractionReq>,
) -> Result<(StatusCode, Json<SaveInteractionRes>), ApiError> {
    let patient = PatientId::new(&id).map_err(|e| api_error("Save interaction", e.into()))?;

    let record = state
        .service
        .append_interaction(&patient, req.interaction)
        .map_err(|e| api_error("Save interaction", e))?;
    Ok((
        StatusCode::CREATED,
        Json(SaveInteractionRes {
            message: format!("Interaction saved for {patient}."),
            timestamp: record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/tools/{name}",
    params(("name" = String, Path, description = "Tool name, e.g. diagnose")),
    responses(
        (status = 200, description = "Status envelope: {\"status\": \"success\" | \"error\", ...}"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Agent function-call endpoint. The body is the tool's JSON arguments.
#[axum::debug_handler]
async fn call_tool(
    State(state): State<AppState>,
    AxumPath(name): AxumPath<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let response =
        tools::dispatch(&state.service, &name, args).map_err(|e| api_error("Tool call", e))?;
    Ok(Json(response.to_value()))
}

#[utoipa::path(
    post,
    path = "/admin/reload",
    responses(
        (status = 200, description = "Knowledge base re-read from storage", body = ReloadRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn reload(State(state): State<AppState>) -> Result<Json<ReloadRes>, ApiError> {
    state
        .service
        .reload()
        .map_err(|e| api_error("Reload", e))?;
    let (diseases, symptoms) = state
        .service
        .knowledge()
        .read(|base| (base.disease_count(), base.symptom_catalog().len()))
        .map_err(|e| api_error("Reload", e))?;
    Ok(Json(ReloadRes { diseases, symptoms }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use medex_core::repositories::MemoryRepository;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let service = MedexService::with_repository(Arc::new(MemoryRepository::new()))
            .expect("service should build");
        router(AppState { service })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request should build");

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_add_rule_then_diagnose() {
        let app = test_app();

        let (status, body) = send(
            &app,
            Method::POST,
            "/rules",
            Some(json!({"disease": "Flu", "symptoms": {"fever": "yes", "cough": "yes"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["introduced_symptoms"], json!(["cough", "fever"]));

        let (status, body) = send(
            &app,
            Method::POST,
            "/diagnose",
            Some(json!({"symptoms": {"fever": "yes", "cough": "yes"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matched"], true);
        assert_eq!(body["diagnosis"], "Flu");
        assert_eq!(body["score"], 2);

        let (status, _) = send(
            &app,
            Method::POST,
            "/rules",
            Some(json!({"disease": "Flu", "symptoms": {"fever": "yes"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invalid_answer_is_bad_request() {
        let app = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/diagnose",
            Some(json!({"symptoms": {"fever": "sometimes"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("fever"));
    }

    #[tokio::test]
    async fn test_documents_and_explain() {
        let app = test_app();
        send(
            &app,
            Method::POST,
            "/rules",
            Some(json!({"disease": "Flu", "symptoms": {"fever": "yes", "rash": "no"}})),
        )
        .await;

        let (status, _) = send(
            &app,
            Method::PUT,
            "/diseases/Flu/documents",
            Some(json!({"description": "Influenza.", "treatment": "Rest."})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::GET, "/diseases/Flu", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "Influenza.");
        assert_eq!(body["treatment"], "Rest.");
        assert_eq!(body["symptoms"], json!(["fever"]));
    }

    #[tokio::test]
    async fn test_history_not_found_then_saved() {
        let app = test_app();

        let (status, _) = send(&app, Method::GET, "/patients/p1/history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Method::POST,
            "/patients/p1/history",
            Some(json!({"interaction": {"diagnosis": "Flu"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Interaction saved for p1.");

        let (status, body) = send(&app, Method::GET, "/patients/p1/history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["history"][0]["diagnosis"], "Flu");
        assert!(body["history"][0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_symptoms_and_questions() {
        let app = test_app();
        send(
            &app,
            Method::POST,
            "/rules",
            Some(json!({"disease": "Flu", "symptoms": {"fever": "yes", "cough": "yes"}})),
        )
        .await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/symptoms",
            Some(json!({"symptom": "fever", "question": "Do you have a fever?"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&app, Method::GET, "/symptoms", None).await;
        assert_eq!(body["symptoms"], json!(["cough", "fever"]));

        let (_, body) = send(
            &app,
            Method::POST,
            "/questions",
            Some(json!({"symptoms": {"cough": "no"}})),
        )
        .await;
        assert_eq!(body["questions"], json!(["Do you have a fever?"]));
    }

    #[tokio::test]
    async fn test_tool_endpoint_returns_envelopes() {
        let app = test_app();

        let (status, body) = send(&app, Method::POST, "/tools/list_symptoms", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "success", "symptoms": []}));

        let (status, body) = send(&app, Method::POST, "/tools/unknown", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_reload_reports_counts() {
        let app = test_app();
        send(
            &app,
            Method::POST,
            "/rules",
            Some(json!({"disease": "Flu", "symptoms": {"fever": "yes"}})),
        )
        .await;

        let (status, body) = send(&app, Method::POST, "/admin/reload", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"diseases": 1, "symptoms": 1}));
    }
}
