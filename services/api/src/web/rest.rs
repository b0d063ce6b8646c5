//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints over the diagnosis log
//! and the master definition for the OpenAPI specification.

use crate::web::state::{AppState, UserId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use crop_health_core::domain::{DiagnosisRecord, DiagnosisStatus, Location, NewDiagnosis};
use crop_health_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        global_log_handler,
        record_diagnosis_handler,
        list_history_handler,
        resolve_diagnosis_handler,
    ),
    components(
        schemas(LocationBody, RecordDiagnosisRequest, DiagnosisResponse, MessageResponse)
    ),
    tags(
        (name = "Crop Health API", description = "Diagnosis log endpoints backing regional disease alerts.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Where a photo was taken. Blank `region`/`district` are stored as "Unknown".
#[derive(Serialize, Deserialize, ToSchema, Default)]
pub struct LocationBody {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub district: String,
}

/// The payload for appending a diagnosis to the log.
#[derive(Deserialize, ToSchema)]
pub struct RecordDiagnosisRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub prediction: String,
    /// One of "Healthy", "Diseased" or "Unknown disease".
    pub status: String,
    #[serde(default)]
    pub location: LocationBody,
    pub image_url: String,
}

#[derive(Serialize, ToSchema)]
pub struct DiagnosisResponse {
    pub id: Uuid,
    pub user_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub prediction: String,
    pub status: String,
    pub location: LocationBody,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<DiagnosisRecord> for DiagnosisResponse {
    fn from(record: DiagnosisRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            email: record.email,
            phone: record.phone,
            prediction: record.prediction,
            status: record.status.as_str().to_string(),
            location: LocationBody {
                lat: record.location.lat,
                lng: record.location.lng,
                region: record.location.region,
                district: record.location.district,
            },
            image_url: record.image_url,
            created_at: record.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn internal_error(context: &str, e: PortError) -> (StatusCode, String) {
    error!("{}: {:?}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every Diseased record in the log, newest first.
#[utoipa::path(
    get,
    path = "/global-log",
    responses(
        (status = 200, description = "Diseased diagnoses, newest first", body = Vec<DiagnosisResponse>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn global_log_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let records = app_state
        .log
        .list_diseased()
        .await
        .map_err(|e| internal_error("Failed to fetch global log", e))?;

    let body: Vec<DiagnosisResponse> = records.into_iter().map(DiagnosisResponse::from).collect();
    Ok(Json(body))
}

/// Append a diagnosis for the calling user.
#[utoipa::path(
    post,
    path = "/diagnoses",
    request_body = RecordDiagnosisRequest,
    responses(
        (status = 201, description = "Diagnosis recorded", body = DiagnosisResponse),
        (status = 400, description = "Bad request (e.g., unknown status)"),
        (status = 401, description = "Missing x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = String, Header, description = "The verified id of the calling user.")
    )
)]
pub async fn record_diagnosis_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(req): Json<RecordDiagnosisRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = req
        .status
        .parse::<DiagnosisStatus>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    if req.image_url.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "image_url is required".to_string()));
    }

    let diagnosis = NewDiagnosis {
        user_id,
        email: req.email,
        phone: req.phone,
        prediction: req.prediction,
        status,
        location: Location::new(
            req.location.lat,
            req.location.lng,
            &req.location.region,
            &req.location.district,
        ),
        image_url: req.image_url,
    };

    let record = app_state
        .log
        .insert_diagnosis(diagnosis)
        .await
        .map_err(|e| internal_error("Failed to record diagnosis", e))?;

    info!(record_id = %record.id, district = %record.location.district, status = %record.status, "Diagnosis recorded");
    Ok((StatusCode::CREATED, Json(DiagnosisResponse::from(record))))
}

/// List the calling user's diagnoses, newest first.
#[utoipa::path(
    get,
    path = "/diagnoses",
    responses(
        (status = 200, description = "The caller's diagnoses", body = Vec<DiagnosisResponse>),
        (status = 401, description = "Missing x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = String, Header, description = "The verified id of the calling user.")
    )
)]
pub async fn list_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let records = app_state
        .log
        .list_for_user(&user_id)
        .await
        .map_err(|e| internal_error("Failed to fetch history", e))?;

    let body: Vec<DiagnosisResponse> = records.into_iter().map(DiagnosisResponse::from).collect();
    Ok(Json(body))
}

/// Resolve (delete) one of the caller's diagnoses.
#[utoipa::path(
    delete,
    path = "/diagnoses/{id}",
    responses(
        (status = 200, description = "Diagnosis resolved and deleted", body = MessageResponse),
        (status = 401, description = "Missing x-user-id header"),
        (status = 403, description = "Unauthorized or not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The diagnosis id."),
        ("x-user-id" = String, Header, description = "The verified id of the calling user.")
    )
)]
pub async fn resolve_diagnosis_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.log.delete_for_user(id, &user_id).await {
        Ok(()) => Ok(Json(MessageResponse {
            message: "Disease record resolved and deleted.".to_string(),
        })),
        Err(PortError::NotFound(_)) | Err(PortError::Unauthorized) => {
            Err((StatusCode::FORBIDDEN, "Unauthorized or not found".to_string()))
        }
        Err(e) => Err(internal_error("Failed to resolve diagnosis", e)),
    }
}
