use chrono::{DateTime, Utc};
use poem_openapi::{ApiResponse, Object, payload::Json};

/// Body of `POST /api/progress`
#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct ProgressWriteDto {
    pub scenario_id: String,
    /// Current stage label, or "completed"
    pub status: Option<String>,
    /// Percentage, 0 - 100
    pub progress: Option<f64>,
    pub completed_stages: Option<Vec<String>>,
    /// Assessment percentage, 0 - 100
    pub score: Option<f64>,
    /// Seconds, never negative
    pub time_spent: Option<i64>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Object)]
pub struct ProgressRecordDto {
    pub scenario_id: String,
    pub status: String,
    pub progress: f64,
    pub completed_stages: Vec<String>,
    pub score: Option<f64>,
    pub time_spent: i64,
    pub feedback: Option<String>,
    pub start_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl From<entities::scenario_progress::Model> for ProgressRecordDto {
    fn from(m: entities::scenario_progress::Model) -> Self {
        ProgressRecordDto {
            completed_stages: serde_json::from_value(m.completed_stages).unwrap_or_default(),
            scenario_id: m.scenario_id,
            status: m.status,
            progress: m.progress,
            score: m.score,
            time_spent: m.time_spent,
            feedback: m.feedback,
            start_date: m.start_date,
            completion_date: m.completion_date,
            last_updated: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct ProgressEnvelopeDto {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<ProgressRecordDto>,
}

#[derive(Debug, Clone, Object)]
pub struct ProgressListEnvelopeDto {
    pub success: bool,
    pub data: Vec<ProgressRecordDto>,
}

#[derive(Debug, Clone, Object)]
pub struct ErrorDto {
    /// Always false
    pub success: bool,
    /// Human-readable error message
    pub message: String,
}

impl ErrorDto {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(ErrorDto {
            success: false,
            message: message.into(),
        })
    }
}

#[derive(ApiResponse)]
pub enum SaveProgressResponse {
    /// Progress saved
    #[oai(status = 200)]
    Ok(Json<ProgressEnvelopeDto>),

    /// Missing scenario id or out-of-range score
    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    /// Unknown bearer token
    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum GetProgressResponse {
    /// Progress record for the scenario
    #[oai(status = 200)]
    Ok(Json<ProgressEnvelopeDto>),

    /// Unknown bearer token
    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    /// No progress recorded for this scenario
    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum ListProgressResponse {
    /// All of the user's progress, most recently updated first
    #[oai(status = 200)]
    Ok(Json<ProgressListEnvelopeDto>),

    /// Unknown bearer token
    #[oai(status = 401)]
    Unauthorized(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}
