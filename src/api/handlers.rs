//! HTTP request handlers

use super::types::{AnswerRequest, EndResponse, ErrorResponse, HealthResponse};
use super::AppState;
use crate::document;
use crate::interview::{Difficulty, FinalReport, Role};
use crate::runtime::{ErrorClass, SessionError, SessionView, StartRequest};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Resume uploads larger than this are refused
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session/start", post(start_session))
        .route("/session/:id/answer", post(submit_answer))
        .route("/session/:id/end", post(end_session))
        .route("/session/:id/state", get(get_state))
        .route("/session/:id/report", get(get_report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// ============================================================
// Health
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        llm_configured: state.llm_registry.has_models(),
        provider: state.llm_registry.provider().to_string(),
        model: state.llm_registry.default_model_id().to_string(),
    })
}

// ============================================================
// Session Start
// ============================================================

/// Raw multipart fields for `/session/start`
#[derive(Debug, Default)]
struct StartForm {
    role: Option<String>,
    difficulty: Option<String>,
    num_questions: Option<String>,
    max_followups: Option<String>,
    resume: Option<Vec<u8>>,
}

/// Validated start parameters, before resume extraction
#[derive(Debug)]
struct ParsedStart {
    role: Role,
    difficulty: Difficulty,
    total_questions: u32,
    max_followups: Option<u32>,
    resume: Vec<u8>,
}

impl StartForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = StartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "resume" {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read resume: {e}")))?;
                form.resume = Some(bytes.to_vec());
                continue;
            }
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid field {name}: {e}")))?;
            match name.as_str() {
                "role" => form.role = Some(value),
                "difficulty" => form.difficulty = Some(value),
                "num_questions" => form.num_questions = Some(value),
                "max_followups" => form.max_followups = Some(value),
                _ => tracing::debug!(field = %name, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }

    fn parse(self) -> Result<ParsedStart, AppError> {
        let role_text = self.role.unwrap_or_default();
        let role = Role::parse(&role_text)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown role: {role_text:?}")))?;
        let difficulty_text = self.difficulty.unwrap_or_default();
        let difficulty = Difficulty::parse(&difficulty_text).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown difficulty: {difficulty_text:?}"))
        })?;
        let total_questions = match self.num_questions {
            Some(raw) => parse_count("num_questions", &raw)?,
            None => 5,
        };
        let max_followups = self
            .max_followups
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_count("max_followups", &raw))
            .transpose()?;
        let resume = self
            .resume
            .ok_or_else(|| AppError::BadRequest("Missing resume file".to_string()))?;

        Ok(ParsedStart {
            role,
            difficulty,
            total_questions,
            max_followups,
            resume,
        })
    }
}

fn parse_count(field: &str, raw: &str) -> Result<u32, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{field} must be a non-negative integer")))
}

async fn start_session(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let parsed = StartForm::read(multipart).await?.parse()?;

    let resume = parsed.resume;
    let resume_text = tokio::task::spawn_blocking(move || document::extract_text(&resume))
        .await
        .map_err(|e| AppError::Internal(format!("Resume extraction task failed: {e}")))?
        .map_err(|e| AppError::BadRequest(format!("Could not read resume: {e}")))?;

    let view = state
        .sessions
        .start_session(StartRequest {
            role: parsed.role,
            difficulty: parsed.difficulty,
            total_questions: parsed.total_questions,
            max_followups: parsed.max_followups,
            resume_text,
        })
        .await?;
    Ok(Json(view))
}

// ============================================================
// Session Turns
// ============================================================

async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.submit_answer(&id, &req.text).await?))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EndResponse>, AppError> {
    let view = state.sessions.end_session(&id).await?;
    Ok(Json(EndResponse {
        status: "ended",
        session_id: view.session_id,
        report_available: view.report_available,
    }))
}

async fn get_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.get_state(&id).await?))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FinalReport>, AppError> {
    Ok(Json(state.sessions.get_report(&id).await?))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
    Session(SessionError),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl AppError {
    fn status_and_class(&self) -> (StatusCode, ErrorClass) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorClass::InvalidRequest),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorClass::InternalDefect,
            ),
            AppError::Session(err) => {
                let status = match err {
                    SessionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    SessionError::NotFound(_) => StatusCode::NOT_FOUND,
                    SessionError::Conflict(_) => StatusCode::CONFLICT,
                    SessionError::Generation(e) if e.is_transient() => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                    SessionError::Generation(_)
                    | SessionError::Defect(_)
                    | SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.class())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, class) = self.status_and_class();
        if status.is_server_error() {
            tracing::error!(status = %status, error = ?self, "Request failed");
        }
        let message = match self {
            AppError::BadRequest(msg) | AppError::Internal(msg) => msg,
            AppError::Session(err) => err.to_string(),
        };

        let body = Json(ErrorResponse {
            error: message,
            class,
        });
        (status, body).into_response()
    }
}
