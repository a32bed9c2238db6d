//! REST API request/response types.
//!
//! All bodies are camelCase JSON. Session state is always returned as a
//! full [`SessionSnapshot`] so a client can re-render from a single
//! response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ParseError, PreviewError, ServerError, SessionError};
use crate::import::SessionSnapshot;
use crate::mapping::ColumnMapping;
use crate::models::{Cell, Side};
use crate::validation::ValidationError;

/// Pasted spreadsheet content.
#[derive(Debug, Clone, Deserialize)]
pub struct PasteRequest {
    pub text: String,
}

/// Mapping step changes. Every part is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRequest {
    /// Replaces the whole column mapping
    #[serde(default)]
    pub mapping: Option<ColumnMapping>,
    #[serde(default)]
    pub default_side: Option<Side>,
    #[serde(default)]
    pub event_ids: Option<Vec<String>>,
}

/// One preview field edit.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestUpdateRequest {
    /// Guest field name, e.g. `email` or `plusOne`
    pub field: String,
    pub value: Cell,
}

/// Result of a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub imported: usize,
    /// Fresh session state, `None` if the session was closed meanwhile
    pub session: Option<SessionSnapshot>,
}

impl ServerError {
    /// Wrap a session error together with the session's error list.
    pub fn session(source: SessionError, errors: &[ValidationError]) -> Self {
        ServerError::Session {
            source,
            errors: errors.to_vec(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Session { source, .. } => match source {
                SessionError::WrongStep { .. } | SessionError::Busy => StatusCode::CONFLICT,
                SessionError::NothingToImport => StatusCode::BAD_REQUEST,
                SessionError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SessionError::Parse(ParseError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
                SessionError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SessionError::Preview(PreviewError::UnknownGuest(_)) => StatusCode::NOT_FOUND,
                SessionError::Preview(PreviewError::UnknownField(_)) => StatusCode::BAD_REQUEST,
                SessionError::Import(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let errors = match &self {
            ServerError::Session { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };
        (self.status(), Json(error_response(&self.to_string(), &errors))).into_response()
    }
}

/// Create an error response body
pub fn error_response(error: &str, errors: &[ValidationError]) -> Value {
    json!({
        "status": "error",
        "error": error,
        "errors": errors,
    })
}
