use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::order_state::{Lifecycle, TransitionRejection};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "error": "Conflict",
    "message": "Invalid transition: cannot accept delivery for dm-2: order is already accepted by another deliveryman (status=approved, acceptedByDeliveryman=true, deliverymanId=dm-1, deliveryStatus=pending)",
    "current": {
        "status": "approved",
        "acceptedByDeliveryman": true,
        "deliverymanId": "dm-1",
        "deliveryStatus": "pending"
    },
    "requestId": "req-abc123xyz",
    "timestamp": "2025-01-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Authoritative lifecycle state of the order when a transition was rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Lifecycle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(Box<TransitionRejection>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Conflict: order {order_id} is being modified concurrently, retry the request ({current})")]
    ConcurrentUpdate {
        order_id: uuid::Uuid,
        current: Box<Lifecycle>,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::StoreUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<TransitionRejection> for ServiceError {
    fn from(rejection: TransitionRejection) -> Self {
        ServiceError::InvalidTransition(Box::new(rejection))
    }
}

impl ServiceError {
    pub fn order_not_found(id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("Order with ID {} not found", id))
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition(_) | Self::Conflict(_) | Self::ConcurrentUpdate { .. } => {
                StatusCode::CONFLICT
            }
            Self::StoreUnavailable(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Collaborator failures return generic messages to avoid leaking details.
    pub fn response_message(&self) -> String {
        match self {
            Self::StoreUnavailable(_) => "Order store unavailable".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Lifecycle snapshot the caller should reconcile against, if any.
    pub fn current_state(&self) -> Option<&Lifecycle> {
        match self {
            Self::InvalidTransition(rejection) => Some(&rejection.current),
            Self::ConcurrentUpdate { current, .. } => Some(current),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            current: self.current_state().cloned(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
