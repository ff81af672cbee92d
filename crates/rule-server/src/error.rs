use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rule_core::RuleError;

// ---------------------------------------------------------------------------
// Internal sentinel for 503 states that carry a detail message
// ---------------------------------------------------------------------------

/// Private sentinel used to carry "the service cannot act yet" through the
/// `anyhow::Error` chain.
#[derive(Debug)]
struct UnavailableError {
    error: &'static str,
    detail: String,
}

impl std::fmt::Display for UnavailableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.detail)
    }
}

impl std::error::Error for UnavailableError {}

/// Private sentinel for request bodies that parse but make no sense.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// 400 Bad Request.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(BadRequestError(msg.into()).into())
    }

    /// 503 with the configuration guidance as detail.
    pub fn configuration_required(detail: impl Into<String>) -> Self {
        Self(
            UnavailableError {
                error: "configuration required",
                detail: detail.into(),
            }
            .into(),
        )
    }

    /// 503 when no sign-in method succeeded.
    pub fn signed_out() -> Self {
        Self(
            UnavailableError {
                error: "signed out",
                detail: "every sign-in method failed".into(),
            }
            .into(),
        )
    }
}

fn status_for(err: &RuleError) -> StatusCode {
    match err {
        RuleError::CategoryNotFound(_) | RuleError::HabitNotFound { .. } => StatusCode::NOT_FOUND,
        RuleError::DuplicateCategory(_) | RuleError::DuplicateHabit { .. } => StatusCode::CONFLICT,
        RuleError::InvalidId(_)
        | RuleError::IdTooLong(_)
        | RuleError::InvalidCount(_)
        | RuleError::UnknownHabit(_) => StatusCode::BAD_REQUEST,
        RuleError::StoreUnavailable(_)
        | RuleError::PermissionDenied(_)
        | RuleError::Io(_)
        | RuleError::Yaml(_)
        | RuleError::Json(_) => StatusCode::BAD_GATEWAY,
        RuleError::ConfigMissing(_)
        | RuleError::ConfigMalformed(_)
        | RuleError::AuthRejected(_)
        | RuleError::AuthUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(u) = self.0.downcast_ref::<UnavailableError>() {
            let body = serde_json::json!({ "error": u.error, "detail": u.detail });
            return (StatusCode::SERVICE_UNAVAILABLE, axum::Json(body)).into_response();
        }

        if let Some(b) = self.0.downcast_ref::<BadRequestError>() {
            let body = serde_json::json!({ "error": b.0.clone() });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }

        let status = match self.0.downcast_ref::<RuleError>() {
            Some(e) => status_for(e),
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
