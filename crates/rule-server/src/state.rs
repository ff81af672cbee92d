use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rule_core::context::{SignedIn, Startup};

use crate::error::AppError;

/// What the server could establish at startup.
#[derive(Clone)]
pub enum Readiness {
    Ready(SignedIn),
    ConfigurationRequired(String),
    SignedOut,
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub readiness: Readiness,
}

impl AppState {
    pub fn new(startup: Startup<SignedIn>) -> Self {
        let readiness = match startup {
            Startup::Ready(signed) => {
                tracing::info!(identity = %signed.identity, app_id = signed.context.app_id(), "store ready");
                Readiness::Ready(signed)
            }
            Startup::ConfigurationRequired { reason } => {
                tracing::warn!("serving in configuration-required mode: {reason}");
                Readiness::ConfigurationRequired(reason)
            }
            Startup::SignedOut => {
                tracing::error!("no sign-in method succeeded; API disabled");
                Readiness::SignedOut
            }
        };
        Self { readiness }
    }

    /// The signed-in context, or the 503 that explains why there is none.
    pub fn ready(&self) -> Result<SignedIn, AppError> {
        match &self.readiness {
            Readiness::Ready(signed) => Ok(signed.clone()),
            Readiness::ConfigurationRequired(reason) => Err(AppError::configuration_required(
                format!("{reason}. {}", rule_core::config::CONFIGURATION_HELP),
            )),
            Readiness::SignedOut => Err(AppError::signed_out()),
        }
    }
}

/// Axum middleware that answers every `/api` request with 503 until the
/// store is configured and an identity is held.
pub async fn require_ready(State(app): State<AppState>, req: Request, next: Next) -> Response {
    if !req.uri().path().starts_with("/api") {
        return next.run(req).await;
    }
    match app.ready() {
        Ok(_) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}
