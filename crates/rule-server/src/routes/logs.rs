use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use rule_core::log::LogEntry;
use rule_core::review::ReviewDraft;

use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

/// GET /api/logs: reviews, newest first.
pub async fn list_logs(
    State(app): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<LogEntry>>, AppError> {
    let signed = app.ready()?;
    let mut entries = signed.context.logs().list(&signed.identity).await?;
    if let Some(limit) = params.limit {
        entries.truncate(limit);
    }
    Ok(Json(entries))
}

/// POST /api/logs: record one review. Counts for habits missing from the
/// schema are rejected with 400.
pub async fn create_log(
    State(app): State<AppState>,
    Json(mut draft): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let signed = app.ready()?;
    let schema = signed.context.schemas().current(&signed.identity).await?;
    draft.check_habits(&schema)?;
    let id = draft
        .submit(&signed.context.logs(), &signed.identity)
        .await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}
