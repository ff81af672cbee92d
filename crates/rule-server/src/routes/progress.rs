use axum::extract::State;
use axum::Json;
use rule_core::aggregate::{aggregate, Progress};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/progress: per-habit, per-category and overall progress over
/// the trailing window of reviews.
pub async fn get_progress(State(app): State<AppState>) -> Result<Json<Progress>, AppError> {
    let signed = app.ready()?;
    let schemas = signed.context.schemas();
    let logs = signed.context.logs();
    let (schema, entries) = tokio::try_join!(
        schemas.current(&signed.identity),
        logs.list(&signed.identity)
    )?;
    Ok(Json(aggregate(&schema, &entries)))
}
