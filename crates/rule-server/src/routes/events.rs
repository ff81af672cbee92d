use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::StreamExt as _;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/events: SSE stream of `schema` and `logs` snapshots for the
/// signed-in identity. Both subscriptions end when the client disconnects.
pub async fn sse_events(
    State(app): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let signed = app.ready()?;
    let schema = signed
        .context
        .schemas()
        .subscribe(&signed.identity)
        .map(|schema| Event::default().event("schema").json_data(&schema));
    let logs = signed
        .context
        .logs()
        .subscribe(&signed.identity)
        .map(|logs| Event::default().event("logs").json_data(&logs));

    let stream = schema.merge(logs).filter_map(|event| match event {
        Ok(event) => Some(Ok::<Event, Infallible>(event)),
        Err(e) => {
            tracing::warn!("dropping unencodable event: {e}");
            None
        }
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
