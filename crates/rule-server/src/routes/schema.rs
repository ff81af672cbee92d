use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rule_core::schema::{NewHabit, Schema, SchemaEdit};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/schema: current schema, seeded on first access.
pub async fn get_schema(State(app): State<AppState>) -> Result<Json<Schema>, AppError> {
    let signed = app.ready()?;
    let schema = signed.context.schemas().current(&signed.identity).await?;
    Ok(Json(schema))
}

/// PUT /api/schema: replace the whole document.
pub async fn put_schema(
    State(app): State<AppState>,
    Json(schema): Json<Schema>,
) -> Result<Json<Schema>, AppError> {
    let signed = app.ready()?;
    signed
        .context
        .schemas()
        .replace(&signed.identity, &schema)
        .await?;
    Ok(Json(schema))
}

#[derive(serde::Deserialize)]
pub struct UpdateCategoryBody {
    pub purpose: String,
}

/// PATCH /api/categories/:id: change a category's purpose.
pub async fn update_category(
    State(app): State<AppState>,
    Path(category): Path<String>,
    Json(body): Json<UpdateCategoryBody>,
) -> Result<Json<Schema>, AppError> {
    let signed = app.ready()?;
    let schema = signed
        .context
        .schemas()
        .apply(
            &signed.identity,
            SchemaEdit::SetPurpose {
                category,
                purpose: body.purpose,
            },
        )
        .await?;
    Ok(Json(schema))
}

/// POST /api/categories/:id/habits: add a habit with a generated id.
pub async fn add_habit(
    State(app): State<AppState>,
    Path(category): Path<String>,
    Json(habit): Json<NewHabit>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let signed = app.ready()?;
    let (schema, id) = signed
        .context
        .schemas()
        .update(&signed.identity, |s| s.add_habit(&category, habit))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id, "schema": schema })),
    ))
}

#[derive(serde::Deserialize)]
pub struct UpdateHabitBody {
    pub name: Option<String>,
    pub target: Option<u32>,
}

/// PATCH /api/categories/:id/habits/:habit: rename and/or retarget.
pub async fn update_habit(
    State(app): State<AppState>,
    Path((category, habit)): Path<(String, String)>,
    Json(body): Json<UpdateHabitBody>,
) -> Result<Json<Schema>, AppError> {
    if body.name.is_none() && body.target.is_none() {
        return Err(AppError::bad_request("expected \"name\" or \"target\""));
    }
    let signed = app.ready()?;
    let (schema, ()) = signed
        .context
        .schemas()
        .update(&signed.identity, |s| {
            if let Some(name) = body.name {
                s.rename_habit(&category, &habit, name)?;
            }
            if let Some(target) = body.target {
                s.set_target(&category, &habit, target)?;
            }
            Ok(())
        })
        .await?;
    Ok(Json(schema))
}

/// DELETE /api/categories/:id/habits/:habit: remove a habit. Logged counts
/// for it stay in the log.
pub async fn remove_habit(
    State(app): State<AppState>,
    Path((category, habit)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let signed = app.ready()?;
    let (schema, removed) = signed
        .context
        .schemas()
        .update(&signed.identity, |s| s.remove_habit(&category, &habit))
        .await?;
    Ok(Json(serde_json::json!({ "removed": removed, "schema": schema })))
}
