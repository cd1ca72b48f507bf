use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::form::{FieldName, FormFields, FormSnapshot};

#[derive(Deserialize)]
pub struct FieldUpdate {
    pub value: String,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub record: FormFields,
    pub missing: Vec<FieldName>,
}

/// `PUT /api/form/:field` — user edit of one field.
pub async fn set_field(
    State(ctx): State<ApiContext>,
    Path(field): Path<String>,
    Json(update): Json<FieldUpdate>,
) -> Result<Json<FormSnapshot>, ApiError> {
    let mut session = ctx.lock_session()?;
    session.set_field(&field, update.value)?;
    Ok(Json(session.form().snapshot()))
}

/// `POST /api/form/save` — emit the canonical record.
pub async fn save(State(ctx): State<ApiContext>) -> Result<Json<SaveResponse>, ApiError> {
    let session = ctx.lock_session()?;
    let record = session.save();
    Ok(Json(SaveResponse {
        record,
        missing: session.form().missing_fields(),
    }))
}
