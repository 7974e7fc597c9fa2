//! Zone listing handler.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use super::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ZonesResponse {
    pub zones: Vec<String>,
}

/// The authoritative zone list: every zone with at least one record.
pub async fn list_zones(State(state): State<AppState>) -> Result<Json<ZonesResponse>, ApiError> {
    let zones = state.store.zones().await?;
    Ok(Json(ZonesResponse { zones }))
}
