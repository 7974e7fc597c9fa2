//! Record CRUD handlers.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use zonesync_core::RecordFilter;
use zonesync_types::{resource_within, NewRecord, Record, RecordPatch, RecordType};

use super::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RecordQuery {
    /// Watermark: only records updated strictly after this timestamp.
    pub updated: Option<i64>,
}

#[derive(Serialize)]
pub struct RecordsResponse {
    pub records: Vec<Record>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

#[derive(Deserialize)]
pub struct CreateRecordBody {
    pub zone: Option<String>,
    pub rdata: Option<String>,
    pub ttl: Option<i64>,
}

fn parse_rtype(token: &str) -> Result<RecordType, ApiError> {
    RecordType::from_str(token).map_err(|err| ApiError::bad_request(err.to_string()))
}

pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let records = state
        .store
        .list(&RecordFilter { updated_after: query.updated, ..Default::default() })
        .await?;
    Ok(Json(RecordsResponse { records }))
}

pub async fn list_records_by_type(
    State(state): State<AppState>,
    Path(rtype): Path<String>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let rtype = parse_rtype(&rtype)?;
    let records = state
        .store
        .list(&RecordFilter {
            rtype: Some(rtype),
            updated_after: query.updated,
            ..Default::default()
        })
        .await?;
    Ok(Json(RecordsResponse { records }))
}

pub async fn list_records_by_name(
    State(state): State<AppState>,
    Path((rtype, rname)): Path<(String, String)>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let rtype = parse_rtype(&rtype)?;
    let records = state
        .store
        .list(&RecordFilter {
            rtype: Some(rtype),
            rname: Some(rname),
            updated_after: query.updated,
            ..Default::default()
        })
        .await?;
    Ok(Json(RecordsResponse { records }))
}

pub async fn create_record(
    State(state): State<AppState>,
    Path((rtype, rname)): Path<(String, String)>,
    Json(body): Json<CreateRecordBody>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let rtype = parse_rtype(&rtype)?;
    let zone = body.zone.ok_or_else(|| ApiError::missing_body_field("zone"))?;
    let rdata = body.rdata.ok_or_else(|| ApiError::missing_body_field("rdata"))?;
    let resource = resource_within(&zone, &rname).ok_or_else(|| {
        ApiError::bad_request(format!("zone \"{zone}\" does not match record name \"{rname}\""))
    })?;

    let record = state
        .store
        .create(&NewRecord {
            zone,
            resource,
            rtype,
            rdata,
            ttl: body.ttl.unwrap_or(state.default_ttl),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn upsert_record(
    State(state): State<AppState>,
    Path((rtype, rname)): Path<(String, String)>,
    Json(patch): Json<RecordPatch>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let rtype = parse_rtype(&rtype)?;
    let (record, inserted) =
        state.store.upsert(rtype, &rname, &patch, state.default_ttl).await?;
    let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(record)))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path((rtype, rname)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let rtype = parse_rtype(&rtype)?;
    let deleted = state.store.delete(rtype, &rname).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// Write operations require the record type and name in the URL; reaching
/// this handler means the caller left them off.
pub async fn missing_url_key() -> ApiError {
    ApiError::bad_request("record type and name must be supplied in the URL")
}
