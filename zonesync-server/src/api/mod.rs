//! The master's REST API: record CRUD and the zone listing the agents pull.

mod records;
mod zones;

#[cfg(test)]
mod zones_tests;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use zonesync_types::StoreError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/record",
            get(records::list_records)
                .post(records::missing_url_key)
                .put(records::missing_url_key)
                .delete(records::missing_url_key),
        )
        .route(
            "/record/:rtype",
            get(records::list_records_by_type)
                .post(records::missing_url_key)
                .put(records::missing_url_key)
                .delete(records::missing_url_key),
        )
        .route(
            "/record/:rtype/:rname",
            get(records::list_records_by_name)
                .post(records::create_record)
                .put(records::upsert_record)
                .delete(records::delete_record),
        )
        .route("/zone", get(zones::list_zones))
        // API fallback: return 404 for unknown API endpoints
        .fallback(api_not_found)
}

async fn api_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "Not found"})))
}

/// Uniform error response shape: a status code and `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    /// A required field was absent from the request body. Kept distinct from
    /// URL-level key errors so clients can tell which part of the request to
    /// fix.
    pub fn missing_body_field(name: &str) -> Self {
        Self::bad_request(format!("missing body field \"{name}\""))
    }
}

#[cfg(test)]
impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({"error": self.message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = if err.is_client_fault() {
            // Validation failures and duplicates are both conflict-class;
            // the messages keep them distinguishable.
            StatusCode::CONFLICT
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self { status, message: err.to_string() }
    }
}
