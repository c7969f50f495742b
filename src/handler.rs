use crate::dispatch::{dispatch, BoundEndpoint, MockResponse};
use crate::store::{Item, Store};
use axum::body::Bytes;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use axum_macros::debug_handler;
use http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use serde_json::Value;
use tracing::debug;

#[derive(Clone)]
pub struct EndpointHandler {
    pub endpoint: BoundEndpoint,
    pub store: Store,
}

#[debug_handler]
/// The handler function for the endpoints.
/// Every endpoint shares this handler; the state carries the endpoint it serves and the store.
pub async fn handler(
    State(state): State<EndpointHandler>,
    path_parameters: Option<Path<Vec<(String, String)>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let path_parameters = state
        .endpoint
        .template
        .bind_params(path_parameters.map(|Path(params)| params).unwrap_or_default());

    let body = match decode_body(&headers, &body) {
        Ok(b) => b,
        Err(e) => return MockResponse::error(StatusCode::BAD_REQUEST, &e),
    };

    debug!("Path Parameters: {:?}", path_parameters);
    let response = dispatch(&state.store, &state.endpoint, &path_parameters, body);
    debug!("Response: {} {}", response.status, response.body);
    response
}

/// Answers verbs that are not configured for a known path.
pub async fn method_not_allowed() -> impl IntoResponse {
    MockResponse::method_not_allowed()
}

/// Answers paths that no endpoint is configured for.
pub async fn not_found() -> impl IntoResponse {
    MockResponse::not_found()
}

/// Turns a request body into the fields merged into stored items.
///
/// Only JSON content types are decoded, and only objects and arrays are accepted at the
/// top level. Arrays become objects keyed by index. A missing body or a non-JSON content
/// type yields no fields.
fn decode_body(headers: &HeaderMap, body: &Bytes) -> Result<Item, String> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);

    if !is_json || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Item::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(Value::Array(values)) => Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect()),
        Ok(_) => Err("Invalid JSON body: expected an object or array".to_string()),
        Err(e) => Err(format!("Invalid JSON body: {}", e)),
    }
}
