use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::HttpMethod;
use crate::route::PathTemplate;
use crate::store::{Item, Store};

/// A validated endpoint, ready to serve requests.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundEndpoint {
    pub method: HttpMethod,
    pub template: PathTemplate,
    /// Returned when the operation succeeds
    pub status: StatusCode,
}

/// The status and JSON body handed back to the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl MockResponse {
    fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(status, json!({ "error": message }))
    }

    pub fn not_found() -> Self {
        Self::error(StatusCode::NOT_FOUND, "Not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Serves one request against the endpoint's collection.
///
/// The collection is created empty on first touch and written back after every request,
/// including reads and misses.
pub fn dispatch(
    store: &Store,
    endpoint: &BoundEndpoint,
    params: &HashMap<String, String>,
    body: Item,
) -> MockResponse {
    let key = endpoint.template.collection_key();
    debug!(
        method = %endpoint.method,
        resource = %endpoint.template.resolved(params),
        collection = key,
        "Dispatching request"
    );

    store.with_collection(key, |data| apply(endpoint, params, body, data))
}

fn apply(
    endpoint: &BoundEndpoint,
    params: &HashMap<String, String>,
    body: Item,
    data: &mut Vec<Item>,
) -> MockResponse {
    let requested_id = params.get("id").and_then(|id| parse_id(id));

    match endpoint.method {
        HttpMethod::GET if endpoint.template.is_item_path() => {
            match data.iter().find(|item| has_id(item, requested_id)) {
                Some(item) => MockResponse::new(endpoint.status, Value::Object(item.clone())),
                None => MockResponse::not_found(),
            }
        }
        HttpMethod::GET => MockResponse::new(
            endpoint.status,
            Value::Array(data.iter().cloned().map(Value::Object).collect()),
        ),
        HttpMethod::POST => {
            let mut new_item = body;
            // Length based, so ids can repeat once something has been deleted.
            new_item.insert("id".to_string(), Value::from(data.len() as u64 + 1));
            data.push(new_item.clone());
            debug!(
                collection = endpoint.template.collection_key(),
                len = data.len(),
                "Created item"
            );
            MockResponse::new(endpoint.status, Value::Object(new_item))
        }
        HttpMethod::PUT => match data.iter().position(|item| has_id(item, requested_id)) {
            Some(index) => {
                let existing = &mut data[index];
                existing.extend(body);
                MockResponse::new(endpoint.status, Value::Object(existing.clone()))
            }
            None => MockResponse::not_found(),
        },
        HttpMethod::DELETE => match data.iter().position(|item| has_id(item, requested_id)) {
            Some(index) => {
                let removed = data.remove(index);
                MockResponse::new(endpoint.status, Value::Object(removed))
            }
            None => MockResponse::not_found(),
        },
        HttpMethod::PATCH => MockResponse::method_not_allowed(),
    }
}

fn has_id(item: &Item, id: Option<f64>) -> bool {
    match id {
        Some(id) => item.get("id").and_then(Value::as_f64) == Some(id),
        None => false,
    }
}

/// Lenient base-10 parse: leading whitespace and a sign are accepted, and parsing stops
/// at the first non-digit. Returns `None` when no digits were read.
pub fn parse_id(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: Option<f64> = None;
    for c in digits.chars() {
        match c.to_digit(10) {
            Some(d) => value = Some(value.unwrap_or(0.0) * 10.0 + f64::from(d)),
            None => break,
        }
    }

    value.map(|v| if negative { -v } else { v })
}
