//! Success envelopes: `{"status": "success", ...}`.

use axum::{http::StatusCode, Json};
use serde_json::{json, Map, Value};

pub type Envelope = (StatusCode, Json<Value>);

pub fn ok(data: Value) -> Envelope {
    (StatusCode::OK, Json(json!({"status": "success", "data": data})))
}

pub fn created(data: Value) -> Envelope {
    (StatusCode::CREATED, Json(json!({"status": "success", "data": data})))
}

/// A list response also carries the number of results.
pub fn list(key: &str, items: Vec<Value>) -> Envelope {
    let results = items.len();
    let mut data = Map::new();
    data.insert(key.to_string(), Value::Array(items));
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "results": results,
            "data": data,
        })),
    )
}
