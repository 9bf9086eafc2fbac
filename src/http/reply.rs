//! Small response constructors shared by stages and handlers.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;

pub fn text(status: StatusCode, message: &str) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(message.to_string()))
        .expect("text response head is valid")
}

pub fn json(status: StatusCode, value: serde_json::Value) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .expect("json response head is valid")
}

pub fn not_found() -> Response {
    text(StatusCode::NOT_FOUND, "not found")
}

pub fn service_unavailable(message: &str) -> Response {
    text(StatusCode::SERVICE_UNAVAILABLE, message)
}
