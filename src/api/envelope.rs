//! Error-response envelope for the API.
//!
//! spec.md §6 mandates literal, unwrapped response shapes for every success
//! path (`/assess`, `/vitals`), so unlike the teacher's `data`/`meta`-wrapped
//! `ApiResponse`, there is no success wrapper here — handlers return their
//! domain structs directly. Only the error path gets a small, consistent
//! shape, built the same way the teacher's `ApiErrorResponse` builds one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

fn build(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody { status: "error", message: message.into() };
    (status, axum::Json(body)).into_response()
}

pub fn bad_request(msg: impl Into<String>) -> Response {
    build(StatusCode::BAD_REQUEST, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bad_request_shape() {
        let resp = bad_request("nope");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["message"], "nope");
    }
}
