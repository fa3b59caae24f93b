//! Request and response bodies, and how failures become responses.
//!
//! Every response body is `{"content": ...}`. Failures carry a message of
//! the form `"<Op> Error | <detail>"`.

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reclog_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ServerError;

pub const NOT_FOUND: &str = "Read Error | File path does not exist.";
pub const NO_CONTENT: &str = "Write Error | No write content specified.";

/// Body of every `POST /api/*` request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRequest {
    pub file: String,
    #[serde(default = "empty_map")]
    pub content: Value,
}

fn empty_map() -> Value {
    Value::Object(Map::new())
}

/// Body of every response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub content: Value,
}

/// The endpoint an error message is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Read,
    Latest,
    Write,
    Append,
    Pop,
    Clear,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Read | Self::Latest => "Read",
            Self::Write => "Write",
            Self::Append => "Append",
            Self::Pop => "Pop",
            Self::Clear => "Clear",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A status code plus a `{"content": ...}` body.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Reply,
}

impl ApiResponse {
    pub fn new(status: StatusCode, content: impl Into<Value>) -> Self {
        Self { status, body: Reply { content: content.into() } }
    }

    pub fn ok(content: impl Into<Value>) -> Self {
        Self::new(StatusCode::OK, content)
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, message.into())
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Map a failed operation to its status and message.
    pub fn failure(op: Operation, err: &ServerError) -> Self {
        let ServerError::Store(store_err) = err else {
            return Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{op} Error | {}: {err}", err.kind_name()),
            );
        };
        match store_err {
            StoreError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, NOT_FOUND),
            StoreError::Validation => Self::new(StatusCode::BAD_REQUEST, NO_CONTENT),
            StoreError::InvalidKey { .. }
            | StoreError::TypeMismatch { .. }
            | StoreError::UnsupportedKind { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                format!("{op} Error | {}: {store_err}", store_err.kind_name()),
            ),
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{op} Error | {}: {store_err}", store_err.kind_name()),
            ),
        }
    }

    /// A request body that did not parse.
    pub fn rejected(op: Operation, rejection: &JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("{op} Error | JsonRejection: {}", rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
