use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{Html, Json};
use reclog_store::{Dequeued, Latest, Location, RecordLogStore, StoreResult};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::{ApiResponse, FileRequest, Operation};
use crate::state::AppState;

type Payload = Result<Json<FileRequest>, JsonRejection>;

pub async fn index_handler() -> Html<&'static str> {
    Html("<h1>reclog</h1><p>See <a href=\"/api/help/\">/api/help/</a> for endpoints.</p>")
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Endpoint listing.
pub async fn help_handler() -> Json<Value> {
    Json(json!({
        "endpoints": {
            "GET": {
                "/api/help/": {
                    "doc": "List the API endpoints.",
                    "in": "n/a",
                    "out": "This document.",
                },
                "/api/health/": {
                    "doc": "Liveness check.",
                    "in": "n/a",
                    "out": "Server status and version.",
                },
            },
            "POST": {
                "/api/read/": {
                    "doc": "Read the full log of a file.",
                    "in": "{\"file\": <key>}",
                    "out": "{\"content\": [<record>, ...]} or an error message.",
                },
                "/api/latest/": {
                    "doc": "Read the log only if it changed since the last call.",
                    "in": "{\"file\": <key>}",
                    "out": "{\"content\": [<record>, ...]}, or {\"content\": \"\"} if not new.",
                },
                "/api/write/": {
                    "doc": "Replace the log with a single record. Requires a bearer token.",
                    "in": "{\"file\": <key>, \"content\": <record>}",
                    "out": "{\"content\": <status message>}",
                },
                "/api/append/": {
                    "doc": "Append a record to the log. Requires a bearer token.",
                    "in": "{\"file\": <key>, \"content\": <record>}",
                    "out": "{\"content\": <status message>}",
                },
                "/api/pop/": {
                    "doc": "Remove and return the oldest record. Requires a bearer token.",
                    "in": "{\"file\": <key>}",
                    "out": "{\"content\": <record>}, or {\"content\": \"\"} when the log is empty.",
                },
                "/api/clear/": {
                    "doc": "Empty the log. Requires a bearer token.",
                    "in": "{\"file\": <key>}",
                    "out": "{\"content\": <status message>}",
                },
            },
        },
        "header_parameters": {
            "Authorization": "Bearer <token>, required on write, append, pop and clear.",
        },
        "body_parameters": {
            "file": "Key of the log: letters, digits, '-', '_' and '.'. Stored at <key>/file.json.",
            "content": "Any JSON value.",
        },
    }))
}

pub async fn read_handler(State(state): State<AppState>, payload: Payload) -> ApiResponse {
    let work = |store: &RecordLogStore, loc: &Location, _: Value| store.read_and_mark(loc);
    match execute(&state, Operation::Read, payload, work).await {
        Ok((_, content)) => ApiResponse::ok(content),
        Err(response) => response,
    }
}

pub async fn latest_handler(State(state): State<AppState>, payload: Payload) -> ApiResponse {
    match execute(&state, Operation::Latest, payload, |store, loc, _| store.latest(loc)).await {
        Ok((_, Latest::Fresh(content))) => ApiResponse::ok(content),
        Ok((_, Latest::Seen)) => ApiResponse::ok(""),
        Err(response) => response,
    }
}

pub async fn write_handler(State(state): State<AppState>, payload: Payload) -> ApiResponse {
    let work =
        |store: &RecordLogStore, loc: &Location, content: Value| store.write(loc, content);
    match execute(&state, Operation::Write, payload, work).await {
        Ok((key, _)) => ApiResponse::created(format!("Write Success | Wrote to {key}")),
        Err(response) => response,
    }
}

pub async fn append_handler(State(state): State<AppState>, payload: Payload) -> ApiResponse {
    let work =
        |store: &RecordLogStore, loc: &Location, content: Value| store.append(loc, content);
    match execute(&state, Operation::Append, payload, work).await {
        Ok((key, _)) => ApiResponse::created(format!("Append Success | Appended to {key}")),
        Err(response) => response,
    }
}

pub async fn pop_handler(State(state): State<AppState>, payload: Payload) -> ApiResponse {
    match execute(&state, Operation::Pop, payload, |store, loc, _| store.dequeue(loc)).await {
        Ok((_, Dequeued::Record(record))) => ApiResponse::ok(record),
        Ok((_, Dequeued::Empty)) => ApiResponse::ok(""),
        Err(response) => response,
    }
}

pub async fn clear_handler(State(state): State<AppState>, payload: Payload) -> ApiResponse {
    match execute(&state, Operation::Clear, payload, |store, loc, _| store.clear(loc)).await {
        Ok((key, ())) => ApiResponse::created(format!("Clear Success | Cleared {key}")),
        Err(response) => response,
    }
}

/// Parse the body, resolve the key and run `work` on the blocking pool.
/// Returns the key alongside the operation's result.
async fn execute<T, F>(
    state: &AppState,
    op: Operation,
    payload: Payload,
    work: F,
) -> Result<(String, T), ApiResponse>
where
    F: FnOnce(&RecordLogStore, &Location, Value) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let Json(request) = payload.map_err(|rejection| ApiResponse::rejected(op, &rejection))?;
    debug!(op = op.label(), key = %request.file, "request");

    let FileRequest { file, content } = request;
    let key = file.clone();
    let output = state
        .run(move |store| {
            let location = store.resolve(&file)?;
            work(store, &location, content)
        })
        .await
        .map_err(|e| ApiResponse::failure(op, &e))?;
    Ok((key, output))
}
