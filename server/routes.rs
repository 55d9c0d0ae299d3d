use std::io::{Cursor, Read};
use tiny_http::{Header, Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use hipot_analyzer::error::PersistenceError;
use hipot_analyzer::{Analyzer, AnalyzerError};

use crate::handlers;

pub type JsonResponse = Response<Cursor<Vec<u8>>>;

/// Upper bound on accepted request bodies.
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

pub fn json_response(status: u16, body: &serde_json::Value) -> JsonResponse {
    let bytes = body.to_string().into_bytes();
    let len = bytes.len();
    Response::new(
        StatusCode(status),
        header("Content-Type", "application/json").into_iter().collect(),
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

pub fn json_download_response(body: String, filename: &str) -> JsonResponse {
    let bytes = body.into_bytes();
    let len = bytes.len();
    let disposition = format!("attachment; filename=\"{}\"", filename);
    Response::new(
        StatusCode(200),
        [
            header("Content-Type", "application/json"),
            header("Content-Disposition", &disposition),
        ]
        .into_iter()
        .flatten()
        .collect(),
        Cursor::new(bytes),
        Some(len),
        None,
    )
}

pub fn error_response(status: u16, message: &str) -> JsonResponse {
    json_response(status, &serde_json::json!({ "status": "error", "message": message }))
}

pub fn not_found() -> JsonResponse {
    error_response(404, "endpoint not found")
}

/// Maps analyzer failures onto HTTP statuses.
pub fn analyzer_error(err: &AnalyzerError) -> JsonResponse {
    let status = match err {
        AnalyzerError::Validation(_)
        | AnalyzerError::NotInitialized(_)
        | AnalyzerError::EmptyTrainingSet
        | AnalyzerError::Config(_)
        | AnalyzerError::Persistence(PersistenceError::Format(_) | PersistenceError::UnsupportedVersion { .. }) => 400,
        AnalyzerError::Timeout { .. } => 504,
        _ => 500,
    };
    if status == 500 {
        warn!(error = %err, "request failed");
    }
    error_response(status, &err.to_string())
}

pub fn read_body(request: &mut Request) -> Result<String, JsonResponse> {
    let mut body = String::new();
    request
        .as_reader()
        .take(MAX_BODY_BYTES)
        .read_to_string(&mut body)
        .map_err(|e| error_response(400, &format!("unreadable body: {e}")))?;
    Ok(body)
}

/// Reads the request body and parses it as JSON.
pub fn read_json<T: serde::de::DeserializeOwned>(request: &mut Request) -> Result<T, JsonResponse> {
    let body = read_body(request)?;
    serde_json::from_str(&body).map_err(|e| error_response(400, &format!("malformed JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the matching handler and sends the reply.
pub fn dispatch(mut request: Request, analyzer: Analyzer) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or("").to_owned();
    debug!(%method, %path, "request");

    let response = match (method, path.as_str()) {
        (Method::Get,  "/health")          => handlers::health(&analyzer),
        (Method::Post, "/train")           => handlers::train(&mut request, &analyzer),
        (Method::Post, "/analyze")         => handlers::analyze(&mut request, &analyzer),
        (Method::Post, "/classify_single") => handlers::classify_single(&mut request, &analyzer),
        (Method::Get,  "/statistics")      => handlers::statistics(&analyzer),
        (Method::Get,  "/export_model")    => handlers::export_model(&analyzer),
        (Method::Post, "/import_model")    => handlers::import_model(&mut request, &analyzer),
        _ => not_found(),
    };

    let _ = request.respond(response);
}
