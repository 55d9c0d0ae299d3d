use serde_json::json;
use tiny_http::Request;
use tracing::info;

use hipot_analyzer::{Analyzer, AnalyzerError, Checkpoint, RawSession};

use crate::routes::{analyzer_error, error_response, json_download_response, json_response, read_body, read_json, JsonResponse};
use crate::wire::{SamplePayload, SessionPayload, TrainRequest};

/// `GET /health`
pub fn health(analyzer: &Analyzer) -> JsonResponse {
    json_response(
        200,
        &json!({
            "status": "healthy",
            "model_initialized": analyzer.is_initialized(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// `POST /train` with `{"training_data": [session, ...]}`
pub fn train(request: &mut Request, analyzer: &Analyzer) -> JsonResponse {
    let body: TrainRequest = match read_json(request) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if body.training_data.is_empty() {
        return error_response(400, "training_data must hold at least one session");
    }
    let sessions: Vec<RawSession> = body.training_data.into_iter().map(SessionPayload::into_session).collect();

    match analyzer.train(&sessions) {
        Ok(summary) => {
            info!(final_loss = summary.outcome.final_loss, "training request done");
            json_response(200, &json!({ "status": "success", "training_results": summary }))
        }
        Err(e) => analyzer_error(&e),
    }
}

/// `POST /analyze` with one session
pub fn analyze(request: &mut Request, analyzer: &Analyzer) -> JsonResponse {
    let body: SessionPayload = match read_json(request) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match analyzer.analyze(&body.into_session()) {
        Ok(report) => json_response(200, &json!({ "status": "success", "report": report })),
        Err(e) => analyzer_error(&e),
    }
}

/// `POST /classify_single` with `{voltage, current, resistance}`
pub fn classify_single(request: &mut Request, analyzer: &Analyzer) -> JsonResponse {
    let body: SamplePayload = match read_json(request) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let sample = body.to_sample();
    json_response(
        200,
        &json!({
            "status": "success",
            "classification": analyzer.classify_sample(&sample),
            "measurement": sample,
        }),
    )
}

/// `GET /statistics`
pub fn statistics(analyzer: &Analyzer) -> JsonResponse {
    json_response(200, &json!({ "status": "success", "statistics": analyzer.statistics() }))
}

/// `GET /export_model`
///
/// Serves the active checkpoint as a downloadable JSON file.
pub fn export_model(analyzer: &Analyzer) -> JsonResponse {
    let exported = analyzer
        .export_checkpoint()
        .and_then(|c| c.to_json_string().map_err(AnalyzerError::from));
    match exported {
        Ok(json) => json_download_response(json, "hipot_checkpoint.json"),
        Err(e) => analyzer_error(&e),
    }
}

/// `POST /import_model` with a checkpoint JSON body
pub fn import_model(request: &mut Request, analyzer: &Analyzer) -> JsonResponse {
    let body = match read_body(request) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let imported = Checkpoint::from_json_str(&body)
        .map_err(AnalyzerError::from)
        .and_then(|c| analyzer.import_checkpoint(c));
    match imported {
        Ok(()) => json_response(200, &json!({ "status": "success", "message": "checkpoint imported" })),
        Err(e) => analyzer_error(&e),
    }
}
