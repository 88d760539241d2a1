use actix_files::Files;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::{StatusCode, header};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use log::{debug, error, info, warn};
use serde_json::Value;
use shared::{AnalyzeResponse, ErrorResponse};
use std::path::PathBuf;
use uuid::Uuid;

use crate::inference::normalizer;
use crate::inference::{AnalysisError, AnalysisRequest, CompletionClient};

pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    static_dir: Option<PathBuf>,
    max_payload_bytes: usize,
) {
    cfg.service(
        web::resource("/api/analyze")
            .app_data(
                web::JsonConfig::default()
                    .limit(max_payload_bytes)
                    .error_handler(json_error_handler),
            )
            .route(web::post().to(handle_analyze))
            .default_service(web::to(method_not_allowed)),
    );

    if let Some(dir) = static_dir {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    }
}

async fn handle_analyze(
    client: web::Data<CompletionClient>,
    body: web::Json<Value>,
) -> HttpResponse {
    let request = match AnalysisRequest::from_json(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected analysis request: {}", e);
            return error_response(&e);
        }
    };

    let request_id = Uuid::new_v4();
    info!(
        "[{}] Analysis requested (useYolo: {})",
        request_id, request.use_yolo
    );

    let raw_content = match client.analyze(&request).await {
        Ok(raw_content) => raw_content,
        Err(e) => {
            error!("[{}] Analysis failed: {}", request_id, e);
            return error_response(&e);
        }
    };
    debug!("[{}] Raw completion: {}", request_id, raw_content);

    let result = normalizer::normalize(&raw_content);
    match result.report() {
        Some(report) => info!(
            "[{}] Analysis complete, severity {}",
            request_id,
            report
                .severity_level()
                .map_or_else(|| "unknown".to_string(), |level| level.to_string())
        ),
        None => warn!(
            "[{}] Completion held no parsable JSON, returning raw text",
            request_id
        ),
    }

    HttpResponse::Ok().json(AnalyzeResponse {
        result,
        raw_content,
        use_yolo: request.use_yolo,
    })
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header((header::ALLOW, "POST"))
        .json(ErrorResponse {
            error: "only POST requests are supported".to_string(),
        })
}

fn error_response(err: &AnalysisError) -> HttpResponse {
    match err {
        AnalysisError::InvalidInput(message) => HttpResponse::BadRequest().json(ErrorResponse {
            error: message.clone(),
        }),
        _ => HttpResponse::InternalServerError().json(ErrorResponse {
            error: format!("analysis failed: {}", err),
        }),
    }
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    let status = match &err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        _ => StatusCode::BAD_REQUEST,
    };
    let response = HttpResponse::build(status).json(ErrorResponse {
        error: format!("invalid request body: {}", err),
    });
    InternalError::from_response(err, response).into()
}
