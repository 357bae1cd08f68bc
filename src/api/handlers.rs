//! Quote endpoint handlers

use crate::api::types::{FailureResponse, HealthResponse, QueryParams, QuoteRequest, QuotesResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, warn};

/// Health check endpoint - GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        success: true,
        message: "Stock data fetcher is running".to_string(),
    })
}

/// GET /quotes?symbols=AAPL,MSFT&includeFailures=true
pub async fn get_quotes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Response {
    respond(&state, QuoteRequest::from(params)).await
}

/// POST /quotes with a direct body or a gateway envelope; an empty body is
/// the default request
pub async fn post_quotes(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        QuoteRequest::default()
    } else {
        match serde_json::from_slice::<QuoteRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                let err = AppError::Validation(format!("Invalid request body: {}", e));
                warn!("Rejected quote request ({}): {}", err.code(), err);
                return failure(StatusCode::BAD_REQUEST, &err);
            }
        }
    };

    respond(&state, request).await
}

async fn respond(state: &AppState, request: QuoteRequest) -> Response {
    let symbols = request.resolve_symbols(&state.config.default_symbols);

    match state.orchestrator.fetch_batch(&symbols, Utc::now()).await {
        Ok(result) => (
            StatusCode::OK,
            Json(QuotesResponse::from_batch(
                result,
                Utc::now(),
                request.wants_failures(),
            )),
        )
            .into_response(),
        Err(e) => {
            error!("Error in quote handler ({}): {}", e.code(), e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, &e)
        }
    }
}

fn failure(status: StatusCode, err: &AppError) -> Response {
    (status, Json(FailureResponse::new(err.to_string(), Utc::now()))).into_response()
}
