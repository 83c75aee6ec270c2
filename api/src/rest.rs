use crate::errors::Error;
use crate::metrics::REQUESTS_TOTAL;
use crate::model::{CategoryCounts, Event, HourlyStats, PhotoRecord};
use crate::service::EventQueryService;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

pub fn create_router(service: EventQueryService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/latest-events", get(latest_events))
        .route("/api/stats/last-24h", get(stats_last_24h))
        .route("/api/stats/by-hour", get(stats_by_hour))
        .route("/api/photos", get(photo_gallery))
        .route("/health", get(health))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn latest_events(
    State(service): State<EventQueryService>,
) -> Result<Json<Vec<Event>>, AppError> {
    REQUESTS_TOTAL.inc();
    Ok(Json(service.latest_events().await?))
}

async fn stats_last_24h(
    State(service): State<EventQueryService>,
) -> Result<Json<CategoryCounts>, AppError> {
    REQUESTS_TOTAL.inc();
    Ok(Json(service.stats_last_24h(Utc::now()).await?))
}

async fn stats_by_hour(
    State(service): State<EventQueryService>,
) -> Result<Json<HourlyStats>, AppError> {
    REQUESTS_TOTAL.inc();
    Ok(Json(service.stats_by_hour(Utc::now()).await?))
}

async fn photo_gallery(
    State(service): State<EventQueryService>,
) -> Result<Json<Vec<PhotoRecord>>, AppError> {
    REQUESTS_TOTAL.inc();
    Ok(Json(service.photo_gallery(Utc::now()).await?))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("API error: {}", self.0);
        let (status, message) = if self.0.is_unavailable() {
            (StatusCode::SERVICE_UNAVAILABLE, "Event store unavailable")
        } else {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}
