use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::router::{appointment_routes, calendar_routes};
use appointment_cell::services::SchedulingService;
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>, scheduler: Arc<SchedulingService>) -> Router {
    Router::new()
        .route("/", get(|| async { "MedSched API is running!" }))
        .route("/health", get(health))
        .nest("/appointments", appointment_routes(config.clone(), scheduler.clone()))
        .nest("/doctors", calendar_routes(config, scheduler))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
