use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .route("/api/v1/model", get(handlers::model::model_info))
        .merge(sessions_routes())
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn sessions_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/sessions",
            post(handlers::sessions::create_session),
        )
        .route("/api/v1/sessions/{id}", get(handlers::sessions::get_session))
        .route(
            "/api/v1/sessions/{id}/puzzle",
            get(handlers::sessions::current_puzzle),
        )
        .route(
            "/api/v1/sessions/{id}/answers",
            post(handlers::sessions::submit_answer),
        )
        .route(
            "/api/v1/sessions/{id}/summary",
            get(handlers::sessions::get_summary),
        )
        .route(
            "/api/v1/sessions/{id}/export.csv",
            get(handlers::sessions::export_attempts),
        )
        .route(
            "/api/v1/sessions/{id}/complete",
            post(handlers::sessions::complete_session),
        )
}
