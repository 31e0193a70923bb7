use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use super::handlers;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    let contact_routes = Router::new()
        .route(
            "/",
            get(handlers::contacts::get_contacts).post(handlers::contacts::add_contact),
        )
        .route(
            "/:id",
            get(handlers::contacts::get_contact)
                .put(handlers::contacts::update_contact)
                .delete(handlers::contacts::delete_contact),
        );

    Router::new()
        .nest("/contacts", contact_routes)
        .route("/export", get(handlers::spreadsheet::export_contacts))
        .route("/import", post(handlers::spreadsheet::import_contacts))
}

/// Full application: API under `/api`, plus CORS, tracing and the upload
/// size limit.
pub fn build_app(state: AppState) -> Router {
    let max_body = state.config.upload.max_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .nest("/api", create_router())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> &'static str {
    "Backend server is running. Access the API at /api/contacts"
}

async fn health_check() -> &'static str {
    "OK"
}
