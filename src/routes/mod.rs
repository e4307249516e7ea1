use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

pub mod events;
pub mod media;
pub mod search;
pub mod state;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/movies", get(media::movies_index))
        .route("/movies/:id", get(media::movie_show))
        .route("/tv_shows", get(media::tv_shows_index))
        .route("/tv_shows/:id", get(media::tv_show_show))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/autocomplete", get(search::autocomplete))
        .route("/events/click", post(events::click))
        .route("/:medium/rails", get(search::rails))
        .route("/:medium/browse", get(search::browse))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
