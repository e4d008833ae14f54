//! Route modules for the host bridge

pub mod health;
pub mod views;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Every route, without the outer layers `main` adds
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/api/v1/views", views::router())
        .with_state(state)
}
