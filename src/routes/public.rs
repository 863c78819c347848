use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. The item listing never exposes unavailable items;
/// the store enforces that in its base query.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check with a server timestamp.
        .route("/health", get(handlers::health))
        // POST /auth/signup, POST /auth/login
        // Issue bearer tokens.
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        // GET /items?category=...&search=...
        .route("/items", get(handlers::get_items))
        // GET /items/{id}
        // Item detail with the owner's name and email joined in.
        .route("/items/{id}", get(handlers::get_item))
        // GET /client/routes
        // The client's role-gated route table.
        .route("/client/routes", get(handlers::get_client_routes))
}
