use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the access-control middleware, so an unauthenticated
/// request is rejected before any handler runs. Owner-only and renter-only checks are
/// applied by the `OwnerUser` / `RenterUser` extractors; ownership of a specific item is
/// checked in the handler before any write.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        .route("/auth/me", get(handlers::get_me))
        // --- Item Catalog (owners) ---
        // POST /items
        .route("/items", post(handlers::create_item))
        // PUT/DELETE /items/{id}
        // Strict ownership check before the write.
        .route(
            "/items/{id}",
            put(handlers::update_item).delete(handlers::delete_item),
        )
        // GET /items/owner/my-items
        // All of the caller's items, available or not.
        .route("/items/owner/my-items", get(handlers::get_my_items))
        // --- Cart (renters) ---
        .route("/cart", get(handlers::get_cart))
        .route("/cart/add/{itemId}", post(handlers::add_to_cart))
        .route("/cart/remove/{itemId}", delete(handlers::remove_from_cart))
}
