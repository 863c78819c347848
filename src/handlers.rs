use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiError, ErrorBody},
    extract::{ApiJson, ItemId},
    models::{
        AuthResponse, CartAddOutcome, CreateItemRequest, HealthResponse, Item, ItemDetails,
        ItemFilter, ItemResponse, LoginRequest, MessageResponse, NewUser, SignupRequest,
        UpdateItemRequest, UserProfile,
    },
    navigation::{self, ClientRouteEntry},
    policy::{OwnerUser, RenterUser, Requirement},
    validation,
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// ItemQuery
///
/// Query parameters of the public item listing (GET /items).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ItemQuery {
    /// Exact category match; the value "all" disables the filter.
    pub category: Option<String>,
    /// Case-insensitive substring match on the item name.
    pub search: Option<String>,
}

// --- Health ---

/// health
///
/// [Public Route] Liveness check.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Alive", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running".to_string(),
        timestamp: Utc::now(),
    })
}

// --- Auth ---

/// signup
///
/// [Public Route] Creates a user with a hashed password and returns a bearer token.
/// The role is chosen here once and never changes afterwards.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Invalid input or email taken", body = ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (name, email) = validation::validate_signup(&payload)?;
    let password_hash = auth::hash_password_blocking(payload.password.clone()).await?;

    let user = state
        .repo
        .create_user(NewUser {
            name,
            email,
            password_hash,
            role: payload.role,
        })
        .await?;

    let token = auth::issue_token(&state.config, &user)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token. Unknown email and
/// wrong password answer identically.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let invalid = || ApiError::BadRequest("Invalid credentials".to_string());

    let email = validation::normalize_email(&payload.email);
    let user = state.repo.get_user_by_email(&email).await?;

    let stored = user.as_ref().map(|user| user.password_hash.clone());
    if !auth::verify_password_blocking(payload.password, stored).await? {
        return Err(invalid());
    }
    let user = user.ok_or_else(invalid)?;

    let token = auth::issue_token(&state.config, &user)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    }))
}

/// get_me
///
/// [Authenticated Route] The caller's profile, including owned items and cart ids.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(UserProfile::from(&user)))
}

// --- Item Catalog ---

/// get_items
///
/// [Public Route] Lists available items with optional category and name filters.
///
/// *Visibility*: unavailable items are excluded by every store implementation,
/// regardless of the filters.
#[utoipa::path(
    get,
    path = "/api/items",
    params(ItemQuery),
    responses((status = 200, description = "Available items", body = [ItemDetails]))
)]
pub async fn get_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> Result<Json<Vec<ItemDetails>>, ApiError> {
    let filter = ItemFilter::new(query.category, query.search);
    Ok(Json(state.repo.list_items(&filter).await?))
}

/// get_item
///
/// [Public Route] One item with its owner's public fields.
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Found", body = ItemDetails),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    ItemId(id): ItemId,
) -> Result<Json<ItemDetails>, ApiError> {
    state
        .repo
        .get_item_details(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Item not found"))
}

/// create_item
///
/// [Owner Route] Lists a new item. The owner is always the requester, never the body.
#[utoipa::path(
    post,
    path = "/api/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Created", body = ItemResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Not an owner", body = ErrorBody)
    )
)]
pub async fn create_item(
    OwnerUser(user): OwnerUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let new_item = validation::validate_new_item(payload)?;
    let item = state.repo.create_item(user.id, new_item).await?;
    tracing::info!(user_id = %user.id, item_id = %item.id, "item created");

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse {
            message: "Item added successfully".to_string(),
            item,
        }),
    ))
}

/// update_item
///
/// [Owner Route] Partial update of the requester's own item.
///
/// *Authorization*: the stored item's owner is checked before anything is merged, and
/// the write repeats the predicate. The merged document is validated as a whole.
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated", body = ItemResponse),
        (status = 400, description = "Invalid field", body = ErrorBody),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_item(
    OwnerUser(user): OwnerUser,
    State(state): State<AppState>,
    ItemId(id): ItemId,
    ApiJson(payload): ApiJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let mut item = find_item(&state, id).await?;
    user.require(&[Requirement::OwnerOf(item.owned_by, "update")])?;

    item.merge(payload);
    let item = validation::validate_item(item)?;

    let updated = state
        .repo
        .update_item(user.id, &item)
        .await?
        .ok_or(ApiError::NotFound("Item not found"))?;
    tracing::info!(user_id = %user.id, item_id = %id, "item updated");

    Ok(Json(ItemResponse {
        message: "Item updated successfully".to_string(),
        item: updated,
    }))
}

/// delete_item
///
/// [Owner Route] Deletes the requester's own item. The store also pulls the id from
/// the owner's `itemsOwned` and from every renter's cart.
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_item(
    OwnerUser(user): OwnerUser,
    State(state): State<AppState>,
    ItemId(id): ItemId,
) -> Result<Json<MessageResponse>, ApiError> {
    let item = find_item(&state, id).await?;
    user.require(&[Requirement::OwnerOf(item.owned_by, "delete")])?;

    if !state.repo.delete_item(id, user.id).await? {
        return Err(ApiError::NotFound("Item not found"));
    }
    tracing::info!(user_id = %user.id, item_id = %id, "item deleted");

    Ok(Json(MessageResponse::new("Item deleted successfully")))
}

/// get_my_items
///
/// [Owner Route] Every item the requester owns, including unavailable ones.
#[utoipa::path(
    get,
    path = "/api/items/owner/my-items",
    responses(
        (status = 200, description = "My Items", body = [Item]),
        (status = 403, description = "Not an owner", body = ErrorBody)
    )
)]
pub async fn get_my_items(
    OwnerUser(user): OwnerUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Item>>, ApiError> {
    Ok(Json(state.repo.get_items_by_owner(user.id).await?))
}

// --- Cart ---

/// add_to_cart
///
/// [Renter Route] Adds an available item to the requester's cart.
///
/// *Idempotency*: a duplicate add is rejected, not ignored. The store performs the
/// add-if-absent atomically, so concurrent duplicates cannot both succeed.
#[utoipa::path(
    post,
    path = "/api/cart/add/{itemId}",
    params(("itemId" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Added", body = MessageResponse),
        (status = 400, description = "Unavailable or already in cart", body = ErrorBody),
        (status = 403, description = "Not a renter", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn add_to_cart(
    RenterUser(user): RenterUser,
    State(state): State<AppState>,
    ItemId(item_id): ItemId,
) -> Result<Json<MessageResponse>, ApiError> {
    let item = find_item(&state, item_id).await?;
    if !item.is_available {
        return Err(ApiError::BadRequest("Item is not available".to_string()));
    }

    match state.repo.add_to_cart(user.id, item_id).await? {
        CartAddOutcome::Added => {
            tracing::info!(user_id = %user.id, item_id = %item_id, "item added to cart");
            Ok(Json(MessageResponse::new("Item added to cart successfully")))
        }
        CartAddOutcome::AlreadyInCart => {
            Err(ApiError::BadRequest("Item already in cart".to_string()))
        }
    }
}

/// remove_from_cart
///
/// [Renter Route] Removes an item from the requester's cart. Removing an id that is not
/// in the cart succeeds without changing anything.
#[utoipa::path(
    delete,
    path = "/api/cart/remove/{itemId}",
    params(("itemId" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Removed", body = MessageResponse),
        (status = 403, description = "Not a renter", body = ErrorBody)
    )
)]
pub async fn remove_from_cart(
    RenterUser(user): RenterUser,
    State(state): State<AppState>,
    ItemId(item_id): ItemId,
) -> Result<Json<MessageResponse>, ApiError> {
    state.repo.remove_from_cart(user.id, item_id).await?;
    tracing::info!(user_id = %user.id, item_id = %item_id, "item removed from cart");
    Ok(Json(MessageResponse::new(
        "Item removed from cart successfully",
    )))
}

/// get_cart
///
/// [Renter Route] The requester's cart resolved to full items, in insertion order.
#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart", body = [Item]),
        (status = 403, description = "Not a renter", body = ErrorBody)
    )
)]
pub async fn get_cart(
    RenterUser(user): RenterUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Item>>, ApiError> {
    Ok(Json(state.repo.get_cart(user.id).await?))
}

// --- Client ---

/// get_client_routes
///
/// [Public Route] The client's route table with the role each route requires.
#[utoipa::path(
    get,
    path = "/api/client/routes",
    responses((status = 200, description = "Route table", body = [ClientRouteEntry]))
)]
pub async fn get_client_routes() -> Json<Vec<ClientRouteEntry>> {
    Json(navigation::route_table())
}

async fn find_item(state: &AppState, id: Uuid) -> Result<Item, ApiError> {
    state
        .repo
        .get_item(id)
        .await?
        .ok_or(ApiError::NotFound("Item not found"))
}
