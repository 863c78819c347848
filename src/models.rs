use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Image shown for items listed without their own picture.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.pexels.com/photos/356056/pexels-photo-356056.jpeg?auto=compress&cs=tinysrgb&w=400";

/// Query value that disables the category filter on the public listing.
pub const ALL_CATEGORIES: &str = "all";

/// UnknownVariant
///
/// Raised when a stored or submitted string does not belong to one of the closed
/// enumerations below (role, category, condition).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// --- Closed Enumerations ---

/// Role
///
/// The RBAC field on every user. Fixed at signup; there is no role-change endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    /// Lists items for rent.
    Owner,
    /// Browses items and keeps a cart.
    Renter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Renter => "renter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "renter" => Ok(Role::Renter),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Category
///
/// The fixed set of item categories shown in the catalog filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Category {
    Camera,
    Calculator,
    Projector,
    Laptop,
    Tablet,
    Headphones,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Camera,
        Category::Calculator,
        Category::Projector,
        Category::Laptop,
        Category::Tablet,
        Category::Headphones,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Camera => "camera",
            Category::Calculator => "calculator",
            Category::Projector => "projector",
            Category::Laptop => "laptop",
            Category::Tablet => "tablet",
            Category::Headphones => "headphones",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// Condition
///
/// Owner-declared wear level of an item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Condition {
    Excellent,
    #[default]
    Good,
    Fair,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
        }
    }
}

impl FromStr for Condition {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            other => Err(UnknownVariant {
                kind: "condition",
                value: other.to_string(),
            }),
        }
    }
}

// --- Core Records ---

/// User
///
/// The stored credential record. Carries the password hash, so it is never serialized
/// to clients; handlers answer with [`UserProfile`] instead.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    // Lowercased at signup; unique across the store.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    // Ordered by creation, maintained by item create/delete.
    pub items_owned: Vec<Uuid>,
    // Ordered by insertion, never holds the same id twice.
    pub cart_items: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Everything the store needs to insert a user. The id and timestamps are assigned by
/// the repository.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// UserProfile
///
/// Public view of a user returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub items_owned: Vec<Uuid>,
    pub cart_items: Vec<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            items_owned: user.items_owned.clone(),
            cart_items: user.cart_items.clone(),
            created_at: user.created_at,
        }
    }
}

/// OwnerSummary
///
/// The owner's public fields joined into item reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Item
///
/// A rentable listing. Only the owner referenced by `owned_by` may change or delete it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Item {
    pub id: Uuid,
    pub item_name: String,
    pub rent_price: f64,
    pub description: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    pub category: Category,
    pub condition: Condition,
    pub owned_by: Uuid,
    // False while the item is rented out; hidden from the public listing.
    pub is_available: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ItemDetails
///
/// An item with its owner resolved, as served by the public list and detail endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ItemDetails {
    pub id: Uuid,
    pub item_name: String,
    pub rent_price: f64,
    pub description: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    pub category: Category,
    pub condition: Condition,
    pub owned_by: OwnerSummary,
    pub is_available: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl ItemDetails {
    pub fn new(item: Item, owner: OwnerSummary) -> Self {
        Self {
            id: item.id,
            item_name: item.item_name,
            rent_price: item.rent_price,
            description: item.description,
            image_url: item.image_url,
            category: item.category,
            condition: item.condition,
            owned_by: owner,
            is_available: item.is_available,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// NewItem
///
/// A validated listing ready for insertion. Built from [`CreateItemRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub item_name: String,
    pub rent_price: f64,
    pub description: String,
    pub image_url: String,
    pub category: Category,
    pub condition: Condition,
}

/// ItemFilter
///
/// Normalized form of the public listing query. `None` means "do not filter".
/// Availability is not part of the filter: the listing always requires it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    // Kept as text so an unknown category simply matches nothing.
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ItemFilter {
    pub fn new(category: Option<String>, search: Option<String>) -> Self {
        let category = category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && c != ALL_CATEGORIES);
        let search = search.filter(|s| !s.is_empty());
        Self { category, search }
    }

    /// Whether an item passes the category and search filters.
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(category) = &self.category {
            if item.category.as_str() != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !item.item_name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

/// CartAddOutcome
///
/// Result of the atomic add-if-absent on a renter's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAddOutcome {
    Added,
    AlreadyInCart,
}

// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Input payload for POST /auth/signup. The password is hashed before it reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[validate(email(message = "A valid email is required"))]
    pub email: String,

    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,

    pub role: Role,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreateItemRequest
///
/// Input payload for POST /items. Enum fields reject unknown values at deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, message = "itemName is required"))]
    pub item_name: String,

    #[validate(
        range(min = 0.0, message = "rentPrice must be a non-negative number"),
        custom(function = "finite_price")
    )]
    pub rent_price: f64,

    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,

    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// UpdateItemRequest
///
/// Partial update payload for PUT /items/{id}. Only provided fields overwrite the stored
/// item; the merged result is validated as a whole before it is written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateItemRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "imageURL", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

fn finite_price(price: f64) -> Result<(), ValidationError> {
    if price.is_finite() {
        return Ok(());
    }
    Err(ValidationError::new("finite").with_message("rentPrice must be a non-negative number".into()))
}

impl From<&Item> for CreateItemRequest {
    /// The creation-shaped view of a stored item, used to re-check a merged update.
    fn from(item: &Item) -> Self {
        Self {
            item_name: item.item_name.clone(),
            rent_price: item.rent_price,
            description: item.description.clone(),
            image_url: Some(item.image_url.clone()),
            category: Some(item.category),
            condition: Some(item.condition),
        }
    }
}

impl Item {
    /// Overwrites every field present in `update`, leaving the rest untouched.
    pub fn merge(&mut self, update: UpdateItemRequest) {
        if let Some(item_name) = update.item_name {
            self.item_name = item_name;
        }
        if let Some(rent_price) = update.rent_price {
            self.rent_price = rent_price;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(image_url) = update.image_url {
            self.image_url = image_url;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(condition) = update.condition {
            self.condition = condition;
        }
        if let Some(is_available) = update.is_available {
            self.is_available = is_available;
        }
    }
}

// --- Response Payloads (Output Schemas) ---

/// AuthResponse
///
/// Returned by signup and login: a bearer token plus the caller's profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

/// ItemResponse
///
/// Envelope for item create and update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ItemResponse {
    pub message: String,
    pub item: Item,
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// HealthResponse
///
/// Liveness check payload for GET /health.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}
