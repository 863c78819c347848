use crate::models::{
    CartAddOutcome, Item, ItemDetails, ItemFilter, NewItem, NewUser, OwnerSummary, UnknownVariant,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// RepositoryError
///
/// Failures surfaced by any store implementation.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("email `{0}` is already registered")]
    DuplicateEmail(String),

    #[error("corrupt record: {0}")]
    Corrupt(#[from] UnknownVariant),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract the handlers depend on. Implemented by [`PostgresRepository`]
/// for deployments and by [`crate::memory_repository::InMemoryRepository`] for local runs
/// and tests.
///
/// Ownership predicates on writes are repeated inside the write itself, so a failed
/// authorization never turns into a partial mutation.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---
    /// Fails with [`RepositoryError::DuplicateEmail`] when the email is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    // --- Item Catalog ---
    /// Available items matching the filter, owner joined, in creation order.
    async fn list_items(&self, filter: &ItemFilter) -> RepoResult<Vec<ItemDetails>>;
    async fn get_item(&self, id: Uuid) -> RepoResult<Option<Item>>;
    async fn get_item_details(&self, id: Uuid) -> RepoResult<Option<ItemDetails>>;
    /// Every item owned by `owner_id`, available or not.
    async fn get_items_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Item>>;
    /// Inserts the item and appends its id to the owner's `items_owned` atomically.
    async fn create_item(&self, owner_id: Uuid, item: NewItem) -> RepoResult<Item>;
    /// Writes the merged item back. Returns `None` when the item is gone or the owner changed.
    async fn update_item(&self, owner_id: Uuid, item: &Item) -> RepoResult<Option<Item>>;
    /// Deletes the item and pulls its id from the owner's list and from every cart.
    /// Returns false when no item with that id belongs to `owner_id`.
    async fn delete_item(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool>;

    // --- Cart ---
    /// Atomic add-if-absent on the renter's `cart_items`.
    async fn add_to_cart(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<CartAddOutcome>;
    /// Removes the reference if present; absence is not an error.
    async fn remove_from_cart(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<()>;
    /// Cart references resolved to items in cart order; missing ids are filtered out.
    async fn get_cart(&self, user_id: Uuid) -> RepoResult<Vec<Item>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Row Mapping ---

macro_rules! item_columns {
    () => {
        "id, item_name, rent_price, description, image_url, category, condition, \
         owned_by, is_available, created_at, updated_at"
    };
}

macro_rules! item_details_select {
    () => {
        "SELECT i.id, i.item_name, i.rent_price, i.description, i.image_url, i.category, \
         i.condition, i.owned_by, i.is_available, i.created_at, i.updated_at, \
         u.name AS owner_name, u.email AS owner_email \
         FROM items i JOIN users u ON u.id = i.owned_by"
    };
}

macro_rules! user_columns {
    () => {
        "id, name, email, password_hash, role, items_owned, cart_items, created_at"
    };
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    items_owned: Vec<Uuid>,
    cart_items: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            items_owned: row.items_owned,
            cart_items: row.cart_items,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: Uuid,
    item_name: String,
    rent_price: f64,
    description: String,
    image_url: String,
    category: String,
    condition: String,
    owned_by: Uuid,
    is_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            item_name: row.item_name,
            rent_price: row.rent_price,
            description: row.description,
            image_url: row.image_url,
            category: row.category.parse()?,
            condition: row.condition.parse()?,
            owned_by: row.owned_by,
            is_available: row.is_available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ItemDetailsRow {
    #[sqlx(flatten)]
    item: ItemRow,
    owner_name: String,
    owner_email: String,
}

impl TryFrom<ItemDetailsRow> for ItemDetails {
    type Error = RepositoryError;

    fn try_from(row: ItemDetailsRow) -> Result<Self, Self::Error> {
        let item = Item::try_from(row.item)?;
        let owner = OwnerSummary {
            id: item.owned_by,
            name: row.owner_name,
            email: row.owner_email,
        };
        Ok(ItemDetails::new(item, owner))
    }
}

fn collect_rows<R, T>(rows: Vec<R>) -> RepoResult<Vec<T>>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Users carry their owned items
/// and cart as `UUID[]` columns; array updates are single statements, so the cart
/// duplicate guard and the removal are atomic per row.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn log_failure(op: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        tracing::error!("{} error: {:?}", op, e);
        RepositoryError::Database(e)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_user
    ///
    /// Maps the unique violation on `users.email` to `DuplicateEmail`.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO users (id, name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING ",
            user_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::DuplicateEmail(user.email.clone())
            }
            _ => log_failure("create_user")(e),
        })?;

        row.try_into()
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(log_failure("get_user"))?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(log_failure("get_user_by_email"))?
        .map(User::try_from)
        .transpose()
    }

    /// list_items
    ///
    /// Builds the public listing query with `QueryBuilder` so filters stay parameterized.
    /// **Visibility**: `is_available = true` is part of the base query unconditionally.
    /// The search uses `strpos` on lowercased text, so `%` and `_` match literally.
    async fn list_items(&self, filter: &ItemFilter) -> RepoResult<Vec<ItemDetails>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(concat!(item_details_select!(), " WHERE i.is_available = true"));

        if let Some(category) = &filter.category {
            builder.push(" AND i.category = ");
            builder.push_bind(category.clone());
        }

        if let Some(search) = &filter.search {
            builder.push(" AND strpos(lower(i.item_name), lower(");
            builder.push_bind(search.clone());
            builder.push(")) > 0");
        }

        builder.push(" ORDER BY i.created_at ASC, i.id ASC");

        let rows = builder
            .build_query_as::<ItemDetailsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(log_failure("list_items"))?;

        collect_rows(rows)
    }

    async fn get_item(&self, id: Uuid) -> RepoResult<Option<Item>> {
        sqlx::query_as::<_, ItemRow>(concat!("SELECT ", item_columns!(), " FROM items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(log_failure("get_item"))?
            .map(Item::try_from)
            .transpose()
    }

    async fn get_item_details(&self, id: Uuid) -> RepoResult<Option<ItemDetails>> {
        sqlx::query_as::<_, ItemDetailsRow>(concat!(item_details_select!(), " WHERE i.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(log_failure("get_item_details"))?
            .map(ItemDetails::try_from)
            .transpose()
    }

    async fn get_items_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(concat!(
            "SELECT ",
            item_columns!(),
            " FROM items WHERE owned_by = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(log_failure("get_items_by_owner"))?;

        collect_rows(rows)
    }

    /// create_item
    ///
    /// Inserts the item and appends it to the owner's `items_owned` in one transaction.
    async fn create_item(&self, owner_id: Uuid, item: NewItem) -> RepoResult<Item> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(log_failure("create_item"))?;

        let row = sqlx::query_as::<_, ItemRow>(concat!(
            "INSERT INTO items (id, item_name, rent_price, description, image_url, category, \
             condition, owned_by, is_available, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, NOW(), NOW()) RETURNING ",
            item_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(&item.item_name)
        .bind(item.rent_price)
        .bind(&item.description)
        .bind(&item.image_url)
        .bind(item.category.as_str())
        .bind(item.condition.as_str())
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(log_failure("create_item"))?;

        sqlx::query("UPDATE users SET items_owned = array_append(items_owned, $1) WHERE id = $2")
            .bind(row.id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(log_failure("create_item"))?;

        tx.commit()
            .await
            .map_err(log_failure("create_item"))?;

        row.try_into()
    }

    /// update_item
    ///
    /// Overwrites every mutable column from the merged item. The `owned_by` predicate
    /// makes the write a no-op if ownership no longer matches.
    async fn update_item(&self, owner_id: Uuid, item: &Item) -> RepoResult<Option<Item>> {
        sqlx::query_as::<_, ItemRow>(concat!(
            "UPDATE items SET item_name = $3, rent_price = $4, description = $5, \
             image_url = $6, category = $7, condition = $8, is_available = $9, \
             updated_at = NOW() \
             WHERE id = $1 AND owned_by = $2 RETURNING ",
            item_columns!()
        ))
        .bind(item.id)
        .bind(owner_id)
        .bind(&item.item_name)
        .bind(item.rent_price)
        .bind(&item.description)
        .bind(&item.image_url)
        .bind(item.category.as_str())
        .bind(item.condition.as_str())
        .bind(item.is_available)
        .fetch_optional(&self.pool)
        .await
        .map_err(log_failure("update_item"))?
        .map(Item::try_from)
        .transpose()
    }

    /// delete_item
    ///
    /// Deletes only if `owner_id` matches, then pulls the id from the owner's list and
    /// from every cart that still references it, all in one transaction.
    async fn delete_item(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(log_failure("delete_item"))?;

        let deleted = sqlx::query("DELETE FROM items WHERE id = $1 AND owned_by = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(log_failure("delete_item"))?
            .rows_affected();

        if deleted == 0 {
            // Dropping the transaction rolls it back.
            return Ok(false);
        }

        sqlx::query("UPDATE users SET items_owned = array_remove(items_owned, $1) WHERE id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await
            .map_err(log_failure("delete_item"))?;

        sqlx::query(
            "UPDATE users SET cart_items = array_remove(cart_items, $1) WHERE $1 = ANY(cart_items)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(log_failure("delete_item"))?;

        tx.commit()
            .await
            .map_err(log_failure("delete_item"))?;

        Ok(true)
    }

    /// add_to_cart
    ///
    /// A single conditional `UPDATE`: the append only happens when the id is not already
    /// in the array, so concurrent duplicate adds cannot both succeed.
    async fn add_to_cart(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<CartAddOutcome> {
        let affected = sqlx::query(
            "UPDATE users SET cart_items = array_append(cart_items, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(cart_items))",
        )
        .bind(user_id)
        .bind(item_id)
        .execute(&self.pool)
        .await
        .map_err(log_failure("add_to_cart"))?
        .rows_affected();

        Ok(if affected > 0 {
            CartAddOutcome::Added
        } else {
            CartAddOutcome::AlreadyInCart
        })
    }

    async fn remove_from_cart(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<()> {
        sqlx::query("UPDATE users SET cart_items = array_remove(cart_items, $2) WHERE id = $1")
            .bind(user_id)
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(log_failure("remove_from_cart"))?;
        Ok(())
    }

    /// get_cart
    ///
    /// Unnests the cart with its ordinal and joins items, so ids without a matching item
    /// drop out and cart order is preserved.
    async fn get_cart(&self, user_id: Uuid) -> RepoResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            "SELECT i.id, i.item_name, i.rent_price, i.description, i.image_url, i.category, \
             i.condition, i.owned_by, i.is_available, i.created_at, i.updated_at \
             FROM users u \
             CROSS JOIN LATERAL unnest(u.cart_items) WITH ORDINALITY AS c(item_id, pos) \
             JOIN items i ON i.id = c.item_id \
             WHERE u.id = $1 \
             ORDER BY c.pos",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(log_failure("get_cart"))?;

        collect_rows(rows)
    }
}
