use crate::{
    models::{
        CartAddOutcome, Item, ItemDetails, ItemFilter, NewItem, NewUser, OwnerSummary, User,
    },
    repository::{RepoResult, Repository, RepositoryError},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    // Kept in insertion order: the natural order of the public listing.
    items: Vec<Item>,
}

impl Store {
    fn owner_summary(&self, owner_id: Uuid) -> Option<OwnerSummary> {
        self.users.get(&owner_id).map(|owner| OwnerSummary {
            id: owner.id,
            name: owner.name.clone(),
            email: owner.email.clone(),
        })
    }

    fn details(&self, item: &Item) -> Option<ItemDetails> {
        self.owner_summary(item.owned_by)
            .map(|owner| ItemDetails::new(item.clone(), owner))
    }

    fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory behind one `RwLock`. Every mutation
/// runs inside a single write-lock critical section, which gives the same atomicity as
/// the Postgres statements: cart add-if-absent, create-and-link, delete-and-unlink.
///
/// Used when no DATABASE_URL is configured locally, and by the test-suite.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::DuplicateEmail(user.email));
        }

        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            items_owned: Vec::new(),
            cart_items: Vec::new(),
            created_at: Utc::now(),
        };
        store.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_items(&self, filter: &ItemFilter) -> RepoResult<Vec<ItemDetails>> {
        let store = self.store.read().await;
        Ok(store
            .items
            .iter()
            .filter(|item| item.is_available && filter.matches(item))
            .filter_map(|item| store.details(item))
            .collect())
    }

    async fn get_item(&self, id: Uuid) -> RepoResult<Option<Item>> {
        Ok(self.store.read().await.item(id).cloned())
    }

    async fn get_item_details(&self, id: Uuid) -> RepoResult<Option<ItemDetails>> {
        let store = self.store.read().await;
        Ok(store.item(id).and_then(|item| store.details(item)))
    }

    async fn get_items_by_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Item>> {
        let store = self.store.read().await;
        Ok(store
            .items
            .iter()
            .filter(|item| item.owned_by == owner_id)
            .cloned()
            .collect())
    }

    async fn create_item(&self, owner_id: Uuid, item: NewItem) -> RepoResult<Item> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let record = Item {
            id: Uuid::new_v4(),
            item_name: item.item_name,
            rent_price: item.rent_price,
            description: item.description,
            image_url: item.image_url,
            category: item.category,
            condition: item.condition,
            owned_by: owner_id,
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        store.items.push(record.clone());
        if let Some(owner) = store.users.get_mut(&owner_id) {
            owner.items_owned.push(record.id);
        }
        Ok(record)
    }

    async fn update_item(&self, owner_id: Uuid, item: &Item) -> RepoResult<Option<Item>> {
        let mut store = self.store.write().await;
        let Some(stored) = store
            .items
            .iter_mut()
            .find(|stored| stored.id == item.id && stored.owned_by == owner_id)
        else {
            return Ok(None);
        };

        *stored = Item {
            owned_by: stored.owned_by,
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..item.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete_item(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let Some(position) = store
            .items
            .iter()
            .position(|item| item.id == id && item.owned_by == owner_id)
        else {
            return Ok(false);
        };

        store.items.remove(position);
        for user in store.users.values_mut() {
            user.items_owned.retain(|owned| *owned != id);
            user.cart_items.retain(|carted| *carted != id);
        }
        Ok(true)
    }

    async fn add_to_cart(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<CartAddOutcome> {
        let mut store = self.store.write().await;
        let Some(user) = store.users.get_mut(&user_id) else {
            return Ok(CartAddOutcome::AlreadyInCart);
        };

        if user.cart_items.contains(&item_id) {
            return Ok(CartAddOutcome::AlreadyInCart);
        }
        user.cart_items.push(item_id);
        Ok(CartAddOutcome::Added)
    }

    async fn remove_from_cart(&self, user_id: Uuid, item_id: Uuid) -> RepoResult<()> {
        let mut store = self.store.write().await;
        if let Some(user) = store.users.get_mut(&user_id) {
            user.cart_items.retain(|carted| *carted != item_id);
        }
        Ok(())
    }

    async fn get_cart(&self, user_id: Uuid) -> RepoResult<Vec<Item>> {
        let store = self.store.read().await;
        let Some(user) = store.users.get(&user_id) else {
            return Ok(Vec::new());
        };

        Ok(user
            .cart_items
            .iter()
            .filter_map(|id| store.item(*id).cloned())
            .collect())
    }
}
