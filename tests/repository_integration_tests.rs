use rent_a_tech::{
    models::{CartAddOutcome, Category, Condition, ItemFilter, NewItem, NewUser, Role, User},
    repository::{PostgresRepository, Repository, RepositoryError},
};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// A simple structure to hold the database pool for testing
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    /// Connects and migrates, or returns `None` when DATABASE_URL is unset so the suite
    /// still passes on machines without Postgres.
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres repository tests");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Unique per call so repeated runs against the same database never collide.
async fn create_test_user(repo: &PostgresRepository, role: Role) -> User {
    repo.create_user(NewUser {
        name: format!("{} user", role),
        email: format!("{}-{}@test.edu", role, Uuid::new_v4()),
        password_hash: "hash".to_string(),
        role,
    })
    .await
    .expect("Failed to create test user")
}

fn new_item(name: &str, category: Category) -> NewItem {
    NewItem {
        item_name: name.to_string(),
        rent_price: 25.0,
        description: "Integration test item".to_string(),
        image_url: "https://example.com/item.jpg".to_string(),
        category,
        condition: Condition::Good,
    }
}

// --- Tests ---

#[test]
#[serial]
async fn test_duplicate_email_is_reported() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::Renter).await;

    let err = repo
        .create_user(NewUser {
            name: "Copy".to_string(),
            email: user.email.clone(),
            password_hash: "hash".to_string(),
            role: Role::Owner,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicateEmail(email) if email == user.email));
}

#[test]
#[serial]
async fn test_create_item_links_owner() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let owner = create_test_user(&repo, Role::Owner).await;

    let item = repo
        .create_item(owner.id, new_item("Tripod", Category::Camera))
        .await
        .unwrap();

    assert_eq!(item.owned_by, owner.id);
    assert!(item.is_available);

    let stored = repo.get_user(owner.id).await.unwrap().unwrap();
    assert_eq!(stored.items_owned, vec![item.id]);

    let details = repo.get_item_details(item.id).await.unwrap().unwrap();
    assert_eq!(details.owned_by.email, owner.email);
}

#[test]
#[serial]
async fn test_update_requires_matching_owner() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let owner = create_test_user(&repo, Role::Owner).await;
    let other = create_test_user(&repo, Role::Owner).await;
    let mut item = repo
        .create_item(owner.id, new_item("Projector", Category::Projector))
        .await
        .unwrap();

    item.rent_price = 99.0;
    assert!(repo.update_item(other.id, &item).await.unwrap().is_none());

    let updated = repo.update_item(owner.id, &item).await.unwrap().unwrap();
    assert_eq!(updated.rent_price, 99.0);
    assert_eq!(updated.created_at, item.created_at);
}

#[test]
#[serial]
async fn test_cart_add_if_absent_and_removal() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let owner = create_test_user(&repo, Role::Owner).await;
    let renter = create_test_user(&repo, Role::Renter).await;
    let first = repo
        .create_item(owner.id, new_item("Calculator", Category::Calculator))
        .await
        .unwrap();
    let second = repo
        .create_item(owner.id, new_item("Tablet", Category::Tablet))
        .await
        .unwrap();

    assert_eq!(repo.add_to_cart(renter.id, second.id).await.unwrap(), CartAddOutcome::Added);
    assert_eq!(repo.add_to_cart(renter.id, first.id).await.unwrap(), CartAddOutcome::Added);
    assert_eq!(
        repo.add_to_cart(renter.id, first.id).await.unwrap(),
        CartAddOutcome::AlreadyInCart
    );

    let cart: Vec<Uuid> = repo
        .get_cart(renter.id)
        .await
        .unwrap()
        .iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(cart, vec![second.id, first.id]);

    repo.remove_from_cart(renter.id, second.id).await.unwrap();
    repo.remove_from_cart(renter.id, Uuid::new_v4()).await.unwrap();

    let stored = repo.get_user(renter.id).await.unwrap().unwrap();
    assert_eq!(stored.cart_items, vec![first.id]);
}

#[test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_concurrent_cart_adds_insert_once() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = Arc::new(ctx.repository());
    let owner = create_test_user(&repo, Role::Owner).await;
    let renter = create_test_user(&repo, Role::Renter).await;
    let item = repo
        .create_item(owner.id, new_item("Webcam", Category::Camera))
        .await
        .unwrap();

    let (renter_id, item_id) = (renter.id, item.id);
    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.add_to_cart(renter_id, item_id).await })
        })
        .collect();

    let mut added = 0;
    for attempt in attempts {
        if attempt.await.unwrap().unwrap() == CartAddOutcome::Added {
            added += 1;
        }
    }

    assert_eq!(added, 1);
    let stored = repo.get_user(renter.id).await.unwrap().unwrap();
    assert_eq!(stored.cart_items, vec![item.id]);
}

#[test]
#[serial]
async fn test_delete_unlinks_owner_and_carts() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let owner = create_test_user(&repo, Role::Owner).await;
    let other = create_test_user(&repo, Role::Owner).await;
    let renter = create_test_user(&repo, Role::Renter).await;
    let item = repo
        .create_item(owner.id, new_item("Headphones", Category::Headphones))
        .await
        .unwrap();
    repo.add_to_cart(renter.id, item.id).await.unwrap();

    assert!(!repo.delete_item(item.id, other.id).await.unwrap());
    assert!(repo.get_item(item.id).await.unwrap().is_some());

    assert!(repo.delete_item(item.id, owner.id).await.unwrap());
    assert!(repo.get_item(item.id).await.unwrap().is_none());

    let owner = repo.get_user(owner.id).await.unwrap().unwrap();
    assert!(owner.items_owned.is_empty());
    let renter = repo.get_user(renter.id).await.unwrap().unwrap();
    assert!(renter.cart_items.is_empty());
}

#[test]
#[serial]
async fn test_listing_hides_unavailable_and_matches_search_literally() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let owner = create_test_user(&repo, Role::Owner).await;
    let marker = Uuid::new_v4().simple().to_string();

    let visible = repo
        .create_item(owner.id, new_item(&format!("Laptop 100% {}", marker), Category::Laptop))
        .await
        .unwrap();
    let mut hidden = repo
        .create_item(owner.id, new_item(&format!("Laptop old {}", marker), Category::Laptop))
        .await
        .unwrap();
    hidden.is_available = false;
    repo.update_item(owner.id, &hidden).await.unwrap();

    let by_marker = repo
        .list_items(&ItemFilter::new(Some("laptop".to_string()), Some(marker.to_uppercase())))
        .await
        .unwrap();
    let ids: Vec<Uuid> = by_marker.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![visible.id]);

    // `%` is matched as a character, not as a wildcard.
    let literal = repo
        .list_items(&ItemFilter::new(None, Some(format!("100% {}", marker))))
        .await
        .unwrap();
    assert_eq!(literal.len(), 1);
    let wildcard = repo
        .list_items(&ItemFilter::new(None, Some(format!("Laptop % {}", marker))))
        .await
        .unwrap();
    assert!(wildcard.is_empty());
}
