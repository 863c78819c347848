use chrono::Utc;
use rent_a_tech::{
    error::ErrorBody,
    models::{
        Category, Condition, CreateItemRequest, Item, ItemDetails, OwnerSummary, Role,
        SignupRequest, UpdateItemRequest,
    },
    navigation::ClientRouteEntry,
};
use serde_json::json;
use uuid::Uuid;

fn sample_item() -> Item {
    let now = Utc::now();
    Item {
        id: Uuid::new_v4(),
        item_name: "GoPro Hero 12".to_string(),
        rent_price: 15.5,
        description: "Waterproof action camera".to_string(),
        image_url: "https://example.com/gopro.jpg".to_string(),
        category: Category::Camera,
        condition: Condition::Excellent,
        owned_by: Uuid::new_v4(),
        is_available: true,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_item_json_uses_camel_case_and_image_url_key() {
    let value = serde_json::to_value(sample_item()).unwrap();

    assert!(value.get("itemName").is_some());
    assert!(value.get("rentPrice").is_some());
    assert!(value.get("ownedBy").is_some());
    assert!(value.get("isAvailable").is_some());
    // The image field keeps its upper-case acronym on the wire.
    assert_eq!(value["imageURL"], "https://example.com/gopro.jpg");
    assert!(value.get("imageUrl").is_none());
    assert_eq!(value["category"], "camera");
    assert_eq!(value["condition"], "excellent");
}

#[test]
fn test_item_details_embeds_owner_summary() {
    let item = sample_item();
    let owner = OwnerSummary {
        id: item.owned_by,
        name: "Alice".to_string(),
        email: "alice@uni.edu".to_string(),
    };
    let value = serde_json::to_value(ItemDetails::new(item, owner)).unwrap();

    assert_eq!(value["ownedBy"]["name"], "Alice");
    assert_eq!(value["ownedBy"]["email"], "alice@uni.edu");
}

#[test]
fn test_create_request_optional_fields_default_to_none() {
    let req: CreateItemRequest = serde_json::from_value(json!({
        "itemName": "Projector",
        "rentPrice": 40,
        "description": "1080p"
    }))
    .unwrap();

    assert_eq!(req.image_url, None);
    assert_eq!(req.category, None);
    assert_eq!(req.condition, None);
}

#[test]
fn test_unknown_enum_values_are_rejected() {
    let bad_category = serde_json::from_value::<CreateItemRequest>(json!({
        "itemName": "Boat",
        "rentPrice": 40,
        "description": "Big",
        "category": "boat"
    }));
    assert!(bad_category.is_err());

    let bad_condition = serde_json::from_value::<UpdateItemRequest>(json!({ "condition": "mint" }));
    assert!(bad_condition.is_err());

    let bad_role = serde_json::from_value::<SignupRequest>(json!({
        "name": "Eve",
        "email": "eve@uni.edu",
        "password": "secret123",
        "role": "admin"
    }));
    assert!(bad_role.is_err());
}

#[test]
fn test_update_request_omits_absent_fields() {
    let update = UpdateItemRequest {
        rent_price: Some(12.0),
        image_url: Some("https://example.com/new.jpg".to_string()),
        ..UpdateItemRequest::default()
    };

    let value = serde_json::to_value(update).unwrap();
    assert_eq!(value, json!({ "rentPrice": 12.0, "imageURL": "https://example.com/new.jpg" }));
}

#[test]
fn test_role_wire_names() {
    assert_eq!(serde_json::to_value(Role::Owner).unwrap(), "owner");
    assert_eq!("renter".parse::<Role>().unwrap(), Role::Renter);
    assert!("Owner".parse::<Role>().is_err());
}

#[test]
fn test_error_body_omits_missing_detail() {
    let body = ErrorBody {
        message: "Item not found".to_string(),
        error: None,
    };
    assert_eq!(serde_json::to_value(body).unwrap(), json!({ "message": "Item not found" }));
}

#[test]
fn test_client_route_entry_serialization() {
    let entry = ClientRouteEntry {
        path: "/cart".to_string(),
        required_role: Some(Role::Renter),
        unauthenticated_redirect: Some("/login".to_string()),
        wrong_role_redirect: Some("/".to_string()),
    };
    let value = serde_json::to_value(entry).unwrap();

    assert_eq!(value["requiredRole"], "renter");
    assert_eq!(value["wrongRoleRedirect"], "/");
}
