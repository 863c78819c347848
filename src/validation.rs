use validator::Validate;

use crate::{
    error::ApiError,
    models::{CreateItemRequest, Item, NewItem, PLACEHOLDER_IMAGE_URL, SignupRequest},
};

fn image_or_placeholder(image_url: Option<String>) -> String {
    image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string())
}

/// Lowercased, trimmed email: the form stored at signup and looked up at login.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims the name, normalizes the email, then checks the payload. Returns the name and email
/// as they will be stored.
pub fn validate_signup(req: &SignupRequest) -> Result<(String, String), ApiError> {
    let normalized = SignupRequest {
        name: req.name.trim().to_string(),
        email: normalize_email(&req.email),
        ..req.clone()
    };
    normalized.validate()?;
    Ok((normalized.name, normalized.email))
}

fn trimmed(req: CreateItemRequest) -> CreateItemRequest {
    CreateItemRequest {
        item_name: req.item_name.trim().to_string(),
        description: req.description.trim().to_string(),
        ..req
    }
}

/// Builds the insertable item, filling the schema defaults.
pub fn validate_new_item(req: CreateItemRequest) -> Result<NewItem, ApiError> {
    let req = trimmed(req);
    req.validate()?;
    Ok(NewItem {
        item_name: req.item_name,
        rent_price: req.rent_price,
        description: req.description,
        image_url: image_or_placeholder(req.image_url),
        category: req.category.unwrap_or_default(),
        condition: req.condition.unwrap_or_default(),
    })
}

/// Re-validates a merged item against the same rules as creation.
pub fn validate_item(mut item: Item) -> Result<Item, ApiError> {
    let view = trimmed(CreateItemRequest::from(&item));
    view.validate()?;
    item.item_name = view.item_name;
    item.description = view.description;
    item.image_url = image_or_placeholder(view.image_url);
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Condition, Role};

    fn create(name: &str, price: f64) -> CreateItemRequest {
        CreateItemRequest {
            item_name: name.into(),
            rent_price: price,
            description: "A sturdy drill".into(),
            image_url: None,
            category: None,
            condition: None,
        }
    }

    #[test]
    fn create_fills_defaults() {
        let item = validate_new_item(create("  Drill ", 50.0)).unwrap();
        assert_eq!(item.item_name, "Drill");
        assert_eq!(item.image_url, PLACEHOLDER_IMAGE_URL);
        assert_eq!(item.category, Category::Other);
        assert_eq!(item.condition, Condition::Good);
    }

    #[test]
    fn price_must_be_non_negative_and_finite() {
        assert!(validate_new_item(create("Drill", 0.0)).is_ok());
        assert!(validate_new_item(create("Drill", -1.0)).is_err());
        assert!(validate_new_item(create("Drill", f64::NAN)).is_err());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = validate_new_item(create("   ", 10.0)).unwrap_err();
        assert_eq!(err.to_string(), "itemName is required");

        let err = validate_new_item(create("Drill", -3.0)).unwrap_err();
        assert_eq!(err.to_string(), "rentPrice must be a non-negative number");
    }

    #[test]
    fn signup_normalizes_email() {
        let req = SignupRequest {
            name: " Ada ".into(),
            email: " Ada@Example.COM ".into(),
            password: "secret1".into(),
            role: Role::Renter,
        };
        assert_eq!(
            validate_signup(&req).unwrap(),
            ("Ada".to_string(), "ada@example.com".to_string())
        );
    }

    #[test]
    fn signup_rejects_short_password_and_bad_email() {
        let mut req = SignupRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "12345".into(),
            role: Role::Owner,
        };
        assert!(validate_signup(&req).is_err());

        req.password = "123456".into();
        req.email = "ada.example.com".into();
        let err = validate_signup(&req).unwrap_err();
        assert_eq!(err.to_string(), "A valid email is required");

        req.email = "ada@example.com".into();
        req.name = "  ".into();
        assert_eq!(validate_signup(&req).unwrap_err().to_string(), "name is required");
    }

    #[test]
    fn merged_item_is_checked_like_a_new_one() {
        let now = chrono::Utc::now();
        let item = Item {
            id: uuid::Uuid::new_v4(),
            item_name: " Tripod ".into(),
            rent_price: 12.0,
            description: "Aluminium".into(),
            image_url: "  ".into(),
            category: Category::Camera,
            condition: Condition::Fair,
            owned_by: uuid::Uuid::new_v4(),
            is_available: true,
            created_at: now,
            updated_at: now,
        };

        let checked = validate_item(item.clone()).unwrap();
        assert_eq!(checked.item_name, "Tripod");
        assert_eq!(checked.image_url, PLACEHOLDER_IMAGE_URL);

        let blank = Item {
            description: " ".into(),
            ..item.clone()
        };
        assert!(validate_item(blank).is_err());

        let negative = Item {
            rent_price: -0.5,
            ..item
        };
        assert!(validate_item(negative).is_err());
    }
}
