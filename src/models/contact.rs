use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Well-known contact method types. The column is free text, so anything
/// else a client sends is stored as-is.
pub mod method_type {
    pub const PHONE: &str = "Phone";
    pub const EMAIL: &str = "Email";
    pub const ADDRESS: &str = "Address";
    pub const WECHAT: &str = "WeChat";

    /// Types that get their own spreadsheet column, in column order.
    pub const SPREADSHEET_COLUMNS: [&str; 4] = [PHONE, EMAIL, ADDRESS, WECHAT];
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContactDetail {
    pub id: i64,
    pub contact_id: i64,
    pub method_type: String,
    pub value: String,
}

/// Client-facing contact. `phone` and `email` mirror the first detail of
/// that type for clients that predate `details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactView {
    pub id: i64,
    pub name: String,
    pub is_favorite: bool,
    pub phone: String,
    pub email: String,
    pub details: Vec<ContactDetail>,
}

impl ContactView {
    pub fn new(contact: Contact, details: Vec<ContactDetail>) -> Self {
        let phone = first_value_of(&details, method_type::PHONE);
        let email = first_value_of(&details, method_type::EMAIL);

        Self {
            id: contact.id,
            name: contact.name,
            is_favorite: contact.is_favorite,
            phone,
            email,
            details,
        }
    }
}

fn first_value_of(details: &[ContactDetail], kind: &str) -> String {
    details
        .iter()
        .find(|d| d.method_type == kind)
        .map(|d| d.value.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(id: i64, kind: &str, value: &str) -> ContactDetail {
        ContactDetail {
            id,
            contact_id: 1,
            method_type: kind.to_string(),
            value: value.to_string(),
        }
    }

    fn alice() -> Contact {
        Contact {
            id: 1,
            name: "Alice".to_string(),
            is_favorite: true,
        }
    }

    #[test]
    fn primary_fields_use_first_detail_of_each_type() {
        let details = vec![
            detail(1, "Address", "1 Main St"),
            detail(2, "Phone", "555-1"),
            detail(3, "Email", "a@x.com"),
            detail(4, "Phone", "555-2"),
        ];

        let view = ContactView::new(alice(), details.clone());

        assert_eq!(view.id, 1);
        assert_eq!(view.name, "Alice");
        assert!(view.is_favorite);
        assert_eq!(view.phone, "555-1");
        assert_eq!(view.email, "a@x.com");
        assert_eq!(view.details, details);
    }

    #[test]
    fn missing_types_become_empty_strings() {
        let view = ContactView::new(alice(), vec![detail(1, "WeChat", "alice_wx")]);

        assert_eq!(view.phone, "");
        assert_eq!(view.email, "");
        assert_eq!(view.details.len(), 1);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phone"], "");
        assert_eq!(json["details"][0]["method_type"], "WeChat");
    }

    #[test]
    fn type_match_is_exact() {
        let view = ContactView::new(alice(), vec![detail(1, "phone", "555-1")]);
        assert_eq!(view.phone, "");
    }
}
