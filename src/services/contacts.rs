use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    error::{AppError, AppResult},
    models::{Contact, ContactDetail, ContactView},
};

/// A contact method to be stored, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDetail {
    pub method_type: String,
    pub value: String,
}

impl NewDetail {
    pub fn new(method_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            method_type: method_type.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub details: Vec<NewDetail>,
}

/// Partial update. `None` leaves the field alone; `details: Some(..)`
/// replaces every stored detail, even when the new list is empty.
#[derive(Debug, Clone, Default)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub is_favorite: Option<bool>,
    pub details: Option<Vec<NewDetail>>,
}

pub struct ContactsService {
    db: SqlitePool,
}

impl ContactsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List contacts, favorites first then by name, optionally filtered by a
    /// case-insensitive substring of the name.
    pub async fn list_contacts(&self, query: Option<&str>) -> AppResult<Vec<ContactView>> {
        let mut conn = self.db.acquire().await?;

        let contacts: Vec<Contact> = match query.filter(|q| !q.is_empty()) {
            Some(q) => {
                sqlx::query_as(
                    r#"
                    SELECT id, name, is_favorite FROM contacts
                    WHERE name LIKE ? ESCAPE '\'
                    ORDER BY is_favorite DESC, name ASC
                    "#,
                )
                .bind(like_pattern(q))
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, name, is_favorite FROM contacts ORDER BY is_favorite DESC, name ASC",
                )
                .fetch_all(&mut *conn)
                .await?
            }
        };

        let mut result = Vec::with_capacity(contacts.len());
        for contact in contacts {
            let details = fetch_details(&mut conn, contact.id).await?;
            result.push(ContactView::new(contact, details));
        }

        Ok(result)
    }

    /// Get a single contact
    pub async fn get_contact(&self, id: i64) -> AppResult<ContactView> {
        let mut conn = self.db.acquire().await?;
        load_view(&mut conn, id).await
    }

    /// Create a contact together with its details
    pub async fn create_contact(&self, new: NewContact) -> AppResult<ContactView> {
        let mut tx = self.db.begin().await?;

        let id = insert_contact(&mut tx, &new.name, false).await?;
        insert_details(&mut tx, id, &new.details).await?;
        let view = load_view(&mut tx, id).await?;

        tx.commit().await?;
        Ok(view)
    }

    /// Apply a partial update. Details are replaced wholesale, never merged.
    pub async fn update_contact(&self, id: i64, changes: ContactChanges) -> AppResult<ContactView> {
        let mut tx = self.db.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::ContactNotFound);
        }

        if let Some(name) = &changes.name {
            sqlx::query("UPDATE contacts SET name = ? WHERE id = ?")
                .bind(name)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(is_favorite) = changes.is_favorite {
            sqlx::query("UPDATE contacts SET is_favorite = ? WHERE id = ?")
                .bind(is_favorite)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(details) = &changes.details {
            sqlx::query("DELETE FROM contact_details WHERE contact_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_details(&mut tx, id, details).await?;
        }

        let view = load_view(&mut tx, id).await?;

        tx.commit().await?;
        Ok(view)
    }

    /// Delete contact. Details go with it through the foreign key cascade.
    pub async fn delete_contact(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ContactNotFound);
        }

        Ok(())
    }
}

pub(crate) async fn insert_contact(
    conn: &mut SqliteConnection,
    name: &str,
    is_favorite: bool,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO contacts (name, is_favorite) VALUES (?, ?)")
        .bind(name)
        .bind(is_favorite)
        .execute(&mut *conn)
        .await?;

    Ok(result.last_insert_rowid())
}

pub(crate) async fn insert_details(
    conn: &mut SqliteConnection,
    contact_id: i64,
    details: &[NewDetail],
) -> Result<(), sqlx::Error> {
    for detail in details {
        sqlx::query(
            "INSERT INTO contact_details (contact_id, method_type, value) VALUES (?, ?, ?)",
        )
        .bind(contact_id)
        .bind(&detail.method_type)
        .bind(&detail.value)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub(crate) async fn fetch_details(
    conn: &mut SqliteConnection,
    contact_id: i64,
) -> Result<Vec<ContactDetail>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, contact_id, method_type, value FROM contact_details WHERE contact_id = ? ORDER BY id",
    )
    .bind(contact_id)
    .fetch_all(&mut *conn)
    .await
}

async fn load_view(conn: &mut SqliteConnection, id: i64) -> AppResult<ContactView> {
    let contact: Option<Contact> =
        sqlx::query_as("SELECT id, name, is_favorite FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    let contact = contact.ok_or(AppError::ContactNotFound)?;
    let details = fetch_details(conn, id).await?;

    Ok(ContactView::new(contact, details))
}

/// Substring pattern for `LIKE ... ESCAPE '\'` with wildcards taken literally.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::memory_pool;

    async fn service() -> ContactsService {
        ContactsService::new(memory_pool().await)
    }

    fn contact(name: &str, details: Vec<NewDetail>) -> NewContact {
        NewContact {
            name: name.to_string(),
            details,
        }
    }

    fn names(views: &[ContactView]) -> Vec<&str> {
        views.iter().map(|v| v.name.as_str()).collect()
    }

    #[tokio::test]
    async fn create_returns_flattened_view() {
        let svc = service().await;

        let view = svc
            .create_contact(contact(
                "Alice",
                vec![
                    NewDetail::new("Phone", "555-1234"),
                    NewDetail::new("Email", "a@x.com"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(view.name, "Alice");
        assert!(!view.is_favorite);
        assert_eq!(view.phone, "555-1234");
        assert_eq!(view.email, "a@x.com");
        assert_eq!(view.details.len(), 2);
        assert!(view.details.iter().all(|d| d.contact_id == view.id));
    }

    #[tokio::test]
    async fn list_orders_favorites_first_then_by_name() {
        let svc = service().await;
        for name in ["Dave", "Carol", "Bob", "Alice"] {
            svc.create_contact(contact(name, vec![])).await.unwrap();
        }
        let carol = svc.list_contacts(Some("Carol")).await.unwrap()[0].id;
        let dave = svc.list_contacts(Some("Dave")).await.unwrap()[0].id;
        for id in [carol, dave] {
            svc.update_contact(
                id,
                ContactChanges {
                    is_favorite: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let all = svc.list_contacts(None).await.unwrap();
        assert_eq!(names(&all), vec!["Carol", "Dave", "Alice", "Bob"]);

        let empty_query = svc.list_contacts(Some("")).await.unwrap();
        assert_eq!(names(&empty_query), names(&all));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_name_only() {
        let svc = service().await;
        svc.create_contact(contact("Alice Smith", vec![NewDetail::new("Email", "bob@x.com")]))
            .await
            .unwrap();
        svc.create_contact(contact("Bob Jones", vec![])).await.unwrap();
        svc.create_contact(contact("MALICE", vec![])).await.unwrap();

        let found = svc.list_contacts(Some("alice")).await.unwrap();
        assert_eq!(names(&found), vec!["Alice Smith", "MALICE"]);

        // "bob" appears in Alice's email but only Bob's name should match
        let found = svc.list_contacts(Some("BOB")).await.unwrap();
        assert_eq!(names(&found), vec!["Bob Jones"]);
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let svc = service().await;
        svc.create_contact(contact("100% Real", vec![])).await.unwrap();
        svc.create_contact(contact("Plain", vec![])).await.unwrap();

        let found = svc.list_contacts(Some("%")).await.unwrap();
        assert_eq!(names(&found), vec!["100% Real"]);

        let found = svc.list_contacts(Some("_")).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn favorite_only_update_keeps_details() {
        let svc = service().await;
        let created = svc
            .create_contact(contact("Alice", vec![NewDetail::new("Phone", "555-1")]))
            .await
            .unwrap();

        let updated = svc
            .update_contact(
                created.id,
                ContactChanges {
                    is_favorite: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.is_favorite);
        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.details, created.details);
    }

    #[tokio::test]
    async fn detail_update_replaces_everything() {
        let svc = service().await;
        let created = svc
            .create_contact(contact(
                "Alice",
                vec![
                    NewDetail::new("Phone", "555-1"),
                    NewDetail::new("Email", "a@x.com"),
                ],
            ))
            .await
            .unwrap();

        let updated = svc
            .update_contact(
                created.id,
                ContactChanges {
                    details: Some(vec![NewDetail::new("Phone", "999")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone, "999");
        assert_eq!(updated.email, "");
        assert_eq!(updated.details.len(), 1);
        assert_eq!(updated.details[0].method_type, "Phone");
        assert_eq!(updated.details[0].value, "999");
    }

    #[tokio::test]
    async fn empty_detail_list_clears_details() {
        let svc = service().await;
        let created = svc
            .create_contact(contact("Alice", vec![NewDetail::new("Phone", "555-1")]))
            .await
            .unwrap();

        let updated = svc
            .update_contact(
                created.id,
                ContactChanges {
                    name: Some("Alicia".to_string()),
                    details: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Alicia");
        assert!(updated.details.is_empty());
    }

    #[tokio::test]
    async fn update_unknown_contact_writes_nothing() {
        let svc = service().await;

        let err = svc
            .update_contact(
                77,
                ContactChanges {
                    details: Some(vec![NewDetail::new("Phone", "1")]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ContactNotFound));

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contact_details")
            .fetch_one(&svc.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn delete_cascades_and_second_delete_is_not_found() {
        let svc = service().await;
        let created = svc
            .create_contact(contact(
                "Alice",
                vec![
                    NewDetail::new("Phone", "555-1"),
                    NewDetail::new("Address", "1 Main St"),
                ],
            ))
            .await
            .unwrap();

        svc.delete_contact(created.id).await.unwrap();

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM contact_details WHERE contact_id = ?")
                .bind(created.id)
                .fetch_one(&svc.db)
                .await
                .unwrap();
        assert_eq!(count, 0);

        let err = svc.delete_contact(created.id).await.unwrap_err();
        assert!(matches!(err, AppError::ContactNotFound));
        assert!(matches!(
            svc.get_contact(created.id).await.unwrap_err(),
            AppError::ContactNotFound
        ));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("al"), "%al%");
        assert_eq!(like_pattern("50%_x\\"), "%50\\%\\_x\\\\%");
    }
}
