use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};

use super::super::extract::AppJson;
use crate::{
    error::{AppError, AppResult},
    models::{method_type, ContactView},
    services::contacts::{ContactChanges, ContactsService, NewContact, NewDetail},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct GetContactsQuery {
    pub q: Option<String>,
}

pub async fn get_contacts(
    State(state): State<AppState>,
    Query(query): Query<GetContactsQuery>,
) -> AppResult<Json<Vec<ContactView>>> {
    let contacts_service = ContactsService::new(state.db);
    let contacts = contacts_service.list_contacts(query.q.as_deref()).await?;

    Ok(Json(contacts))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<i64>,
) -> AppResult<Json<ContactView>> {
    let contacts_service = ContactsService::new(state.db);
    let contact = contacts_service.get_contact(contact_id).await?;

    Ok(Json(contact))
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailInput {
    #[serde(rename = "type")]
    pub method_type: String,
    pub value: String,
}

impl From<DetailInput> for NewDetail {
    fn from(input: DetailInput) -> Self {
        NewDetail::new(input.method_type, input.value)
    }
}

/// Body of `POST /contacts`. `phone` and `email` are shorthands for a
/// single detail of that type; `details` carries any number of typed ones.
#[derive(Debug, Default, Deserialize)]
pub struct AddContactRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub details: Option<Vec<DetailInput>>,
}

impl AddContactRequest {
    pub fn into_new_contact(self) -> AppResult<NewContact> {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(AppError::Validation("Name is required".to_string())),
        };

        let details = collect_details(
            self.phone.as_deref(),
            self.email.as_deref(),
            self.details.unwrap_or_default(),
        )?;

        Ok(NewContact { name, details })
    }
}

pub async fn add_contact(
    State(state): State<AppState>,
    AppJson(req): AppJson<AddContactRequest>,
) -> AppResult<(StatusCode, Json<ContactView>)> {
    let new_contact = req.into_new_contact()?;

    let contacts_service = ContactsService::new(state.db);
    let contact = contacts_service.create_contact(new_contact).await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

/// Favorite flag as sent by clients: a JSON bool, or 0/1 from older ones.
/// Any non-zero integer counts as true.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum FavoriteFlag {
    Bool(bool),
    Int(i64),
}

impl From<FavoriteFlag> for bool {
    fn from(flag: FavoriteFlag) -> Self {
        match flag {
            FavoriteFlag::Bool(value) => value,
            FavoriteFlag::Int(value) => value != 0,
        }
    }
}

/// Body of `PUT /contacts/:id`. The detail fields are `Option<Option<_>>`
/// so that an explicit `null` still counts as present: any of the three
/// being present replaces the stored details.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub is_favorite: Option<FavoriteFlag>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub details: Option<Option<Vec<DetailInput>>>,
}

impl UpdateContactRequest {
    pub fn into_changes(self) -> AppResult<ContactChanges> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Name cannot be empty".to_string()));
            }
        }

        let touches_details =
            self.phone.is_some() || self.email.is_some() || self.details.is_some();

        let details = if touches_details {
            Some(collect_details(
                self.phone.flatten().as_deref(),
                self.email.flatten().as_deref(),
                self.details.flatten().unwrap_or_default(),
            )?)
        } else {
            None
        };

        Ok(ContactChanges {
            name: self.name,
            is_favorite: self.is_favorite.map(bool::from),
            details,
        })
    }
}

pub async fn update_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<i64>,
    AppJson(req): AppJson<UpdateContactRequest>,
) -> AppResult<Json<ContactView>> {
    let changes = req.into_changes()?;

    let contacts_service = ContactsService::new(state.db);
    let contact = contacts_service.update_contact(contact_id, changes).await?;

    Ok(Json(contact))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let contacts_service = ContactsService::new(state.db);
    contacts_service.delete_contact(contact_id).await?;

    Ok(Json(MessageResponse {
        message: "Contact deleted".to_string(),
    }))
}

/// Phone first, then email, then the explicit list in request order.
fn collect_details(
    phone: Option<&str>,
    email: Option<&str>,
    extra: Vec<DetailInput>,
) -> AppResult<Vec<NewDetail>> {
    let mut details = Vec::with_capacity(extra.len() + 2);

    if let Some(phone) = phone.filter(|p| !p.is_empty()) {
        details.push(NewDetail::new(method_type::PHONE, phone));
    }
    if let Some(email) = email.filter(|e| !e.is_empty()) {
        details.push(NewDetail::new(method_type::EMAIL, email));
    }

    for item in extra {
        if item.method_type.trim().is_empty() {
            return Err(AppError::Validation("Detail type is required".to_string()));
        }
        details.push(item.into());
    }

    Ok(details)
}

/// Maps a present field to `Some`, including an explicit `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
