use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    birthdays::DEFAULT_WINDOW_DAYS,
    dto::{ContactUpdate, NewContact, Pagination, SearchQuery},
    repo_types::Contact,
};
use crate::{auth::CurrentUser, error::AppError, state::AppState};

const NOT_FOUND: &str = "Contact not found";

pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts/", get(list_contacts).post(create_contact))
        .route("/contacts/search/", get(search_contacts))
        .route("/contacts/upcoming_birthdays/", get(upcoming_birthdays))
        .route(
            "/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

#[instrument(skip_all)]
pub async fn create_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<NewContact>,
) -> Result<Json<Contact>, AppError> {
    body.validate()?;
    let contact = Contact::create(&state.db, user.id, &body).await?;
    info!(user_id = %user.id, contact_id = %contact.id, "contact created");
    Ok(Json(contact))
}

#[instrument(skip(state, user))]
pub async fn list_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Contact>>, AppError> {
    let (offset, limit) = p.clamped();
    let rows = Contact::list_by_owner(&state.db, user.id, offset, limit).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user))]
pub async fn get_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>, AppError> {
    Contact::find(&state.db, user.id, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, user, body))]
pub async fn update_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ContactUpdate>,
) -> Result<Json<Contact>, AppError> {
    body.validate()?;
    Contact::update(&state.db, user.id, id, &body)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, user))]
pub async fn delete_contact(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Contact>, AppError> {
    let deleted = Contact::delete(&state.db, user.id, id)
        .await?
        .ok_or(AppError::NotFound(NOT_FOUND))?;
    info!(user_id = %user.id, contact_id = %id, "contact deleted");
    Ok(Json(deleted))
}

#[instrument(skip(state, user, q))]
pub async fn search_contacts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Contact>>, AppError> {
    if q.query.trim().is_empty() {
        return Err(AppError::BadRequest("query must not be empty".into()));
    }
    let rows = Contact::search(&state.db, user.id, &q.query).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, user))]
pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Contact>>, AppError> {
    let today = OffsetDateTime::now_utc().date();
    let rows =
        Contact::upcoming_birthdays(&state.db, user.id, today, DEFAULT_WINDOW_DAYS).await?;
    Ok(Json(rows))
}
