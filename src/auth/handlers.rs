use axum::{
    extract::{Query, State},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginForm, MessageResponse, RegisterRequest, TokenResponse, VerifyQuery},
        extractors::CurrentUser,
        repo_types::User,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token", post(login))
        .route("/auth/register", post(register))
        .route("/auth/verify", get(verify_email))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<User>, AppError> {
    let user = state.auth.register(&payload.email, &payload.password).await?;
    Ok(Json(user))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(token))
}

#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.verify_email(&query.token).await?;
    Ok(Json(MessageResponse {
        msg: "Email verified successfully",
    }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
