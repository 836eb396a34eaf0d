use crate::{
    auth::ExtractAuth,
    error::AppResult,
    extract::{JsonBody, JsonOrForm},
    lifecycle::{self, LoginRequest, SignupRequest},
    read_model::{envelope, ClubResponse, Envelope},
    AppState,
};
use anyhow::Context;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

async fn signup(
    Extension(state): Extension<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> AppResult<(StatusCode, Json<Envelope<ClubResponse>>)> {
    let club = lifecycle::register_club(state.store.as_ref(), req).await?;
    Ok((StatusCode::CREATED, envelope(ClubResponse::from(club))))
}

async fn login(
    Extension(state): Extension<AppState>,
    JsonOrForm(req): JsonOrForm<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let club = lifecycle::authenticate(state.store.as_ref(), &req).await?;
    let access_token = state
        .tokens
        .issue(&club.id)
        .context("failed to sign access token")?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

async fn me(ExtractAuth(club): ExtractAuth) -> Json<Envelope<ClubResponse>> {
    envelope(ClubResponse::from(club))
}

pub fn app() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/users/me", get(me))
}
