use crate::{
    auth::ExtractAuth,
    error::{AppError, AppResult},
    extract::{JsonBody, PathParam, QueryParams},
    lifecycle::{self, ClubUpdateRequest},
    notify::Invalidation,
    read_model::{envelope, ClubResponse, Envelope, EventResponse},
    store::ClubFilter,
    AppState,
};
use axum::{
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct DirectoryQuery {
    search: Option<String>,
}

async fn list(
    Extension(state): Extension<AppState>,
    QueryParams(query): QueryParams<DirectoryQuery>,
) -> AppResult<Json<Envelope<Vec<ClubResponse>>>> {
    let clubs = state
        .store
        .clubs(&ClubFilter::directory(query.search))
        .await?;
    Ok(envelope(clubs.into_iter().map(ClubResponse::from).collect()))
}

async fn info(
    Extension(state): Extension<AppState>,
    PathParam(club_id): PathParam<String>,
) -> AppResult<Json<Envelope<ClubResponse>>> {
    let club = state
        .store
        .club(&club_id)
        .await?
        .ok_or_else(|| AppError::not_found("Club not found"))?;
    Ok(envelope(ClubResponse::from(club)))
}

async fn events(
    Extension(state): Extension<AppState>,
    PathParam(club_id): PathParam<String>,
) -> AppResult<Json<Envelope<Vec<EventResponse>>>> {
    if state.store.club(&club_id).await?.is_none() {
        return Err(AppError::not_found("Club not found"));
    }

    let events = state.store.events_for_club(&club_id).await?;
    Ok(envelope(events.into_iter().map(EventResponse::from).collect()))
}

async fn edit(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
    PathParam(club_id): PathParam<String>,
    JsonBody(req): JsonBody<ClubUpdateRequest>,
) -> AppResult<Json<Envelope<ClubResponse>>> {
    let club = lifecycle::update_club(state.store.as_ref(), &caller, &club_id, req).await?;
    state.revalidator.notify(Invalidation::Clubs);
    Ok(envelope(ClubResponse::from(club)))
}

pub fn app() -> Router {
    Router::new()
        .route("/clubs", get(list))
        .route("/clubs/:club_id", get(info).patch(edit))
        .route("/clubs/:club_id/events", get(events))
}
