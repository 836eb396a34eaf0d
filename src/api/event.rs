use crate::{
    auth::{ClientAddr, ExtractAuth},
    error::{AppError, AppResult},
    extract::{JsonBody, PathParam, QueryParams},
    lifecycle::{self, EventCreateRequest, EventUpdateRequest},
    notify::Invalidation,
    rate_limit::Bucket,
    read_model::{envelope, Envelope, EventResponse},
    week::{parse_date, week_range},
    AppState,
};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct WeeklyQuery {
    date: Option<String>,
}

#[derive(Deserialize)]
struct LikeRequest {
    liked: bool,
}

#[derive(Serialize)]
struct LikeResponse {
    likes: i32,
}

async fn weekly(
    Extension(state): Extension<AppState>,
    ClientAddr(client): ClientAddr,
    QueryParams(query): QueryParams<WeeklyQuery>,
) -> AppResult<Json<Envelope<Vec<EventResponse>>>> {
    if !state.limiter.allow(Bucket::Weekly, &client).await {
        return Err(AppError::RateLimited);
    }

    let date = query
        .date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| AppError::bad_request("Invalid date format. Use YYYY-MM-DD"))?;
    let (start, end) = week_range(date);

    let events = state.store.events_between(start, end).await?;
    Ok(envelope(events.into_iter().map(EventResponse::from).collect()))
}

async fn create(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
    JsonBody(req): JsonBody<EventCreateRequest>,
) -> AppResult<(StatusCode, Json<Envelope<EventResponse>>)> {
    let created = lifecycle::create_event(state.store.as_ref(), &caller, req).await?;
    state.revalidator.notify(Invalidation::Events);
    Ok((StatusCode::CREATED, envelope(EventResponse::from(created))))
}

async fn info(
    Extension(state): Extension<AppState>,
    PathParam(event_id): PathParam<String>,
) -> AppResult<Json<Envelope<EventResponse>>> {
    let event = state
        .store
        .event(&event_id)
        .await?
        .ok_or_else(|| AppError::not_found("Event not found"))?;
    Ok(envelope(EventResponse::from(event)))
}

async fn edit(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
    PathParam(event_id): PathParam<String>,
    JsonBody(req): JsonBody<EventUpdateRequest>,
) -> AppResult<Json<Envelope<EventResponse>>> {
    let updated = lifecycle::update_event(state.store.as_ref(), &caller, &event_id, req).await?;
    state.revalidator.notify(Invalidation::Events);
    Ok(envelope(EventResponse::from(updated)))
}

async fn like(
    Extension(state): Extension<AppState>,
    PathParam(event_id): PathParam<String>,
    JsonBody(req): JsonBody<LikeRequest>,
) -> AppResult<Json<LikeResponse>> {
    let likes = lifecycle::toggle_like(state.store.as_ref(), &event_id, req.liked).await?;
    Ok(Json(LikeResponse { likes }))
}

pub fn app() -> Router {
    Router::new()
        .route("/events", post(create))
        .route("/events/weekly", get(weekly))
        .route("/events/:event_id", get(info).patch(edit))
        .route("/event_like/:event_id", post(like))
}
