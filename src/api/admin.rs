use crate::{
    auth::ExtractAuth,
    error::{AppError, AppResult},
    extract::{JsonBody, PathParam, QueryParams},
    lifecycle::{self, StatusUpdateRequest},
    models::Role,
    notify::Invalidation,
    policy::Operation,
    read_model::{envelope, ClubResponse, Envelope},
    store::ClubFilter,
    AppState,
};
use axum::{
    routing::{get, patch},
    Extension, Json, Router,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct StatusQuery {
    status: Option<String>,
}

fn status_filter(status: Option<&str>) -> AppResult<ClubFilter> {
    let verified = match status {
        None => return Ok(ClubFilter::default()),
        Some("verified") => true,
        Some("pending") => false,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "unknown status `{other}`, expected `verified` or `pending`"
            )))
        }
    };
    Ok(ClubFilter {
        role: Some(Role::Club),
        verified: Some(verified),
        search: None,
    })
}

async fn all_clubs(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
) -> AppResult<Json<Envelope<Vec<ClubResponse>>>> {
    lifecycle::authorize(&caller, Operation::ListAllClubs)?;

    let clubs = state.store.clubs(&ClubFilter::default()).await?;
    Ok(envelope(clubs.into_iter().map(ClubResponse::from).collect()))
}

async fn clubs_by_status(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
    QueryParams(query): QueryParams<StatusQuery>,
) -> AppResult<Json<Envelope<Vec<ClubResponse>>>> {
    lifecycle::authorize(&caller, Operation::ListAllClubs)?;

    let filter = status_filter(query.status.as_deref())?;
    let clubs = state.store.clubs(&filter).await?;
    Ok(envelope(clubs.into_iter().map(ClubResponse::from).collect()))
}

async fn set_status(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
    PathParam(club_id): PathParam<String>,
    JsonBody(req): JsonBody<StatusUpdateRequest>,
) -> AppResult<Json<Envelope<ClubResponse>>> {
    let club = lifecycle::set_verification(state.store.as_ref(), &caller, &club_id, req).await?;
    state.revalidator.notify(Invalidation::Clubs);
    Ok(envelope(ClubResponse::from(club)))
}

pub fn app() -> Router {
    Router::new()
        .route("/all_clubs", get(all_clubs))
        .route("/admin/clubs", get(clubs_by_status))
        .route("/admin/clubs/:club_id/status", patch(set_status))
}
