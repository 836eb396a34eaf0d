use crate::{
    auth::{ClientAddr, ExtractAuth},
    error::{AppError, AppResult},
    extract::JsonBody,
    lifecycle::{self, ContactRequest},
    rate_limit::Bucket,
    read_model::{envelope, ContactResponse, Envelope},
    AppState,
};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};

async fn submit(
    Extension(state): Extension<AppState>,
    ClientAddr(client): ClientAddr,
    JsonBody(req): JsonBody<ContactRequest>,
) -> AppResult<(StatusCode, Json<Envelope<ContactResponse>>)> {
    if !state.limiter.allow(Bucket::Contact, &client).await {
        return Err(AppError::RateLimited);
    }

    let contact = lifecycle::submit_contact(state.store.as_ref(), req).await?;
    Ok((StatusCode::CREATED, envelope(ContactResponse::from(contact))))
}

async fn recent(
    Extension(state): Extension<AppState>,
    ExtractAuth(caller): ExtractAuth,
) -> AppResult<Json<Envelope<Vec<ContactResponse>>>> {
    let contacts = lifecycle::recent_contacts(
        state.store.as_ref(),
        &caller,
        state.settings.contact_window_days,
    )
    .await?;
    Ok(envelope(contacts.into_iter().map(ContactResponse::from).collect()))
}

pub fn app() -> Router {
    Router::new()
        .route("/contact", post(submit))
        .route("/get_contacts", get(recent))
}
