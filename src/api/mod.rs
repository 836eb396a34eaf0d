use axum::Router;

pub mod admin;
pub mod auth;
pub mod club;
pub mod contact;
pub mod event;
pub mod upload;

pub fn app() -> Router {
    Router::new()
        .merge(auth::app())
        .merge(event::app())
        .merge(club::app())
        .merge(admin::app())
        .merge(upload::app())
        .merge(contact::app())
}
