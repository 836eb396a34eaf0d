use crate::{policy::Denial, store::StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::borrow::Cow;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(Cow<'static, str>),
    #[error("{0}")]
    Conflict(Cow<'static, str>),
    #[error("{0}")]
    Forbidden(Cow<'static, str>),
    #[error("{0}")]
    Unauthorized(Cow<'static, str>),
    #[error("{0}")]
    BadRequest(Cow<'static, str>),
    #[error("too many requests, try again later")]
    RateLimited,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(s: impl Into<Cow<'static, str>>) -> AppError {
        AppError::NotFound(s.into())
    }

    pub fn forbidden(s: impl Into<Cow<'static, str>>) -> AppError {
        AppError::Forbidden(s.into())
    }

    pub fn unauthorized(s: impl Into<Cow<'static, str>>) -> AppError {
        AppError::Unauthorized(s.into())
    }

    pub fn bad_request(s: impl Into<Cow<'static, str>>) -> AppError {
        AppError::BadRequest(s.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // duplicate registrations are reported as a plain client error
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct AppErrorResponse {
            success: bool,
            status: u16,
            error_msg: Cow<'static, str>,
        }

        let code = self.status();
        let error_msg = match self {
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                Cow::Borrowed("Internal Server Error")
            }
            AppError::RateLimited => Cow::Owned(AppError::RateLimited.to_string()),
            AppError::NotFound(s)
            | AppError::Conflict(s)
            | AppError::Forbidden(s)
            | AppError::Unauthorized(s)
            | AppError::BadRequest(s) => s,
        };

        (
            code,
            Json(AppErrorResponse {
                success: false,
                status: code.as_u16(),
                error_msg,
            }),
        )
            .into_response()
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> AppError {
        match denial {
            Denial::NotFound(_) => AppError::NotFound(denial.to_string().into()),
            Denial::NotOwner | Denial::AdminOnly | Denial::Unverified => {
                AppError::Forbidden(denial.to_string().into())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> AppError {
        match e {
            StoreError::Conflict(s) => AppError::Conflict(s.into()),
            other => AppError::Internal(other.into()),
        }
    }
}
