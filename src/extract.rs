//! Wrappers over axum's body, query and path extractors that report
//! rejections through [`AppError`] instead of axum's plain-text bodies.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{
        rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
        Form, FromRequest, Path, Query, RequestParts,
    },
    http::header::CONTENT_TYPE,
    Json,
};
use std::error::Error;

/// The rejection message followed by whichever causes add detail to it.
fn describe(rejection: &dyn Error) -> String {
    let mut message = rejection.to_string();
    let mut source = rejection.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for JsonBody<T>
where
    T: Send,
    B: Send,
    Json<T>: FromRequest<B, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req)
            .await
            .map_err(|e| AppError::bad_request(describe(&e)))?;
        Ok(JsonBody(value))
    }
}

pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for QueryParams<T>
where
    T: Send,
    B: Send,
    Query<T>: FromRequest<B, Rejection = QueryRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request(req)
            .await
            .map_err(|e| AppError::bad_request(describe(&e)))?;
        Ok(QueryParams(value))
    }
}

pub struct PathParam<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for PathParam<T>
where
    T: Send,
    B: Send,
    Path<T>: FromRequest<B, Rejection = PathRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request(req)
            .await
            .map_err(|e| AppError::bad_request(describe(&e)))?;
        Ok(PathParam(value))
    }
}

/// A JSON body, or an `application/x-www-form-urlencoded` one.
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, B> FromRequest<B> for JsonOrForm<T>
where
    T: Send,
    B: Send,
    Json<T>: FromRequest<B, Rejection = JsonRejection>,
    Form<T>: FromRequest<B, Rejection = FormRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |v| v.starts_with("application/x-www-form-urlencoded"));

        if !is_form {
            let JsonBody(value) = JsonBody::<T>::from_request(req).await?;
            return Ok(JsonOrForm(value));
        }
        let Form(value) = Form::<T>::from_request(req)
            .await
            .map_err(|e| AppError::bad_request(describe(&e)))?;
        Ok(JsonOrForm(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_includes_the_cause() {
        let cause = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let wrapped = anyhow::Error::new(cause).context("failed to read body");
        let message = describe(&*wrapped);
        assert!(message.starts_with("failed to read body: "));
        assert!(message.contains("expected u32"));
    }
}
