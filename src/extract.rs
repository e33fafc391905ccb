//! `Path` and `Query` extractors whose rejections use the `{"error": ...}` body
//! every other failure returns, instead of axum's plain-text 400.

use axum::extract::{rejection::PathRejection, rejection::QueryRejection, FromRequestParts};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::AppError;

pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) = axum::extract::Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(path_error)?;
        Ok(Self(value))
    }
}

fn path_error(rejection: PathRejection) -> AppError {
    // Missing or mismatched route params are server-side faults.
    if rejection.status().is_server_error() {
        AppError::internal(rejection.body_text())
    } else {
        AppError::validation(rejection.body_text())
    }
}

pub struct Query<T>(pub T);

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) = axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| AppError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
