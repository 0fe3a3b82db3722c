//! Request body extraction with validation

use crate::error::{envelope_response, ApiError};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body that has passed its `Validate` rules
///
/// Malformed JSON and rule violations both become a 400 `{"error": ...}`.
/// An oversized body keeps its 413.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(reject_json)?;

        value
            .validate()
            .map_err(|e| ApiError::from(e).into_response())?;

        Ok(Self(value))
    }
}

fn reject_json(rejection: JsonRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return envelope_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
    }
    ApiError::Validation(rejection.body_text()).into_response()
}
