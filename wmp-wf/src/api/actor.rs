//! Caller extraction
//!
//! Wraps the shared header parsing in an axum extractor. A request with
//! missing or malformed actor headers is rejected with 403 before the
//! handler runs.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use wmp_common::api::{Actor, ID_HEADER, ROLE_HEADER};

use crate::error::ApiError;

/// Authenticated caller of a handler
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|value| value.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_headers(
            header_value(parts, ROLE_HEADER),
            header_value(parts, ID_HEADER),
        )?;
        Ok(Caller(actor))
    }
}
