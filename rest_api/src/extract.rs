// rest_api/src/extract.rs

//! Extractors whose rejections use the error envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::RestApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RestApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RestApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RestApiError))]
pub struct ApiPath<T>(pub T);
