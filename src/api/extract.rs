//! Request extractors whose rejections render as [`ApiError`].
//!
//! Axum's stock `Json`/`Query`/`Path` reply with plain-text 415/422 bodies;
//! these wrappers keep every client error in the `{"error": ...}` shape with
//! a 400 status.

use axum::extract::{FromRequest, FromRequestParts};

use super::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
