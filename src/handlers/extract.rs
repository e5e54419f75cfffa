//! Extractors whose rejections render as [`AppError`]

use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON body; malformed or mistyped input becomes a validation error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters; an unparsable id becomes a validation error.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
