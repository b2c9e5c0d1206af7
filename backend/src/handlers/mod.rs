//! HTTP handlers.
//!
//! Handlers are thin: they pull the principal and the payload out of the request,
//! delegate to the core, and wrap the result in the success envelope. Every failure
//! is an `AppError`, which renders the error envelope on its own.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub mod admin;
pub mod course;
pub mod user;

/// ApiResponse
///
/// Success half of the response envelope: `{ "status": "success", "data": ... }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: StatusCode::OK,
            status: "success",
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            code: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::AppError>;
