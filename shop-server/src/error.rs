//! Maps [`ShopError`] onto HTTP responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shop_core::ShopError;
use tracing::error;

/// Message of a 5xx error, attached to the response for the error reporter.
#[derive(Debug, Clone)]
pub struct ServerFault(pub String);

#[derive(Debug)]
pub struct ApiError(pub ShopError);

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ShopError::NotFound(_) => StatusCode::NOT_FOUND,
            ShopError::Conflict(_) => StatusCode::CONFLICT,
            ShopError::BadRequest(_) | ShopError::Validation(_) => StatusCode::BAD_REQUEST,
            ShopError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShopError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ShopError::Database { .. } | ShopError::Json(_) | ShopError::Io(_) | ShopError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ShopError> for ApiError {
    fn from(e: ShopError) -> Self {
        ApiError(e)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError(ShopError::Validation(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.0.to_string();

        let body = json!({
            "statusCode": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
        });

        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", message);
            let mut response = (status, Json(body)).into_response();
            response.extensions_mut().insert(ServerFault(message));
            return response;
        }

        (status, Json(body)).into_response()
    }
}

/// Turns axum's body rejections into the same JSON error shape.
pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError(ShopError::BadRequest(rejection.body_text()))
}

pub fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError(ShopError::BadRequest(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (ShopError::NotFound("x".into()), 404),
            (ShopError::Conflict("x".into()), 409),
            (ShopError::BadRequest("x".into()), 400),
            (ShopError::Forbidden("x".into()), 403),
            (ShopError::Unauthorized("x".into()), 401),
            (ShopError::Internal("x".into()), 500),
            (ShopError::Database { message: "x".into() }, 500),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status().as_u16(), expected);
        }
    }

    #[test]
    fn server_errors_are_marked_for_reporting() {
        let response = ApiError(ShopError::Internal("disk full".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<ServerFault>().is_some());

        let response = ApiError(ShopError::NotFound("gone".into())).into_response();
        assert!(response.extensions().get::<ServerFault>().is_none());
    }
}
