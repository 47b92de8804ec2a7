use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
};
use certwatch_common::views::ApiErrorResponse;
use certwatch_db::storage::StoreError;
use certwatch_service::CertificateError;
use thiserror::Error;
use tracing::{debug, error};

const INTERNAL_MESSAGE: &str = "Something went wrong on our end. Please try again later.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidBody(rejection) => match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Certificate(ce) => match ce {
                CertificateError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CertificateError::Conflict => StatusCode::CONFLICT,
                CertificateError::NotFound => StatusCode::NOT_FOUND,
                CertificateError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        let (code, message) = match &err {
            ApiError::BadRequest(message) => ("BadRequest", message.clone()),
            ApiError::InvalidBody(rejection) => match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => (
                    "PayloadTooLarge",
                    "The request body is too large.".to_string(),
                ),
                _ => ("BadRequest", rejection.body_text()),
            },
            ApiError::Certificate(ce) => match ce {
                CertificateError::InvalidInput(ve) => ("InvalidInput", ve.to_string()),
                CertificateError::Conflict => (
                    "Conflict",
                    "A certificate with this fingerprint is already registered.".to_string(),
                ),
                CertificateError::NotFound => (
                    "NotFound",
                    "The requested resource was not found.".to_string(),
                ),
                CertificateError::Other(_) => ("InternalError", INTERNAL_MESSAGE.to_string()),
            },
            ApiError::Storage(_) => ("InternalError", INTERNAL_MESSAGE.to_string()),
        };

        ApiErrorResponse {
            code: Some(code.into()),
            message,

            #[cfg(debug_assertions)]
            details: Some(err.to_string()),

            #[cfg(not(debug_assertions))]
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(error = %self, "Error returned by handler");
        } else {
            debug!(error = %self, status = status_code.as_u16(), "Request rejected");
        }

        (status_code, Json(ApiErrorResponse::from(self))).into_response()
    }
}
