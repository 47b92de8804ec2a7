use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use certwatch_common::{
    params::{CreateCertificateParams, ListCertificatesParams, parse_duration},
    views::{ApiErrorResponse, Certificate},
};
use certwatch_service::ExpiryOption;

use crate::{context::ApiContext, error::ApiError};


#[utoipa::path(
    post,
    path = "/certificates",
    tags = ["certificates"],
    request_body = CreateCertificateParams,
    responses(
        (status = 201, description = "Registered certificate", body = Certificate),
        (status = 400, description = "Invalid certificate data", body = ApiErrorResponse),
        (status = 409, description = "Fingerprint already registered", body = ApiErrorResponse),
    )
)]
pub async fn create_certificate(
    State(ctx): State<ApiContext>,
    payload: Result<Json<CreateCertificateParams>, JsonRejection>,
) -> Result<(StatusCode, Json<Certificate>), ApiError> {
    let Json(params) = payload?;
    let cert = ctx.certificates.create(params).await?;

    Ok((StatusCode::CREATED, Json(cert)))
}

#[utoipa::path(
    get,
    path = "/certificates",
    tags = ["certificates"],
    params(ListCertificatesParams),
    responses(
        (status = 200, description = "Registered certificates", body = Vec<Certificate>),
        (status = 400, description = "Malformed query", body = ApiErrorResponse),
    )
)]
pub async fn list_certificates(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListCertificatesParams>,
) -> Result<Json<Vec<Certificate>>, ApiError> {
    let certs = match non_empty(query.expiring_within.as_deref()) {
        Some(window) => {
            let window = parse_duration(window).map_err(|e| {
                ApiError::bad_request(format!("invalid value for expiring_within: {e}"))
            })?;
            let include_expired = match non_empty(query.expired.as_deref()) {
                Some(flag) => parse_flag(flag).ok_or_else(|| {
                    ApiError::bad_request(format!("invalid value for expired: `{flag}`"))
                })?,
                None => true,
            };

            ctx.certificates
                .list_expiring(window, ExpiryOption::from(include_expired))
                .await?
        }
        None => ctx.certificates.list().await?,
    };

    Ok(Json(certs))
}

#[utoipa::path(
    get,
    path = "/certificates/{id}",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Resolved certificate", body = Certificate),
        (status = 404, description = "No certificate with this id", body = ApiErrorResponse),
    )
)]
pub async fn get_certificate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    Ok(Json(ctx.certificates.get(&id).await?))
}

#[utoipa::path(
    delete,
    path = "/certificates/{id}",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 204, description = "Certificate removed"),
        (status = 404, description = "No certificate with this id", body = ApiErrorResponse),
    )
)]
pub async fn delete_certificate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.certificates.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
