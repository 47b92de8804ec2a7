use axum::extract::State;
use certwatch_common::views::ApiErrorResponse;

use crate::{context::ApiContext, error::ApiError};

pub mod certificates;

#[utoipa::path(
    get,
    path = "/health",
    tags = ["health"],
    responses(
        (status = 200, description = "Service and database are reachable", body = String),
        (status = 500, description = "Database is unreachable", body = ApiErrorResponse),
    )
)]
pub async fn health_check(State(ctx): State<ApiContext>) -> Result<&'static str, ApiError> {
    ctx.db.ping().await?;
    Ok("ok")
}
