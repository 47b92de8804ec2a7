use axum::{
    Router,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, Request},
};
use certwatch_common::views::ApiErrorResponse;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::{
    ToSchema,
    openapi::{Info, License, OpenApi, RefOr, path::Operation},
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{context::ApiContext, handlers};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the HTTP router around `context` along with its OpenAPI document.
pub fn make(context: ApiContext) -> (Router, OpenApi) {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            MakeRequestUuid,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        method = req.method().to_string(),
                        request_id = Option::<&str>::None,
                        path = Option::<&str>::None,
                    );

                    if let Some(request_id) = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                    {
                        span.record("request_id", request_id);
                    }

                    if let Some(path) = req.extensions().get::<MatchedPath>() {
                        span.record("path", path.as_str())
                    } else {
                        span.record("path", req.uri().path())
                    };

                    span
                }),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let (r, mut a) = routes()
        .layer(middleware)
        .with_state(context)
        .split_for_parts();

    apply_default_errors(&mut a);
    (r, a)
}

/// The OpenAPI document on its own, without a backing store.
pub fn openapi() -> OpenApi {
    let (_, mut a) = routes().split_for_parts();

    apply_default_errors(&mut a);
    a
}

fn routes() -> OpenApiRouter<ApiContext> {
    let openapi = OpenApi::builder()
        .info(
            Info::builder()
                .title("certwatch API Reference")
                .version(env!("CARGO_PKG_VERSION"))
                .license(Some(
                    License::builder()
                        .name("Apache 2.0 License")
                        .identifier(Some(env!("CARGO_PKG_LICENSE")))
                        .build(),
                )),
        )
        .build();

    OpenApiRouter::with_openapi(openapi)
        .routes(routes!(handlers::health_check))
        .routes(routes!(
            handlers::certificates::list_certificates,
            handlers::certificates::create_certificate
        ))
        .routes(routes!(
            handlers::certificates::get_certificate,
            handlers::certificates::delete_certificate
        ))
}

fn apply_default_errors(api: &mut OpenApi) {
    api.paths.paths.iter_mut().for_each(|(_path, item)| {
        for op in [
            &mut item.get,
            &mut item.post,
            &mut item.put,
            &mut item.patch,
            &mut item.delete,
        ] {
            insert_internal_error(op);
        }
    });
}

fn insert_internal_error(item: &mut Option<Operation>) {
    if let Some(item) = item {
        item.responses.responses.insert(
            "500".into(),
            RefOr::Ref(
                utoipa::openapi::Ref::builder()
                    .summary("Internal server error")
                    .ref_location_from_schema_name(ApiErrorResponse::name())
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let api = openapi();
        let paths: Vec<_> = api.paths.paths.keys().cloned().collect();

        assert!(paths.contains(&"/health".to_string()));
        assert!(paths.contains(&"/certificates".to_string()));
        assert!(paths.contains(&"/certificates/{id}".to_string()));

        let item = &api.paths.paths["/certificates/{id}"];
        assert!(item.get.is_some());
        assert!(item.delete.is_some());
        assert!(
            item.delete
                .as_ref()
                .is_some_and(|op| op.responses.responses.contains_key("500"))
        );
    }
}
