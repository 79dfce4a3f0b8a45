use std::{sync::Arc, time::Instant};

use axum::{
    extract::Request,
    http::{
        header::{CACHE_CONTROL, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderValue,
    },
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::Level;
use utoipa::OpenApi;

use crate::{
    api::middleware::{auth_middleware, trace_id_middleware, TraceId},
    app_state::AppState,
};

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod wallet_request_api;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::healthz,
        wallet_request_api::create_wallet_request,
        wallet_request_api::create_new_wallet_request,
        wallet_request_api::supported_assets,
        wallet_request_api::list_user_requests,
        wallet_request_api::admin_list,
        wallet_request_api::update_status,
        wallet_request_api::fetch_wallet_address,
        wallet_request_api::request_history,
        wallet_request_api::export_user_requests
    ),
    components(
        schemas(
            handlers::Healthz,
            wallet_request_api::WalletRequestBody,
            wallet_request_api::StatusUpdateBody,
            crate::repository::WalletAddressRequest,
            crate::repository::WalletRequestView,
            crate::repository::UserProfile,
            crate::service::export_service::ExportSummary,
            crate::error_body::ErrorBodyDoc
        )
    ),
    tags(
        (name = "walletdesk", description = "Custodial deposit address API")
    )
)]
pub struct ApiDoc;

pub fn routes(state: Arc<AppState>) -> Router {
    // 公开路由（不需要认证）
    let public_routes = Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/health", get(handlers::healthz))
        .route(
            "/metrics",
            get(|| async { crate::metrics::render_prometheus().into_response() }),
        )
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    // 受保护路由（需要 Bearer Token）
    let protected_routes = Router::new()
        .nest("/api/v1/wallet-requests", wallet_request_api::routes())
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    public_routes
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(trace_id_middleware))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(from_fn(add_security_headers))
                .layer(from_fn(trace_log)),
        )
        .with_state(state)
}

async fn add_security_headers(req: Request, next: axum::middleware::Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    resp
}

async fn trace_log(req: Request, next: axum::middleware::Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_else(|| "-".to_string());
    let resp = next.run(req).await;
    let status = resp.status();
    let elapsed = start.elapsed().as_millis();
    tracing::event!(Level::INFO, trace_id=%trace_id, method=%method, path=%path, status=%status.as_u16(), elapsed_ms=%elapsed, "http_request");
    resp
}
