//! 充值地址申请 API
//!
//! 挂载于 /api/v1/wallet-requests，全部需要 Bearer Token。

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    api::{
        middleware::{require_admin, require_self_or_admin, AuthInfoExtractor},
        response::{created_response, success_response, success_response_with_message, ApiResponse},
    },
    app_state::AppState,
    domain::{ResolveMode, WalletRequestStatus},
    error::AppError,
    metrics,
    repository::{WalletAddressRequest, WalletRequestView},
    service::export_service::ExportSummary,
};

const DEFAULT_ADMIN_PAGE: i64 = 100;
const MAX_ADMIN_PAGE: i64 = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct WalletRequestBody {
    /// 托管方资产ID，如 BTC_TEST
    pub coin: String,
    /// 代他人申请时填写（仅管理员）
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateBody {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AddressQuery {
    pub coin: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_wallet_request))
        .route("/new", post(create_new_wallet_request))
        .route("/supported-assets", get(supported_assets))
        .route("/list/:user_id", get(list_user_requests))
        .route("/admin-list", get(admin_list))
        .route("/address", get(fetch_wallet_address))
        .route("/export/:user_id", get(export_user_requests))
        .route("/:id/status", patch(update_status))
        .route("/:id/history", get(request_history))
}

/// 按端点计数
fn observe<T>(endpoint: &'static str, res: Result<T, AppError>) -> Result<T, AppError> {
    match &res {
        Ok(_) => metrics::count_ok(endpoint),
        Err(e) => {
            metrics::count_err(endpoint);
            if e.status.is_server_error() {
                tracing::error!(endpoint, error = %e, "request failed");
            }
        }
    }
    res
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::validation_failed(e.body_text()))
}

fn parse_path<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    path.map(|Path(value)| value)
        .map_err(|e| AppError::validation_failed(e.body_text()))
}

fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(value)| value)
        .map_err(|e| AppError::validation_failed(e.body_text()))
}

async fn request_address(
    st: &AppState,
    auth: AuthInfoExtractor,
    payload: Result<Json<WalletRequestBody>, JsonRejection>,
    mode: ResolveMode,
) -> Result<WalletAddressRequest, AppError> {
    let body = parse_body(payload)?;
    let target = body.user_id.unwrap_or(auth.0.user_id);
    require_self_or_admin(&auth.0, target)?;
    st.wallet_requests
        .request_address(target, &body.coin, mode)
        .await
}

#[utoipa::path(
    post,
    path = "/api/v1/wallet-requests",
    request_body = WalletRequestBody,
    responses(
        (status = 201, description = "Address resolved and stored", body = WalletAddressRequest),
        (status = 400, description = "Invalid coin", body = crate::error_body::ErrorBodyDoc),
        (status = 404, description = "User not found", body = crate::error_body::ErrorBodyDoc),
        (status = 422, description = "Asset unavailable", body = crate::error_body::ErrorBodyDoc),
        (status = 502, description = "Custody API failure", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn create_wallet_request(
    State(st): State<Arc<AppState>>,
    auth: AuthInfoExtractor,
    payload: Result<Json<WalletRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<WalletAddressRequest>>), AppError> {
    let record = observe(
        "wallet_requests.create",
        request_address(&st, auth, payload, ResolveMode::ReuseExisting).await,
    )?;
    created_response(record, "Wallet address request created")
}

#[utoipa::path(
    post,
    path = "/api/v1/wallet-requests/new",
    request_body = WalletRequestBody,
    responses(
        (status = 201, description = "New address generated and stored", body = WalletAddressRequest),
        (status = 422, description = "Asset unavailable", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn create_new_wallet_request(
    State(st): State<Arc<AppState>>,
    auth: AuthInfoExtractor,
    payload: Result<Json<WalletRequestBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<WalletAddressRequest>>), AppError> {
    let record = observe(
        "wallet_requests.new",
        request_address(&st, auth, payload, ResolveMode::ForceNew).await,
    )?;
    created_response(record, "New wallet address generated")
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet-requests/supported-assets",
    responses((status = 200, description = "Custody asset ids", body = [String]))
)]
pub async fn supported_assets(
    State(st): State<Arc<AppState>>,
    _auth: AuthInfoExtractor,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let ids = observe(
        "wallet_requests.supported_assets",
        st.wallet_requests.supported_assets().await,
    )?;
    success_response(ids)
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet-requests/list/{user_id}",
    params(("user_id" = Uuid, Path, description = "Owner user id")),
    responses(
        (status = 200, description = "User's requests", body = [WalletRequestView]),
        (status = 403, description = "Not the owner", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn list_user_requests(
    State(st): State<Arc<AppState>>,
    AuthInfoExtractor(auth): AuthInfoExtractor,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<WalletRequestView>>>, AppError> {
    let user_id = parse_path(user_id)?;
    require_self_or_admin(&auth, user_id)?;
    let rows = observe(
        "wallet_requests.list",
        st.wallet_requests.list_for_user(user_id).await,
    )?;
    success_response(rows)
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet-requests/admin-list",
    params(AdminListQuery),
    responses(
        (status = 200, description = "All requests", body = [WalletRequestView]),
        (status = 403, description = "Admin only", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn admin_list(
    State(st): State<Arc<AppState>>,
    AuthInfoExtractor(auth): AuthInfoExtractor,
    query: Result<Query<AdminListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<WalletRequestView>>>, AppError> {
    require_admin(&auth)?;
    let q = parse_query(query)?;
    let limit = q.limit.unwrap_or(DEFAULT_ADMIN_PAGE).clamp(1, MAX_ADMIN_PAGE);
    let offset = q.offset.unwrap_or(0).max(0);
    let rows = observe(
        "wallet_requests.admin_list",
        st.wallet_requests.admin_list(limit, offset).await,
    )?;
    success_response(rows)
}

#[utoipa::path(
    patch,
    path = "/api/v1/wallet-requests/{id}/status",
    params(("id" = Uuid, Path, description = "Wallet request id")),
    request_body = StatusUpdateBody,
    responses(
        (status = 200, description = "Status updated", body = WalletAddressRequest),
        (status = 403, description = "Admin only", body = crate::error_body::ErrorBodyDoc),
        (status = 404, description = "Request not found", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn update_status(
    State(st): State<Arc<AppState>>,
    AuthInfoExtractor(auth): AuthInfoExtractor,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StatusUpdateBody>, JsonRejection>,
) -> Result<Json<ApiResponse<WalletAddressRequest>>, AppError> {
    require_admin(&auth)?;
    let id = parse_path(id)?;
    let body = parse_body(payload)?;
    if body.status.trim().is_empty() {
        return Err(AppError::validation_failed("status is required"));
    }

    let status = WalletRequestStatus::parse(&body.status);
    let record = observe(
        "wallet_requests.update_status",
        st.wallet_requests
            .update_status(id, status, body.comment)
            .await,
    )?;
    tracing::info!(admin_id = %auth.user_id, request_id = %id, "admin override applied");
    success_response_with_message(record, "Wallet request status updated")
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet-requests/address",
    params(AddressQuery),
    responses(
        (status = 200, description = "Stored or freshly resolved address", body = WalletAddressRequest),
        (status = 422, description = "Asset unavailable", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn fetch_wallet_address(
    State(st): State<Arc<AppState>>,
    AuthInfoExtractor(auth): AuthInfoExtractor,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<WalletAddressRequest>>, AppError> {
    let q = parse_query(query)?;
    let target = q.user_id.unwrap_or(auth.user_id);
    require_self_or_admin(&auth, target)?;
    let record = observe(
        "wallet_requests.address",
        st.wallet_requests.fetch_wallet_address(target, &q.coin).await,
    )?;
    success_response(record)
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet-requests/{id}/history",
    params(("id" = Uuid, Path, description = "Wallet request id")),
    responses(
        (status = 200, description = "History entries (JSON array)"),
        (status = 404, description = "Request not found", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn request_history(
    State(st): State<Arc<AppState>>,
    AuthInfoExtractor(auth): AuthInfoExtractor,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let id = parse_path(id)?;
    let record = st.wallet_requests.find(id).await?;
    require_self_or_admin(&auth, record.user_id)?;
    metrics::count_ok("wallet_requests.history");
    success_response(record.history)
}

#[utoipa::path(
    get,
    path = "/api/v1/wallet-requests/export/{user_id}",
    params(("user_id" = Uuid, Path, description = "Owner user id")),
    responses(
        (status = 200, description = "Spreadsheet written", body = ExportSummary),
        (status = 403, description = "Not the owner", body = crate::error_body::ErrorBodyDoc)
    )
)]
pub async fn export_user_requests(
    State(st): State<Arc<AppState>>,
    AuthInfoExtractor(auth): AuthInfoExtractor,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<ExportSummary>>, AppError> {
    let user_id = parse_path(user_id)?;
    require_self_or_admin(&auth, user_id)?;
    let summary = observe(
        "wallet_requests.export",
        st.wallet_requests.export_for_user(user_id).await,
    )?;
    success_response_with_message(summary, "Export written")
}
