use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    api::response::{success_response, ApiResponse},
    app_state::AppState,
    error::AppError,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct Healthz {
    pub status: String,
    /// 未配置数据库时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_ok: Option<bool>,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, description = "OK", body = Healthz))
)]
pub async fn healthz(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Healthz>>, AppError> {
    let db_ok = match &st.pool {
        Some(pool) => Some(crate::infrastructure::db::health_check(pool).await.is_ok()),
        None => None,
    };
    // Redis 只做缓存，失败不影响整体状态
    let redis_ok = match &st.redis {
        Some(redis) => Some(redis.ping().await.is_ok()),
        None => None,
    };
    let status = if db_ok.unwrap_or(true) { "ok" } else { "degraded" };
    let version = format!(
        "{}+{}",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("dev")
    );

    success_response(Healthz {
        status: status.into(),
        db_ok,
        redis_ok,
        version,
    })
}
