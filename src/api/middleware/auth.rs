//! 认证中间件
//! 验证 Bearer Token（由认证子系统签发）

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{app_state::AppState, error::AppError, infrastructure::jwt};

/// 认证信息（从Token中提取）
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub user_id: Uuid,
    pub role: String,
}

/// 认证中间件
///
/// 1. 提取 Authorization 头并校验 Bearer 格式
/// 2. 验证 JWT 签名与过期时间
/// 3. 将 AuthInfo 与 Claims 注入请求扩展
pub async fn auth_middleware(
    State(st): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // CORS 预检请求直接放行
    if req.method() == axum::http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Authorization header required"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

    let claims = jwt::verify_token(token, &st.config.jwt.secret)
        .map_err(|e| AppError::unauthorized(format!("Invalid token: {}", e)))?;

    let auth_info = AuthInfo {
        user_id: claims
            .user_id()
            .map_err(|_| AppError::unauthorized("Invalid user_id in token"))?,
        role: claims.role.clone(),
    };

    req.extensions_mut().insert(auth_info);
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// 认证信息提取器（用于handler函数）
#[derive(Clone)]
pub struct AuthInfoExtractor(pub AuthInfo);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthInfoExtractor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_info = parts
            .extensions
            .get::<AuthInfo>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;
        Ok(AuthInfoExtractor(auth_info))
    }
}
