//! JWT Token 验证模块
//!
//! Token 由认证子系统签发（HS256），这里只做验证；
//! `generate_token` 供测试和本地联调使用。

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user ID)
    pub role: String, // "admin" / "user"
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
    #[serde(default)]
    pub jti: String, // JWT ID
}

impl Claims {
    pub fn new(user_id: Uuid, role: impl Into<String>, expires_in_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            role: role.into(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// 获取用户 ID（UUID）
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("Invalid user ID in claims: {}", e))
    }
}

/// 生成JWT Token（指定过期时间）
pub fn generate_token(
    user_id: Uuid,
    role: impl Into<String>,
    secret: &str,
    expires_in_secs: i64,
) -> Result<String> {
    let claims = Claims::new(user_id, role, expires_in_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("Failed to encode token: {}", e))
}

/// 验证JWT Token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    tracing::debug!("JWT: starting verification, token_len={}", token.len());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 10; // 允许10秒时钟偏差

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!("JWT: token verification failed: {}", e);
        anyhow!("Token verification failed: {}", e)
    })?
    .claims;

    claims.user_id()?;

    Ok(claims)
}
