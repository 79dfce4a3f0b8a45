//! Fireblocks API客户端
//!
//! 每个请求携带 `X-API-Key` 与一个 RS256 签名的短期 JWT：
//! `uri`（路径+查询）、`nonce`、`iat`、`exp`（iat+55s）、`sub`（API Key）、
//! `bodyHash`（请求体 SHA-256 十六进制）。
//!
//! API文档: https://developers.fireblocks.com/reference/

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{header::CONTENT_TYPE, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    AddressPage, CreateVaultAccount, CustodyApi, CustodyError, DepositAddress, SupportedAsset,
    VaultAccount,
};
use crate::{config::CustodyConfig, metrics};

/// 签名 JWT 有效期（秒），托管方要求小于 60
const TOKEN_TTL_SECS: i64 = 55;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestClaims {
    pub uri: String,
    pub nonce: String,
    pub iat: i64,
    pub exp: i64,
    pub sub: String,
    pub body_hash: String,
}

/// 构造请求签名的 claims
///
/// 无请求体时按 SDK 约定对 JSON 空字符串 `""` 求哈希
pub(crate) fn request_claims(uri: &str, api_key: &str, body: Option<&str>, now: i64) -> RequestClaims {
    let hashed = body.unwrap_or("\"\"");
    RequestClaims {
        uri: uri.to_string(),
        nonce: uuid::Uuid::new_v4().to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
        sub: api_key.to_string(),
        body_hash: hex::encode(Sha256::digest(hashed.as_bytes())),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

/// 解析托管方错误响应 `{ "message": ..., "code": ... }`
pub(crate) fn parse_api_error(status: u16, text: &str) -> CustodyError {
    match serde_json::from_str::<ApiErrorBody>(text) {
        Ok(body) => CustodyError::Api {
            status,
            code: body.code,
            message: body.message.unwrap_or_else(|| text.to_string()),
        },
        Err(_) => CustodyError::Api {
            status,
            code: None,
            message: text.to_string(),
        },
    }
}

pub struct FireblocksClient {
    base_url: String,
    api_key: String,
    signing_key: EncodingKey,
    client: reqwest::Client,
}

impl FireblocksClient {
    /// 创建新的Fireblocks客户端
    pub fn new(config: &CustodyConfig) -> anyhow::Result<Self> {
        let pem = config.load_secret_key()?;
        let signing_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .context("Invalid Fireblocks RSA secret key")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            signing_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .context("Failed to create HTTP client")?,
        })
    }

    fn sign(&self, uri: &str, body: Option<&str>) -> Result<String, CustodyError> {
        let claims = request_claims(uri, &self.api_key, body, chrono::Utc::now().timestamp());
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| CustodyError::Signing(e.to_string()))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, CustodyError> {
        let body = body
            .map(|b| serde_json::to_string(&b))
            .transpose()
            .map_err(|e| CustodyError::Signing(e.to_string()))?;
        let token = self.sign(path, body.as_deref())?;

        tracing::info!("🌐 调用Fireblocks API: {} {}", method, path);

        let mut request = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, path))
            .header("X-API-Key", &self.api_key)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                metrics::observe_upstream_latency_ms(started.elapsed().as_millis(), false);
                tracing::error!("❌ Fireblocks请求失败 {} {}: {}", method, path, e);
                return Err(CustodyError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        metrics::observe_upstream_latency_ms(started.elapsed().as_millis(), status.is_success());

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                "❌ Fireblocks API错误 ({}) {} {}: {}",
                status,
                method,
                path,
                error_text
            );
            return Err(parse_api_error(status.as_u16(), &error_text));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CustodyError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CustodyApi for FireblocksClient {
    async fn create_vault_account(
        &self,
        req: &CreateVaultAccount,
    ) -> Result<VaultAccount, CustodyError> {
        let body = serde_json::to_value(req).map_err(|e| CustodyError::Signing(e.to_string()))?;
        let account: VaultAccount = self
            .send(Method::POST, "/v1/vault/accounts", Some(body))
            .await?;
        tracing::info!("✅ Fireblocks Vault已创建: id={}", account.id);
        Ok(account)
    }

    async fn create_vault_asset(
        &self,
        vault_id: &str,
        asset_id: &str,
    ) -> Result<DepositAddress, CustodyError> {
        let path = format!("/v1/vault/accounts/{}/{}", vault_id, asset_id);
        self.send(Method::POST, &path, Some(serde_json::json!({})))
            .await
    }

    async fn list_deposit_addresses(
        &self,
        vault_id: &str,
        asset_id: &str,
    ) -> Result<AddressPage, CustodyError> {
        let path = format!(
            "/v1/vault/accounts/{}/{}/addresses_paginated",
            vault_id, asset_id
        );
        self.send(Method::GET, &path, None).await
    }

    async fn create_deposit_address(
        &self,
        vault_id: &str,
        asset_id: &str,
    ) -> Result<DepositAddress, CustodyError> {
        let path = format!("/v1/vault/accounts/{}/{}/addresses", vault_id, asset_id);
        self.send(Method::POST, &path, Some(serde_json::json!({})))
            .await
    }

    async fn supported_assets(&self) -> Result<Vec<SupportedAsset>, CustodyError> {
        self.send(Method::GET, "/v1/supported_assets", None).await
    }
}
