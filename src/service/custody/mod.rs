//! 托管方（Fireblocks 风格）API 抽象
//!
//! 服务层只依赖 [`CustodyApi`]，HTTP 实现在 `fireblocks_client`，
//! 测试中可替换为脚本化的假实现。

pub mod fireblocks_client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fireblocks_client::FireblocksClient;

/// 托管方错误码：资产已存在于该 Vault
pub const ASSET_ALREADY_EXISTS: i64 = 1026;

#[derive(Error, Debug)]
pub enum CustodyError {
    /// 托管方返回非 2xx
    #[error("custody API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("custody transport error: {0}")]
    Transport(String),
    #[error("failed to decode custody response: {0}")]
    Decode(String),
    #[error("failed to sign custody request: {0}")]
    Signing(String),
}

impl CustodyError {
    pub fn is_asset_already_exists(&self) -> bool {
        matches!(self, Self::Api { code: Some(code), .. } if *code == ASSET_ALREADY_EXISTS)
    }

    /// 托管方针对请求本身的拒绝（4xx）
    ///
    /// 认证失败（401/403）、限流（429）与 5xx 属于上游故障，不算拒绝
    pub fn is_asset_rejection(&self) -> bool {
        match self {
            Self::Api { status, .. } => {
                (400..500).contains(status) && !matches!(status, 401 | 403 | 429)
            }
            _ => false,
        }
    }
}

/// 创建 Vault 账户请求体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVaultAccount {
    pub name: String,
    #[serde(rename = "hiddenOnUI")]
    pub hidden_on_ui: bool,
    pub auto_fuel: bool,
    pub customer_ref_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// 充值地址
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub legacy_address: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

/// 分页地址列表（只使用第一页）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressPage {
    #[serde(default)]
    pub addresses: Vec<DepositAddress>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedAsset {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub native_asset: Option<String>,
}

#[async_trait]
pub trait CustodyApi: Send + Sync {
    /// POST /v1/vault/accounts
    async fn create_vault_account(
        &self,
        req: &CreateVaultAccount,
    ) -> Result<VaultAccount, CustodyError>;

    /// POST /v1/vault/accounts/{vaultId}/{assetId}
    async fn create_vault_asset(
        &self,
        vault_id: &str,
        asset_id: &str,
    ) -> Result<DepositAddress, CustodyError>;

    /// GET /v1/vault/accounts/{vaultId}/{assetId}/addresses_paginated
    async fn list_deposit_addresses(
        &self,
        vault_id: &str,
        asset_id: &str,
    ) -> Result<AddressPage, CustodyError>;

    /// POST /v1/vault/accounts/{vaultId}/{assetId}/addresses
    async fn create_deposit_address(
        &self,
        vault_id: &str,
        asset_id: &str,
    ) -> Result<DepositAddress, CustodyError>;

    /// GET /v1/supported_assets
    async fn supported_assets(&self) -> Result<Vec<SupportedAsset>, CustodyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_already_exists_detection() {
        let err = CustodyError::Api {
            status: 400,
            code: Some(ASSET_ALREADY_EXISTS),
            message: "Asset already exists".into(),
        };
        assert!(err.is_asset_already_exists());
        assert!(err.is_asset_rejection());

        let other = CustodyError::Api {
            status: 400,
            code: Some(1006),
            message: "Invalid asset".into(),
        };
        assert!(!other.is_asset_already_exists());
        assert!(!CustodyError::Transport("timeout".into()).is_asset_rejection());
    }

    #[test]
    fn test_upstream_failures_are_not_asset_rejections() {
        for status in [401, 403, 429, 500, 502, 503] {
            let err = CustodyError::Api {
                status,
                code: None,
                message: "upstream".into(),
            };
            assert!(!err.is_asset_rejection(), "status {}", status);
        }
        let err = CustodyError::Api {
            status: 404,
            code: None,
            message: "Asset not found".into(),
        };
        assert!(err.is_asset_rejection());
    }

    #[test]
    fn test_create_vault_account_wire_format() {
        let body = serde_json::to_value(CreateVaultAccount {
            name: "u1@example.com".into(),
            hidden_on_ui: false,
            auto_fuel: false,
            customer_ref_id: "u1".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "u1@example.com",
                "hiddenOnUI": false,
                "autoFuel": false,
                "customerRefId": "u1"
            })
        );
    }

    #[test]
    fn test_address_page_tolerates_missing_fields() {
        let page: AddressPage = serde_json::from_str(
            r#"{"addresses":[{"address":"tb1qxyz","legacyAddress":"","type":"Permanent"}]}"#,
        )
        .unwrap();
        assert_eq!(page.addresses.len(), 1);
        assert_eq!(page.addresses[0].address, "tb1qxyz");
        assert!(page.paging.is_none());
    }
}
