//! 充值地址解析
//!
//! 三种模式共用一条流程，只区别于首个托管调用以及是否容忍“资产已存在”：
//!
//! | 模式 | 首个调用 | 回退 |
//! |---|---|---|
//! | `ReuseExisting` | 创建 Vault 资产 | 资产已存在 → 查询已有地址 |
//! | `ForceNew` | 生成新地址 | 无 |
//! | `LookupFirst` | 分页查询已有地址 | 没有地址 → 生成新地址 |

use std::sync::Arc;

use thiserror::Error;

use crate::{
    domain::{strip_chain_prefix, ResolveMode},
    metrics,
    service::custody::{CustodyApi, CustodyError},
};

/// 托管方拒绝资产时返回给用户的原因
pub const ASSET_UNAVAILABLE_REASON: &str = "Asset is deprecated. Use a different asset.";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("asset {asset_id} unavailable: {reason}")]
    AssetUnavailable { asset_id: String, reason: String },
    #[error(transparent)]
    Custody(CustodyError),
}

impl ResolveError {
    fn unavailable(asset_id: &str) -> Self {
        Self::AssetUnavailable {
            asset_id: asset_id.to_string(),
            reason: ASSET_UNAVAILABLE_REASON.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub asset_id: String,
    /// 已去掉链前缀
    pub address: String,
}

#[derive(Clone)]
pub struct AddressResolver {
    custody: Arc<dyn CustodyApi>,
}

impl AddressResolver {
    pub fn new(custody: Arc<dyn CustodyApi>) -> Self {
        Self { custody }
    }

    pub async fn resolve(
        &self,
        vault_id: &str,
        asset_id: &str,
        mode: ResolveMode,
    ) -> Result<ResolvedAddress, ResolveError> {
        metrics::inc_resolve(mode);
        tracing::debug!(vault_id, asset_id, mode = mode.as_str(), "resolving deposit address");

        let raw = match mode {
            ResolveMode::ReuseExisting => {
                match self.custody.create_vault_asset(vault_id, asset_id).await {
                    Ok(created) => created.address,
                    Err(e) if e.is_asset_already_exists() => {
                        tracing::info!(vault_id, asset_id, "asset already on vault, reusing address");
                        metrics::inc_resolve_fallback();
                        self.lookup_or_create(vault_id, asset_id).await?
                    }
                    Err(e) => return Err(classify(asset_id, e)),
                }
            }
            ResolveMode::ForceNew => self
                .custody
                .create_deposit_address(vault_id, asset_id)
                .await
                .map_err(|e| classify(asset_id, e))?
                .address,
            ResolveMode::LookupFirst => self.lookup_or_create(vault_id, asset_id).await?,
        };

        let address = strip_chain_prefix(&raw);
        if address.is_empty() {
            tracing::warn!(vault_id, asset_id, "custodian returned an empty address");
            return Err(ResolveError::unavailable(asset_id));
        }

        Ok(ResolvedAddress {
            asset_id: asset_id.to_string(),
            address: address.to_string(),
        })
    }

    /// 第一页已有地址中的第一个；没有则生成新地址
    async fn lookup_or_create(&self, vault_id: &str, asset_id: &str) -> Result<String, ResolveError> {
        let page = self
            .custody
            .list_deposit_addresses(vault_id, asset_id)
            .await
            .map_err(|e| classify(asset_id, e))?;

        if let Some(found) = page
            .addresses
            .into_iter()
            .map(|a| a.address)
            .find(|a| !a.trim().is_empty())
        {
            return Ok(found);
        }

        let created = self
            .custody
            .create_deposit_address(vault_id, asset_id)
            .await
            .map_err(|e| classify(asset_id, e))?;
        Ok(created.address)
    }
}

/// 托管方拒绝该资产 → 资产不可用；认证、限流、5xx 与网络问题 → 上游错误
fn classify(asset_id: &str, err: CustodyError) -> ResolveError {
    if err.is_asset_rejection() {
        tracing::warn!(asset_id, error = %err, "custodian rejected asset");
        ResolveError::unavailable(asset_id)
    } else {
        ResolveError::Custody(err)
    }
}
