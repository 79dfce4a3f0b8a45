//! 充值地址申请服务
//!
//! 串联 用户查询 → Vault 开立 → 地址解析 → 持久化；
//! 同时提供查询、管理员状态覆盖与导出。

use std::{path::PathBuf, sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    domain::{display_symbol, normalize_asset_id, ResolveMode, WalletRequestStatus},
    error::AppError,
    infrastructure::cache::RedisCtx,
    metrics,
    repository::{
        StatusUpdateParams, UpsertAddressParams, User, UserRepository, WalletAddressRequest,
        WalletRequestRepository, WalletRequestView,
    },
    service::{
        address_resolver::AddressResolver,
        custody::CustodyApi,
        export_service::{self, ExportSummary},
        notification_service::{Notifier, UserNotification},
        vault_provisioner::VaultProvisioner,
    },
};

const SUPPORTED_ASSETS_CACHE_KEY: &str = "walletdesk:custody:supported_assets";

pub struct WalletRequestService {
    users: Arc<dyn UserRepository>,
    requests: Arc<dyn WalletRequestRepository>,
    custody: Arc<dyn CustodyApi>,
    notifier: Arc<dyn Notifier>,
    provisioner: VaultProvisioner,
    resolver: AddressResolver,
    cache: Option<Arc<RedisCtx>>,
    asset_cache_ttl: Duration,
    export_dir: PathBuf,
}

impl WalletRequestService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        requests: Arc<dyn WalletRequestRepository>,
        custody: Arc<dyn CustodyApi>,
        notifier: Arc<dyn Notifier>,
        cache: Option<Arc<RedisCtx>>,
        asset_cache_ttl: Duration,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            provisioner: VaultProvisioner::new(users.clone(), custody.clone()),
            resolver: AddressResolver::new(custody.clone()),
            users,
            requests,
            custody,
            notifier,
            cache,
            asset_cache_ttl,
            export_dir,
        }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::user_not_found(format!("User {} not found", user_id)))
    }

    /// 申请充值地址
    ///
    /// - `ReuseExisting`：add-wallet-request
    /// - `ForceNew`：new-wallet-request
    /// - `LookupFirst`：fetch 路径上没有记录时
    pub async fn request_address(
        &self,
        user_id: Uuid,
        raw_coin: &str,
        mode: ResolveMode,
    ) -> Result<WalletAddressRequest, AppError> {
        let asset_id = normalize_asset_id(raw_coin)
            .ok_or_else(|| AppError::validation_failed("coin must be a non-empty asset id"))?;

        let user = self.load_user(user_id).await?;
        let had_vault = user.vault_id().is_some();
        let vault_id = self.provisioner.ensure_vault_account(&user).await?;

        let resolved = match self.resolver.resolve(&vault_id, &asset_id, mode).await {
            Ok(resolved) => resolved,
            Err(e) => {
                if !had_vault {
                    // 不回滚托管方的 Vault，留给对账
                    tracing::warn!(
                        user_id = %user_id,
                        vault_account_id = %vault_id,
                        asset_id = %asset_id,
                        error = %e,
                        "vault provisioned but address resolution failed"
                    );
                }
                return Err(e.into());
            }
        };

        let record = self
            .requests
            .upsert_address(UpsertAddressParams {
                user_id,
                coin: display_symbol(&asset_id),
                asset_id,
                wallet_address: resolved.address,
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            request_id = %record.id,
            coin = %record.coin,
            mode = mode.as_str(),
            "✅ wallet address stored"
        );
        Ok(record)
    }

    /// 查询 (用户, 币种) 的地址；没有记录时解析并保存
    pub async fn fetch_wallet_address(
        &self,
        user_id: Uuid,
        raw_coin: &str,
    ) -> Result<WalletAddressRequest, AppError> {
        let asset_id = normalize_asset_id(raw_coin)
            .ok_or_else(|| AppError::validation_failed("coin must be a non-empty asset id"))?;

        if let Some(existing) = self
            .requests
            .find_by_user_and_coin(user_id, &display_symbol(&asset_id))
            .await?
        {
            return Ok(existing);
        }

        self.request_address(user_id, &asset_id, ResolveMode::LookupFirst)
            .await
    }

    /// 托管方支持的资产ID列表（Redis 缓存，缓存故障时直连托管方）
    pub async fn supported_assets(&self) -> Result<Vec<String>, AppError> {
        if let Some(cache) = &self.cache {
            match cache.get_json::<Vec<String>>(SUPPORTED_ASSETS_CACHE_KEY).await {
                Ok(Some(ids)) => {
                    metrics::inc_asset_cache(true);
                    return Ok(ids);
                }
                Ok(None) => metrics::inc_asset_cache(false),
                Err(e) => {
                    metrics::inc_asset_cache(false);
                    tracing::warn!(error = %e, "supported asset cache unavailable");
                }
            }
        }

        let ids: Vec<String> = self
            .custody
            .supported_assets()
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect();

        if let Some(cache) = &self.cache {
            if let Err(e) = cache
                .set_json(SUPPORTED_ASSETS_CACHE_KEY, &ids, self.asset_cache_ttl)
                .await
            {
                tracing::warn!(error = %e, "failed to cache supported assets");
            }
        }

        Ok(ids)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<WalletRequestView>, AppError> {
        self.load_user(user_id).await?;
        Ok(self.requests.list_by_user(user_id).await?)
    }

    pub async fn admin_list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WalletRequestView>, AppError> {
        Ok(self.requests.list_all(limit, offset).await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<WalletAddressRequest, AppError> {
        self.requests.find_by_id(id).await?.ok_or_else(|| {
            AppError::wallet_request_not_found(format!("Wallet request {} not found", id))
        })
    }

    /// 管理员状态覆盖
    ///
    /// `completed` 时确保 Vault 并重新解析地址，状态/备注/地址一次写入，history 清空；
    /// 之后通知申请用户，通知失败只记录日志。
    pub async fn update_status(
        &self,
        id: Uuid,
        status: WalletRequestStatus,
        comment: Option<String>,
    ) -> Result<WalletAddressRequest, AppError> {
        let record = self.find(id).await?;

        let wallet_address = if status.is_completed() {
            let owner = self.load_user(record.user_id).await?;
            let vault_id = self.provisioner.ensure_vault_account(&owner).await?;
            let asset_id = if record.asset_id.is_empty() {
                record.coin.clone()
            } else {
                record.asset_id.clone()
            };
            let resolved = self
                .resolver
                .resolve(&vault_id, &asset_id, ResolveMode::ReuseExisting)
                .await?;
            Some(resolved.address)
        } else {
            None
        };

        let updated = self
            .requests
            .update_status(StatusUpdateParams {
                id,
                status: status.clone(),
                comment: comment.clone(),
                wallet_address,
            })
            .await?
            .ok_or_else(|| {
                AppError::wallet_request_not_found(format!("Wallet request {} not found", id))
            })?;

        tracing::info!(request_id = %id, status = %status, "wallet request status updated");

        let notification = UserNotification::wallet_request_updated(
            updated.user_id,
            &updated.coin,
            updated.status.as_str(),
            comment.as_deref(),
        );
        if let Err(e) = self.notifier.notify_user(notification).await {
            tracing::warn!(
                request_id = %id,
                user_id = %updated.user_id,
                error = %e,
                "failed to notify user about status change"
            );
        }

        Ok(updated)
    }

    pub async fn export_for_user(&self, user_id: Uuid) -> Result<ExportSummary, AppError> {
        let rows = self.list_for_user(user_id).await?;
        Ok(export_service::export_user_requests(&self.export_dir, user_id, rows).await?)
    }
}
