//! Vault 开立
//!
//! 用户首次需要充值地址时在托管方创建 Vault 账户，ID 写回用户记录后复用。

use std::sync::Arc;

use thiserror::Error;

use crate::{
    metrics,
    repository::{User, UserRepository},
    service::custody::{CreateVaultAccount, CustodyApi, CustodyError},
};

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to create vault account: {0}")]
    Custody(#[from] CustodyError),
    #[error("custodian returned an empty vault account id")]
    MissingVaultId,
    #[error("failed to persist vault account id: {0}")]
    Store(anyhow::Error),
}

#[derive(Clone)]
pub struct VaultProvisioner {
    users: Arc<dyn UserRepository>,
    custody: Arc<dyn CustodyApi>,
}

impl VaultProvisioner {
    pub fn new(users: Arc<dyn UserRepository>, custody: Arc<dyn CustodyApi>) -> Self {
        Self { users, custody }
    }

    /// 返回用户的 Vault ID，没有则创建并持久化
    pub async fn ensure_vault_account(&self, user: &User) -> Result<String, ProvisionError> {
        if let Some(existing) = user.vault_id() {
            return Ok(existing.to_string());
        }

        let request = CreateVaultAccount {
            name: user.email.clone(),
            hidden_on_ui: false,
            auto_fuel: false,
            customer_ref_id: user.id.to_string(),
        };

        let account = self.custody.create_vault_account(&request).await?;
        let vault_id = account.id.trim().to_string();
        if vault_id.is_empty() {
            tracing::error!(user_id = %user.id, "❌ custodian returned vault account without id");
            return Err(ProvisionError::MissingVaultId);
        }
        metrics::inc_vault_created();

        let attached = self
            .users
            .attach_vault_account(user.id, &vault_id)
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %user.id,
                    vault_account_id = %vault_id,
                    error = %e,
                    "vault account created but not persisted, needs reconciliation"
                );
                metrics::inc_vault_orphaned();
                ProvisionError::Store(e)
            })?;

        if attached != vault_id {
            // 并发请求先写入了另一个 Vault
            tracing::warn!(
                user_id = %user.id,
                kept = %attached,
                orphaned = %vault_id,
                "vault account already attached, new vault left orphaned"
            );
            metrics::inc_vault_orphaned();
        } else {
            tracing::info!(user_id = %user.id, vault_account_id = %vault_id, "✅ vault account provisioned");
        }

        Ok(attached)
    }
}
