// 用户数据访问 Repository
// 用户由认证子系统维护，这里只读取资料并在首次开立 Vault 时写入 vault_account_id

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

// ============ 领域模型 ============

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub vault_account_id: Option<String>, // 托管方分配，只写一次
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    /// 已绑定的 Vault ID（空字符串视为未绑定）
    pub fn vault_id(&self) -> Option<&str> {
        self.vault_account_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// 列表接口联表返回的用户资料
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

// ============ Repository Trait ============

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 根据 ID 查询用户
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// 绑定 Vault ID
    ///
    /// 只在尚未绑定时写入；返回最终生效的 Vault ID
    /// （并发请求已先写入时返回已有值）
    async fn attach_vault_account(&self, user_id: Uuid, vault_account_id: &str) -> Result<String>;
}

// ============ PostgreSQL 实现 ============

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, first_name, last_name, role, vault_account_id,
                    created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn attach_vault_account(&self, user_id: Uuid, vault_account_id: &str) -> Result<String> {
        let updated: Option<String> = sqlx::query_scalar(
            "UPDATE users
             SET vault_account_id = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND (vault_account_id IS NULL OR vault_account_id = '')
             RETURNING vault_account_id",
        )
        .bind(user_id)
        .bind(vault_account_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = updated {
            return Ok(id);
        }

        // 已被其他请求绑定，返回已有值
        let existing: Option<Option<String>> =
            sqlx::query_scalar("SELECT vault_account_id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        existing
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("user {} not found", user_id))
    }
}
