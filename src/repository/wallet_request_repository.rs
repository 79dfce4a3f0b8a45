// 充值地址申请 Repository
//
// (user_id, coin) 上有唯一约束，写入使用 INSERT ... ON CONFLICT 一次完成，
// 并发请求不会产生重复记录。

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{domain::WalletRequestStatus, repository::user_repository::UserProfile};

/// 新记录的币数量（7位小数）
pub fn initial_no_of_coins() -> Decimal {
    Decimal::new(0, 7)
}

// ============ 领域模型 ============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletAddressRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 展示币种（如 BTC）
    pub coin: String,
    /// 托管方资产ID（如 BTC_TEST）
    pub asset_id: String,
    pub wallet_address: String,
    #[schema(value_type = String, example = "completed")]
    pub status: WalletRequestStatus,
    #[schema(value_type = String, example = "0.0000000")]
    pub no_of_coins: Decimal,
    pub comment: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 列表视图：申请记录 + 用户资料
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletRequestView {
    #[serde(flatten)]
    pub request: WalletAddressRequest,
    pub user: UserProfile,
}

/// 地址写入参数
#[derive(Debug, Clone)]
pub struct UpsertAddressParams {
    pub user_id: Uuid,
    pub coin: String,
    pub asset_id: String,
    pub wallet_address: String,
}

/// 管理员状态覆盖参数
#[derive(Debug, Clone)]
pub struct StatusUpdateParams {
    pub id: Uuid,
    pub status: WalletRequestStatus,
    pub comment: Option<String>,
    /// None 表示保留原地址
    pub wallet_address: Option<String>,
}

#[derive(sqlx::FromRow)]
struct WalletRequestRow {
    id: Uuid,
    user_id: Uuid,
    coin: String,
    asset_id: String,
    wallet_address: String,
    status: String,
    no_of_coins: Decimal,
    comment: Option<String>,
    history: Json<Vec<serde_json::Value>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<WalletRequestRow> for WalletAddressRequest {
    fn from(row: WalletRequestRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            coin: row.coin,
            asset_id: row.asset_id,
            wallet_address: row.wallet_address,
            status: WalletRequestStatus::parse(&row.status),
            no_of_coins: row.no_of_coins,
            comment: row.comment,
            history: row.history.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WalletRequestViewRow {
    #[sqlx(flatten)]
    request: WalletRequestRow,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl From<WalletRequestViewRow> for WalletRequestView {
    fn from(row: WalletRequestViewRow) -> Self {
        let request = WalletAddressRequest::from(row.request);
        let user = UserProfile {
            id: request.user_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
        };
        Self { request, user }
    }
}

// ============ Repository Trait ============

#[async_trait]
pub trait WalletRequestRepository: Send + Sync {
    /// 按 (user_id, coin) 写入地址：不存在则创建（status=completed, no_of_coins=0），
    /// 存在则只更新地址
    async fn upsert_address(&self, params: UpsertAddressParams) -> Result<WalletAddressRequest>;

    /// 根据 ID 查询
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WalletAddressRequest>>;

    /// 根据 (user_id, coin) 查询
    async fn find_by_user_and_coin(
        &self,
        user_id: Uuid,
        coin: &str,
    ) -> Result<Option<WalletAddressRequest>>;

    /// 列出用户的申请（联表用户资料）
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WalletRequestView>>;

    /// 列出全部申请（管理员）
    async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<WalletRequestView>>;

    /// 管理员更新状态/备注/地址，并清空 history
    async fn update_status(
        &self,
        params: StatusUpdateParams,
    ) -> Result<Option<WalletAddressRequest>>;
}

// ============ PostgreSQL 实现 ============

const SELECT_COLUMNS: &str = "w.id, w.user_id, w.coin, w.asset_id, w.wallet_address, w.status,
     w.no_of_coins, w.comment, w.history, w.created_at, w.updated_at";

pub struct PgWalletRequestRepository {
    pool: PgPool,
}

impl PgWalletRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletRequestRepository for PgWalletRequestRepository {
    async fn upsert_address(&self, params: UpsertAddressParams) -> Result<WalletAddressRequest> {
        let row = sqlx::query_as::<_, WalletRequestRow>(
            "INSERT INTO wallet_address_requests AS w
                 (id, user_id, coin, asset_id, wallet_address, status, no_of_coins, history)
             VALUES ($1, $2, $3, $4, $5, $6, $7, '[]'::JSONB)
             ON CONFLICT (user_id, coin) DO UPDATE
                 SET wallet_address = EXCLUDED.wallet_address,
                     asset_id = EXCLUDED.asset_id,
                     updated_at = CURRENT_TIMESTAMP
             RETURNING id, user_id, coin, asset_id, wallet_address, status,
                       no_of_coins, comment, history, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(&params.coin)
        .bind(&params.asset_id)
        .bind(&params.wallet_address)
        .bind(WalletRequestStatus::COMPLETED)
        .bind(initial_no_of_coins())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WalletAddressRequest>> {
        let sql = format!(
            "SELECT {} FROM wallet_address_requests w WHERE w.id = $1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, WalletRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_user_and_coin(
        &self,
        user_id: Uuid,
        coin: &str,
    ) -> Result<Option<WalletAddressRequest>> {
        let sql = format!(
            "SELECT {} FROM wallet_address_requests w WHERE w.user_id = $1 AND w.coin = $2",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, WalletRequestRow>(&sql)
            .bind(user_id)
            .bind(coin)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WalletRequestView>> {
        let sql = format!(
            "SELECT {}, u.email, u.first_name, u.last_name
             FROM wallet_address_requests w
             JOIN users u ON u.id = w.user_id
             WHERE w.user_id = $1
             ORDER BY w.created_at DESC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, WalletRequestViewRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<WalletRequestView>> {
        let sql = format!(
            "SELECT {}, u.email, u.first_name, u.last_name
             FROM wallet_address_requests w
             JOIN users u ON u.id = w.user_id
             ORDER BY w.created_at DESC
             LIMIT $1 OFFSET $2",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, WalletRequestViewRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_status(
        &self,
        params: StatusUpdateParams,
    ) -> Result<Option<WalletAddressRequest>> {
        let row = sqlx::query_as::<_, WalletRequestRow>(
            "UPDATE wallet_address_requests AS w
             SET status = $2,
                 comment = $3,
                 wallet_address = COALESCE($4, w.wallet_address),
                 history = '[]'::JSONB,
                 updated_at = CURRENT_TIMESTAMP
             WHERE w.id = $1
             RETURNING id, user_id, coin, asset_id, wallet_address, status,
                       no_of_coins, comment, history, created_at, updated_at",
        )
        .bind(params.id)
        .bind(params.status.as_str())
        .bind(&params.comment)
        .bind(&params.wallet_address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
