use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// 发给单个用户的站内通知
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotification {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: String,
    pub severity: String,
}

impl UserNotification {
    /// 管理员更新充值地址申请状态后的通知
    pub fn wallet_request_updated(
        user_id: Uuid,
        coin: &str,
        status: &str,
        comment: Option<&str>,
    ) -> Self {
        let mut body = format!("Your {} wallet address request is now {}.", coin, status);
        if let Some(comment) = comment.filter(|c| !c.trim().is_empty()) {
            body.push_str(&format!(" Note: {}", comment.trim()));
        }
        Self {
            user_id,
            title: "Wallet address request updated".to_string(),
            body,
            category: "wallet_request".to_string(),
            severity: "info".to_string(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// 返回通知ID
    async fn notify_user(&self, notification: UserNotification) -> Result<Uuid>;
}

pub struct PgNotifier {
    pool: PgPool,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify_user(&self, n: UserNotification) -> Result<Uuid> {
        let mut tx = self.pool.begin().await?;

        let rec = sqlx::query(
            r#"INSERT INTO notify.notifications (title, body, category, severity, scope, creator_role)
               VALUES ($1,$2,$3,$4,'user','admin') RETURNING id"#,
        )
        .bind(&n.title)
        .bind(&n.body)
        .bind(&n.category)
        .bind(&n.severity)
        .fetch_one(&mut *tx)
        .await?;
        let notif_id: Uuid = rec.get("id");

        sqlx::query(
            r#"INSERT INTO notify.deliveries (notification_id, user_id, channel, status)
                VALUES ($1,$2,'in_app','pending') ON CONFLICT DO NOTHING"#,
        )
        .bind(notif_id)
        .bind(n.user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(notif_id)
    }
}
