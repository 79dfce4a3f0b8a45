//! SQLx Postgres 连接池初始化、迁移与健康检查
//!
//! 用法：
//! let pool = init_pool(&config.database).await?;
//! run_migrations(&pool).await?;

use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::DatabaseConfig;

pub type PgPool = sqlx::Pool<sqlx::Postgres>;

/// 连接最大存活时间（秒），定期刷新
const MAX_LIFETIME_SECS: u64 = 1800;

fn pool_options(config: &DatabaseConfig) -> sqlx::postgres::PgPoolOptions {
    let max_conns = config.max_connections.max(1);
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_conns)
        .min_connections(config.min_connections.min(max_conns))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(MAX_LIFETIME_SECS))
        .test_before_acquire(true)
}

/// 初始化连接池并验证连接
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options(config)
        .connect(&config.url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to Postgres: {}", e);
            e
        })?;

    health_check(&pool).await?;

    Ok(pool)
}

/// 执行内嵌迁移（migrations/）
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("✅ Database migrations applied");
    Ok(())
}

/// 使用简单的SELECT CURRENT_TIMESTAMP查询验证连接和数据库响应
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    let _: (chrono::DateTime<chrono::Utc>,) = sqlx::query_as("SELECT CURRENT_TIMESTAMP")
        .fetch_one(pool)
        .await?;
    Ok(())
}
