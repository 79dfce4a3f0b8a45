//! walletdesk 主入口
//! 托管钱包充值地址服务

use std::sync::Arc;

use anyhow::{Context, Result};
use walletdesk::{
    api,
    app_state::AppState,
    config::Config,
    infrastructure::{cache::RedisCtx, db, logging},
    service::custody::FireblocksClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量与配置（CONFIG_PATH 指向的 TOML 优先）
    dotenvy::dotenv().ok();
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    // 2. 初始化日志；guard 持有到进程退出
    let _log_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!("🚀 Starting walletdesk custodial deposit address service");

    // 3. 连接数据库并迁移
    let pool = db::init_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("✅ Database connected");

    if config.server.skip_migrations {
        tracing::info!("⏭️ Database migrations skipped (SKIP_MIGRATIONS=1)");
    } else {
        db::run_migrations(&pool).await?;
    }

    // 4. Redis（可选，仅缓存支持资产列表）
    let redis = match &config.redis.url {
        Some(url) => match RedisCtx::new(url) {
            Ok(ctx) => match ctx.ping().await {
                Ok(_) => {
                    tracing::info!("✅ Redis connected");
                    Some(ctx)
                }
                Err(e) => {
                    tracing::warn!("⚠️ Redis unreachable, running without cache: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("⚠️ Invalid REDIS_URL, running without cache: {}", e);
                None
            }
        },
        None => None,
    };

    // 5. 托管方客户端
    let custody = Arc::new(FireblocksClient::new(&config.custody)?);
    tracing::info!(base_url = %config.custody.base_url, "✅ Custody client initialized");

    // 6. 应用状态与路由
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone(), pool, redis, custody));
    let app = api::routes(state);

    // 7. 启动服务器
    let bind_addr = config.server.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("🎉 Server listening on http://{}", bind_addr);
    tracing::info!("📖 Swagger UI: http://{}/docs", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
