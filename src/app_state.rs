use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    config::Config,
    infrastructure::{cache::RedisCtx, db::PgPool},
    repository::{PgUserRepository, PgWalletRequestRepository, UserRepository, WalletRequestRepository},
    service::{
        custody::CustodyApi,
        notification_service::{Notifier, PgNotifier},
        WalletRequestService,
    },
};

/// 应用状态
/// 包含所有共享资源
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// 健康检查用；测试中为 None
    pub pool: Option<PgPool>,
    pub redis: Option<Arc<RedisCtx>>,
    pub wallet_requests: Arc<WalletRequestService>,
}

impl AppState {
    /// 生产装配：Postgres 仓储 + 站内通知
    pub fn new(
        config: Arc<Config>,
        pool: PgPool,
        redis: Option<RedisCtx>,
        custody: Arc<dyn CustodyApi>,
    ) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
        let requests: Arc<dyn WalletRequestRepository> =
            Arc::new(PgWalletRequestRepository::new(pool.clone()));
        let notifier: Arc<dyn Notifier> = Arc::new(PgNotifier::new(pool.clone()));

        let mut state = Self::from_parts(
            config,
            users,
            requests,
            custody,
            notifier,
            redis.map(Arc::new),
        );
        state.pool = Some(pool);
        state
    }

    /// 从各组件装配（测试注入内存实现）
    pub fn from_parts(
        config: Arc<Config>,
        users: Arc<dyn UserRepository>,
        requests: Arc<dyn WalletRequestRepository>,
        custody: Arc<dyn CustodyApi>,
        notifier: Arc<dyn Notifier>,
        redis: Option<Arc<RedisCtx>>,
    ) -> Self {
        let wallet_requests = Arc::new(WalletRequestService::new(
            users,
            requests,
            custody,
            notifier,
            redis.clone(),
            Duration::from_secs(config.redis.asset_cache_ttl_secs),
            PathBuf::from(&config.export.dir),
        ));

        Self {
            config,
            pool: None,
            redis,
            wallet_requests,
        }
    }
}
