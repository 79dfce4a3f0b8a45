//! walletdesk - 托管钱包充值地址服务
//!
//! 为用户在托管方（Fireblocks）开立 Vault、解析充值地址并持久化，
//! 同时提供管理员状态覆盖与导出接口。

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod error_body;
pub mod infrastructure;
pub mod metrics;
pub mod repository;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{ResolveMode, WalletRequestStatus},
        error::{AppError, AppErrorCode},
    };
}
