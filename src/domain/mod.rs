//! Domain 模块
//!
//! 充值地址流程的领域模型与纯函数规则

pub mod asset;
pub mod wallet_request_status;

// 重新导出常用类型
pub use asset::{display_symbol, normalize_asset_id, strip_chain_prefix, ResolveMode};
pub use wallet_request_status::WalletRequestStatus;
