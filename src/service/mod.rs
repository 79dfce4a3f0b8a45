pub mod address_resolver;
pub mod custody; // 托管方 API（Fireblocks）
pub mod export_service;
pub mod notification_service;
pub mod vault_provisioner;
pub mod wallet_request_service;

pub use wallet_request_service::WalletRequestService;
