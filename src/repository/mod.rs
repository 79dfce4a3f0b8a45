// Repository 抽象层
pub mod user_repository;
pub mod wallet_request_repository;

pub use user_repository::{PgUserRepository, User, UserProfile, UserRepository};
pub use wallet_request_repository::{
    PgWalletRequestRepository, StatusUpdateParams, UpsertAddressParams, WalletAddressRequest,
    WalletRequestRepository, WalletRequestView,
};
