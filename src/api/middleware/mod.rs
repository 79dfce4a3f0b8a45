pub mod auth;
pub mod rbac;
pub mod trace_id;

pub use auth::{auth_middleware, AuthInfo, AuthInfoExtractor};
pub use rbac::{require_admin, require_self_or_admin, roles};
pub use trace_id::{trace_id_middleware, TraceId, TRACE_ID_HEADER};
