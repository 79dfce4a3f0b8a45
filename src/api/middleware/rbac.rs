//! 基于角色的权限控制（RBAC）
//!
//! - admin: 可查看和修改所有用户的申请
//! - user: 只能访问自己的数据

use uuid::Uuid;

use crate::{api::middleware::auth::AuthInfo, error::AppError};

/// 角色权限定义
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}

pub fn is_admin(auth_info: &AuthInfo) -> bool {
    auth_info.role.eq_ignore_ascii_case(roles::ADMIN)
}

/// 权限检查：要求管理员角色
pub fn require_admin(auth_info: &AuthInfo) -> Result<(), AppError> {
    if !is_admin(auth_info) {
        return Err(AppError::forbidden(format!("Required role: {}", roles::ADMIN)));
    }
    Ok(())
}

/// 权限检查：本人或管理员
pub fn require_self_or_admin(auth_info: &AuthInfo, user_id: Uuid) -> Result<(), AppError> {
    if auth_info.user_id != user_id && !is_admin(auth_info) {
        return Err(AppError::forbidden("Cannot access another user's wallet requests"));
    }
    Ok(())
}
