use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::service::{
    address_resolver::ResolveError, custody::CustodyError, vault_provisioner::ProvisionError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorCode {
    // HTTP 基础错误码
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,

    // 业务错误码
    UserNotFound,
    WalletRequestNotFound,
    AssetUnavailable,
    VaultProvisionFailed,
    ExternalServiceError,
    ValidationFailed,
    DatabaseError,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppErrorCode::BadRequest => "bad_request",
            AppErrorCode::Unauthorized => "unauthorized",
            AppErrorCode::Forbidden => "forbidden",
            AppErrorCode::NotFound => "not_found",
            AppErrorCode::Internal => "internal",
            AppErrorCode::UserNotFound => "user_not_found",
            AppErrorCode::WalletRequestNotFound => "wallet_request_not_found",
            AppErrorCode::AssetUnavailable => "asset_unavailable",
            AppErrorCode::VaultProvisionFailed => "vault_provision_failed",
            AppErrorCode::ExternalServiceError => "external_service_error",
            AppErrorCode::ValidationFailed => "validation_failed",
            AppErrorCode::DatabaseError => "database_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub trace_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    trace_id: Option<&'a str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
            trace_id: self.trace_id.as_deref(),
        };
        let mut resp = (self.status, Json(body)).into_response();
        // trace_id 中间件据此补写 trace_id
        resp.extensions_mut().insert(self);
        resp
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code.as_str(), self.status, self.message)
    }
}

impl AppError {
    fn new(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status,
            trace_id: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::BadRequest, StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::NotFound, StatusCode::NOT_FOUND, msg)
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Unauthorized, StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Forbidden, StatusCode::FORBIDDEN, msg)
    }

    // 业务错误辅助函数
    pub fn user_not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::UserNotFound, StatusCode::NOT_FOUND, msg)
    }

    pub fn wallet_request_not_found(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::WalletRequestNotFound,
            StatusCode::NOT_FOUND,
            msg,
        )
    }

    pub fn asset_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::AssetUnavailable,
            StatusCode::UNPROCESSABLE_ENTITY,
            msg,
        )
    }

    pub fn vault_provision_failed(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::VaultProvisionFailed,
            StatusCode::BAD_GATEWAY,
            msg,
        )
    }

    pub fn external_service_error(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::ExternalServiceError,
            StatusCode::BAD_GATEWAY,
            msg,
        )
    }

    pub fn validation_failed(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::ValidationFailed, StatusCode::BAD_REQUEST, msg)
    }

    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::new(
            AppErrorCode::DatabaseError,
            StatusCode::INTERNAL_SERVER_ERROR,
            msg,
        )
    }
}

// 从 serde_json 错误转换
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("JSON serialization error: {}", err))
    }
}

// 从 SQLx 错误转换
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::not_found("Resource not found"),
            sqlx::Error::Database(ref db_err) => {
                if let Some(code) = db_err.code() {
                    if code == "23505" {
                        // PostgreSQL unique_violation
                        return Self::bad_request("Resource already exists");
                    }
                    if code == "23503" {
                        // PostgreSQL foreign_key_violation
                        return Self::bad_request("Foreign key constraint violation");
                    }
                }
                Self::database_error(format!("Database error: {}", db_err))
            }
            _ => Self::database_error(format!("Database operation failed: {}", err)),
        }
    }
}

// 从 anyhow 错误转换
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{}", err))
    }
}

impl From<CustodyError> for AppError {
    fn from(err: CustodyError) -> Self {
        Self::external_service_error(err.to_string())
    }
}

impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Store(e) => Self::internal(format!("{}", e)),
            other => Self::vault_provision_failed(other.to_string()),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::AssetUnavailable { reason, .. } => Self::asset_unavailable(reason),
            ResolveError::Custody(e) => Self::from(e),
        }
    }
}
