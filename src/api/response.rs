//! 统一 API 响应格式
//!
//! 成功响应：{ message, data }，HTTP 状态码是唯一的状态来源
//! 错误响应：{ code: "error_code", message, trace_id? }（见 AppError）

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppError;

/// 统一成功响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            message: "success".to_string(),
            data,
        }
    }

    /// 创建成功响应（带自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// 辅助函数：将数据包装为统一响应格式
pub fn success_response<T: Serialize>(data: T) -> Result<Json<ApiResponse<T>>, AppError> {
    Ok(Json(ApiResponse::success(data)))
}

/// 辅助函数：将数据包装为统一响应格式（带自定义消息）
pub fn success_response_with_message<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> Result<Json<ApiResponse<T>>, AppError> {
    Ok(Json(ApiResponse::success_with_message(data, message)))
}

/// 201 Created
pub fn created_response<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> Result<(StatusCode, Json<ApiResponse<T>>), AppError> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(data, message)),
    ))
}
