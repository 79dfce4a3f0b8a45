//! Trace ID 中间件
//! 为每个请求生成唯一的 trace_id，用于全链路追踪

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;

pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// 请求扩展中的 trace_id
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

/// 从请求头中提取 trace_id，如果没有则生成新的
pub fn get_or_generate(req: &Request) -> String {
    req.headers()
        .get(TRACE_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 为每个请求生成或提取 trace_id，写入请求扩展、响应头与错误响应体
pub async fn trace_id_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = get_or_generate(&req);
    req.extensions_mut().insert(TraceId(trace_id.clone()));

    let mut response = next.run(req).await;

    if let Some(err) = response.extensions_mut().remove::<AppError>() {
        if err.trace_id.is_none() {
            response = with_error_trace_id(response, err, &trace_id);
        }
    }

    if let Ok(header_value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, header_value);
    }

    response
}

/// 用带 trace_id 的错误体替换原响应体，保留状态码与已有响应头
fn with_error_trace_id(response: Response, err: AppError, trace_id: &str) -> Response {
    let (parts, _) = response.into_parts();
    let (_, body) = err
        .with_trace_id(trace_id.to_string())
        .into_response()
        .into_parts();
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode};

    use super::*;

    #[tokio::test]
    async fn test_error_body_gets_trace_id() {
        let response = AppError::forbidden("nope").into_response();
        let err = response.extensions().get::<AppError>().cloned().unwrap();

        let response = with_error_trace_id(response, err, "trace-abc");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "forbidden");
        assert_eq!(body["trace_id"], "trace-abc");
    }
}
