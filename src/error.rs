use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 统一的应用错误类型, 由各层通过 `?` 向上传递
#[derive(Debug, Error)]
pub enum AppError {
    #[error("未认证")]
    NotAuthenticated,
    #[error("没有权限执行此操作")]
    Forbidden,
    #[error("CSRF 校验失败")]
    CsrfRejected,
    #[error("{0}不存在")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("文件大小不能超过 20MB")]
    PayloadTooLarge,
    #[error("请求过于频繁, 请稍后再试")]
    RateLimited,
    /// 后台表单流程使用 303 跳转而不是 JSON 错误
    #[error("redirect to {0}")]
    SeeOther(String),
    #[error("上传表单解析失败: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::SeeOther(location) => return Redirect::to(location).into_response(),
            AppError::NotAuthenticated => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::Forbidden => (StatusCode::FORBIDDEN, error_codes::PERMISSION_DENIED),
            AppError::CsrfRejected => (StatusCode::FORBIDDEN, error_codes::CSRF_FAILED),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Multipart(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Conflict(_) => (StatusCode::CONFLICT, error_codes::USER_EXISTS),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                error_codes::PAYLOAD_TOO_LARGE,
            ),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT),
            AppError::Database(_)
            | AppError::Redis(_)
            | AppError::Io(_)
            | AppError::Bcrypt(_)
            | AppError::Jwt(_) => (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR),
        };

        // 服务器内部错误只记录详情, 生产环境响应保持统一文案
        let msg = if status.is_server_error() {
            tracing::error!("internal error: {}", self);
            if cfg!(debug_assertions) {
                self.to_string()
            } else {
                "内部服务器错误".to_string()
            }
        } else {
            self.to_string()
        };

        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::CsrfRejected, StatusCode::FORBIDDEN),
            (AppError::NotFound("聊天"), StatusCode::NOT_FOUND),
            (
                AppError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Conflict("dup".to_string()),
                StatusCode::CONFLICT,
            ),
            (AppError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn see_other_redirects() {
        let resp = AppError::SeeOther("/admin/auth/".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get("location").unwrap(), "/admin/auth/");
    }

    #[test]
    fn not_found_message_names_subject() {
        assert_eq!(AppError::NotFound("文件").to_string(), "文件不存在");
    }
}
