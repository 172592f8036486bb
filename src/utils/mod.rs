use axum::Json;
use bcrypt::{DEFAULT_COST, hash, verify};
use serde::{Deserialize, Serialize};

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 所有 JSON 响应的统一信封
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const USER_EXISTS: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const PAYLOAD_TOO_LARGE: i32 = 1006;
    pub const CSRF_FAILED: i32 = 1007;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// 去掉首尾空白, 空串视为无内容
pub fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 电话号码接受 +7/7/8 开头加 10 位数字, 统一存储为 +7 格式
pub fn normalize_phone_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("+7")
        .or_else(|| trimmed.strip_prefix('7'))
        .or_else(|| trimmed.strip_prefix('8'))?;
    if digits.len() == 10 && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("+7{digits}"))
    } else {
        None
    }
}

pub fn is_valid_email(value: &str) -> bool {
    if value.len() > 128 || value.contains(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hashed = hash_password("secret").unwrap();
        assert!(verify_password("secret", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn normalize_text_strips_blank() {
        assert_eq!(normalize_text("  привет  "), Some("привет".to_string()));
        assert_eq!(normalize_text("   "), None);
        assert_eq!(normalize_text(""), None);
    }

    #[test]
    fn phone_number_normalization() {
        assert_eq!(
            normalize_phone_number("+79991234567").as_deref(),
            Some("+79991234567")
        );
        assert_eq!(
            normalize_phone_number("89991234567").as_deref(),
            Some("+79991234567")
        );
        assert_eq!(
            normalize_phone_number("79991234567").as_deref(),
            Some("+79991234567")
        );
        assert_eq!(normalize_phone_number("9991234567"), None);
        assert_eq!(normalize_phone_number("+7999123456"), None);
        assert_eq!(normalize_phone_number("+7999123456a"), None);
        assert_eq!(normalize_phone_number("+799912345678"), None);
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("admin@admin.com"));
        assert!(is_valid_email("a.b@c.d.e"));
        assert!(!is_valid_email("admin"));
        assert!(!is_valid_email("@admin.com"));
        assert!(!is_valid_email("admin@com"));
        assert!(!is_valid_email("admin@.com"));
        assert!(!is_valid_email("ad min@admin.com"));
    }
}
