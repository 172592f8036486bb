use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ADMIN_TOKEN_KEY: &str = "admin-token";
pub const ADMIN_TOKEN_PATH: &str = "/admin/";
pub const CHAT_TOKEN_KEY: &str = "chat-token";
pub const CHAT_TOKEN_PATH: &str = "/api/messages/";

/// 员工凭证载荷
#[derive(Debug, Serialize, Deserialize)]
pub struct StaffClaims {
    pub user_uid: i64,
}

/// 访客凭证载荷
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatClaims {
    pub chat_uid: i64,
}

// 凭证不设过期时间: 员工凭证随登出撤销, 访客凭证失效时由会话自愈替换
fn validation() -> Validation {
    let mut validation = Validation::default();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation
}

pub fn issue_staff_token(
    user_uid: i64,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        &StaffClaims { user_uid },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn issue_chat_token(chat_uid: i64, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        &ChatClaims { chat_uid },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_staff_token(token: &str, secret: &str) -> Result<i64, jsonwebtoken::errors::Error> {
    let data = decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )?;
    Ok(data.claims.user_uid)
}

pub fn verify_chat_token(token: &str, secret: &str) -> Result<i64, jsonwebtoken::errors::Error> {
    let data = decode::<ChatClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation(),
    )?;
    Ok(data.claims.chat_uid)
}

pub fn staff_cookie(token: String) -> Cookie<'static> {
    Cookie::build((ADMIN_TOKEN_KEY, token))
        .path(ADMIN_TOKEN_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// 登出与凭证失效时清除员工 cookie, path 必须与签发时一致
pub fn remove_staff_cookie() -> Cookie<'static> {
    Cookie::build((ADMIN_TOKEN_KEY, ""))
        .path(ADMIN_TOKEN_PATH)
        .http_only(true)
        .build()
}

pub fn chat_cookie(token: String) -> Cookie<'static> {
    Cookie::build((CHAT_TOKEN_KEY, token))
        .path(CHAT_TOKEN_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn staff_token_roundtrip() {
        let token = issue_staff_token(42, SECRET).unwrap();
        assert_eq!(verify_staff_token(&token, SECRET).unwrap(), 42);
    }

    #[test]
    fn chat_token_roundtrip() {
        let token = issue_chat_token(7, SECRET).unwrap();
        assert_eq!(verify_chat_token(&token, SECRET).unwrap(), 7);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_staff_token(42, SECRET).unwrap();
        assert!(verify_staff_token(&token, "other-secret").is_err());
    }

    #[test]
    fn tampered_token_rejected() {
        let token = issue_chat_token(7, SECRET).unwrap();
        let mut tampered = token.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(verify_chat_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn credential_kinds_do_not_cross() {
        let staff = issue_staff_token(42, SECRET).unwrap();
        let chat = issue_chat_token(7, SECRET).unwrap();
        assert!(verify_chat_token(&staff, SECRET).is_err());
        assert!(verify_staff_token(&chat, SECRET).is_err());
    }

    #[test]
    fn cookie_attributes() {
        let staff = staff_cookie("t".to_string());
        assert_eq!(staff.name(), ADMIN_TOKEN_KEY);
        assert_eq!(staff.path(), Some(ADMIN_TOKEN_PATH));
        assert_eq!(staff.http_only(), Some(true));

        let chat = chat_cookie("t".to_string());
        assert_eq!(chat.path(), Some(CHAT_TOKEN_PATH));
        assert_eq!(chat.http_only(), Some(true));

        let removal = remove_staff_cookie();
        assert_eq!(removal.name(), ADMIN_TOKEN_KEY);
        assert_eq!(removal.path(), Some(ADMIN_TOKEN_PATH));
    }
}
