// CSRF 双重提交校验
// 站点级 cookie 加回显: JSON 客户端走请求头, 表单客户端把令牌放进表单字段

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use uuid::Uuid;

use crate::error::AppError;

pub const CSRF_TOKEN_KEY: &str = "csrf-token";
pub const CSRF_HEADER: &str = "x-csrf-token";
/// 表单 / multipart 请求中携带令牌的字段名
pub const CSRF_FIELD: &str = "csrf_token";

/// 校验请求并在 cookie 缺失时随响应签发新令牌
pub async fn csrf_protect(jar: CookieJar, request: Request, next: Next) -> Response {
    if let Err(err) = check_request(&jar, &request) {
        return err.into_response();
    }

    let needs_token = jar.get(CSRF_TOKEN_KEY).is_none();
    let mut response = next.run(request).await;

    if needs_token {
        let cookie = csrf_cookie(Uuid::new_v4().simple().to_string());
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

// 表单类请求的令牌在请求体里, 由各表单解析处调用 verify_form_token;
// 其余非 GET 请求必须带回显头
fn check_request(jar: &CookieJar, request: &Request) -> Result<(), AppError> {
    match *request.method() {
        Method::GET | Method::HEAD | Method::OPTIONS => return Ok(()),
        _ => {}
    }

    match request.headers().get(CSRF_HEADER) {
        Some(echoed) => {
            let expected = jar.get(CSRF_TOKEN_KEY).map(|cookie| cookie.value());
            let echoed = echoed.to_str().unwrap_or("");
            if !echoed.is_empty() && expected == Some(echoed) {
                Ok(())
            } else {
                Err(AppError::CsrfRejected)
            }
        }
        None if is_form_request(request) => Ok(()),
        None => Err(AppError::CsrfRejected),
    }
}

/// 表单里携带的令牌与 cookie 比对, 表单解析后第一时间调用
pub fn verify_form_token(jar: &CookieJar, provided: Option<&str>) -> Result<(), AppError> {
    let expected = jar.get(CSRF_TOKEN_KEY).map(|cookie| cookie.value());
    match (expected, provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() && expected == provided => Ok(()),
        _ => Err(AppError::CsrfRejected),
    }
}

fn is_form_request(request: &Request) -> bool {
    let Some(content_type) = request.headers().get(header::CONTENT_TYPE) else {
        return false;
    };
    let Ok(content_type) = content_type.to_str() else {
        return false;
    };
    content_type.starts_with("multipart/form-data")
        || content_type.starts_with("application/x-www-form-urlencoded")
}

fn csrf_cookie(token: String) -> Cookie<'static> {
    Cookie::build((CSRF_TOKEN_KEY, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE};

    fn jar_with_token(token: &str) -> CookieJar {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{CSRF_TOKEN_KEY}={token}")).unwrap(),
        );
        CookieJar::from_headers(&headers)
    }

    fn request(method: Method, content_type: Option<&str>, echo: Option<&str>) -> Request {
        let mut builder = Request::builder().method(method).uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(echo) = echo {
            builder = builder.header(CSRF_HEADER, echo);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn get_requests_skip_check() {
        let jar = CookieJar::new();
        assert!(check_request(&jar, &request(Method::GET, None, None)).is_ok());
    }

    #[test]
    fn json_post_requires_matching_header() {
        let jar = jar_with_token("tok");
        let ok = request(Method::POST, Some("application/json"), Some("tok"));
        assert!(check_request(&jar, &ok).is_ok());

        let wrong = request(Method::POST, Some("application/json"), Some("other"));
        assert!(check_request(&jar, &wrong).is_err());

        let missing = request(Method::POST, Some("application/json"), None);
        assert!(check_request(&jar, &missing).is_err());
    }

    #[test]
    fn header_without_cookie_is_rejected() {
        let jar = CookieJar::new();
        let req = request(Method::POST, Some("application/json"), Some("tok"));
        assert!(check_request(&jar, &req).is_err());
    }

    #[test]
    fn form_posts_defer_to_field_check() {
        let jar = CookieJar::new();
        let multipart = request(
            Method::POST,
            Some("multipart/form-data; boundary=x"),
            None,
        );
        assert!(check_request(&jar, &multipart).is_ok());

        let urlencoded = request(
            Method::PATCH,
            Some("application/x-www-form-urlencoded"),
            None,
        );
        assert!(check_request(&jar, &urlencoded).is_ok());
    }

    #[test]
    fn form_token_comparison() {
        let jar = jar_with_token("tok");
        assert!(verify_form_token(&jar, Some("tok")).is_ok());
        assert!(verify_form_token(&jar, Some("bad")).is_err());
        assert!(verify_form_token(&jar, None).is_err());
        assert!(verify_form_token(&CookieJar::new(), Some("tok")).is_err());
    }

    #[test]
    fn issued_cookie_attributes() {
        let cookie = csrf_cookie("tok".to_string());
        assert_eq!(cookie.name(), CSRF_TOKEN_KEY);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }
}
