// 后台访问网关
// 每个请求重新校验凭证并从数据库加载实时权限集, 不做缓存

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::{CurrentStaff, token};
use crate::database::UserOperation;
use crate::permissions::{self, PermissionCode};

const LOGIN_LOCATION: &str = "/admin/auth/";
const HOME_LOCATION: &str = "/admin/";

/// 挂在路由组上的员工网关.
/// 所需权限集为空时仅要求持有有效员工凭证.
/// 凭证缺失/无效/用户已删除跳登录页 (后两者同时清掉 cookie), 权限不足跳后台首页
pub async fn require_staff(
    State((state, required)): State<(AppState, &'static [PermissionCode])>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(cookie) = jar.get(token::ADMIN_TOKEN_KEY) else {
        return Redirect::to(LOGIN_LOCATION).into_response();
    };

    let user_uid = match token::verify_staff_token(cookie.value(), &state.config.secret_key) {
        Ok(user_uid) => user_uid,
        Err(err) => {
            tracing::debug!("invalid staff token: {}", err);
            return clear_cookie_and_login(jar);
        }
    };

    let users = UserOperation::new(&state.pool);
    let user = match users.get(user_uid).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!("staff user {} no longer exists", user_uid);
            return clear_cookie_and_login(jar);
        }
        Err(err) => return err.into_response(),
    };
    let held = match users.permission_codes(user.uid).await {
        Ok(held) => held,
        Err(err) => return err.into_response(),
    };

    if !permissions::authorize(required, &held) {
        tracing::debug!("user {} lacks required permissions {:?}", user.uid, required);
        return Redirect::to(HOME_LOCATION).into_response();
    }

    request.extensions_mut().insert(CurrentStaff {
        user,
        permissions: held,
    });
    next.run(request).await
}

fn clear_cookie_and_login(jar: CookieJar) -> Response {
    (
        jar.remove(token::remove_staff_cookie()),
        Redirect::to(LOGIN_LOCATION),
    )
        .into_response()
}
