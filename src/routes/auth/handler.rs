// 后台登录登出
// 登录失败不区分邮箱错还是密码错, 统一跳回登录页

use axum::extract::{Extension, Form, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::{CurrentStaff, token};
use crate::database::UserOperation;
use crate::error::AppError;
use crate::middleware::verify_form_token;
use crate::routes::users::model::UserR;
use crate::utils::success_to_api_response;

use super::model::{LoginForm, LogoutForm};

/// 登录落地页: 持有效凭证的员工直接回后台首页
#[axum::debug_handler]
pub async fn login_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(token::ADMIN_TOKEN_KEY) {
        if token::verify_staff_token(cookie.value(), &state.config.secret_key).is_ok() {
            return Redirect::to("/admin/").into_response();
        }
    }
    success_to_api_response(()).into_response()
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    verify_form_token(&jar, form.csrf_token.as_deref())?;

    let user = UserOperation::new(&state.pool)
        .verify_login(form.email.trim(), &form.password)
        .await?;
    let Some(user) = user else {
        tracing::debug!("failed login attempt for {}", form.email);
        return Ok(Redirect::to("/admin/auth/?error=true").into_response());
    };

    let minted = token::issue_staff_token(user.uid, &state.config.secret_key)?;
    tracing::info!("staff user {} logged in", user.uid);
    Ok((
        jar.add(token::staff_cookie(minted)),
        Redirect::to("/admin/"),
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn logout(jar: CookieJar, Form(form): Form<LogoutForm>) -> Result<Response, AppError> {
    verify_form_token(&jar, form.csrf_token.as_deref())?;
    Ok((
        jar.remove(token::remove_staff_cookie()),
        Redirect::to("/admin/auth/"),
    )
        .into_response())
}

/// 后台首页: 当前员工资料与其实时权限集
#[axum::debug_handler]
pub async fn home(Extension(staff): Extension<CurrentStaff>) -> impl IntoResponse {
    success_to_api_response(UserR::from_staff(staff))
}
