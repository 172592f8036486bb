// 员工管理接口
// 网关已按路由要求的权限代码放行, 这里只做业务

use std::collections::BTreeSet;

use axum::extract::{Extension, Json, Multipart, Path, Query, State};
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::CurrentStaff;
use crate::database::UserOperation;
use crate::error::AppError;
use crate::middleware::verify_form_token;
use crate::permissions::{self, PermissionCode};
use crate::utils::success_to_api_response;

use super::model::{
    PermissionCodesBody, PermissionCodesR, ProfileForm, UserCBody, UserL, UserR, UsersQuery,
    permission_meta,
};

/// 员工列表, 始终排除请求者自己
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
    Extension(staff): Extension<CurrentStaff>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.normalize()?;
    let users = UserOperation::new(&state.pool)
        .list(staff.user.uid, limit)
        .await?;
    let users: Vec<UserL> = users.into_iter().map(UserL::from).collect();
    Ok(success_to_api_response(users))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserOperation::new(&state.pool);
    let Some(user) = users.get(uid).await? else {
        return Err(AppError::NotFound("用户"));
    };
    let codes = users.permission_codes(user.uid).await?;
    Ok(success_to_api_response(UserR::new(user, codes)))
}

/// 新员工没有任何权限, 权限单独授予
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<UserCBody>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()?;
    let user = UserOperation::new(&state.pool)
        .create(body.email.trim(), &body.password)
        .await?;
    tracing::info!("staff user {} created", user.uid);
    Ok(success_to_api_response(UserR::new(user, BTreeSet::new())))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Path(uid): Path<i64>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = ProfileForm::from_multipart(multipart).await?;
    verify_form_token(&jar, form.csrf_token.as_deref())?;

    let users = UserOperation::new(&state.pool);
    let user = users.update(uid, form.into_user_update()?).await?;
    let codes = users.permission_codes(user.uid).await?;
    Ok(success_to_api_response(UserR::new(user, codes)))
}

/// 整体替换权限集: 先做闭包, 编辑自己时强制保留管理权限
#[axum::debug_handler]
pub async fn update_user_permissions(
    State(state): State<AppState>,
    Path(uid): Path<i64>,
    Extension(staff): Extension<CurrentStaff>,
    Json(body): Json<PermissionCodesBody>,
) -> Result<impl IntoResponse, AppError> {
    let users = UserOperation::new(&state.pool);
    let Some(target) = users.get(uid).await? else {
        return Err(AppError::NotFound("用户"));
    };

    let requested: BTreeSet<PermissionCode> = body.permission_codes.into_iter().collect();
    let expanded = permissions::expand_for_update(&requested, target.uid == staff.user.uid);
    users.replace_permissions(target.uid, &expanded).await?;
    tracing::info!(
        "user {} permissions replaced by {} ({} codes)",
        target.uid,
        staff.user.uid,
        expanded.len()
    );

    Ok(success_to_api_response(PermissionCodesR {
        permission_codes: expanded.into_iter().collect(),
    }))
}

/// 权限编辑界面的代码元数据
#[axum::debug_handler]
pub async fn list_permission_meta() -> impl IntoResponse {
    success_to_api_response(permission_meta())
}
