// 员工管理接口的请求与响应结构
// ProfileForm 是后台资料表单的通用解析, 聊天编辑也用它

use std::collections::BTreeSet;

use axum::extract::Multipart;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentStaff;
use crate::database::{UserEntity, UserUpdate};
use crate::error::AppError;
use crate::middleware::CSRF_FIELD;
use crate::permissions::{PermissionCode, PermissionGroup};
use crate::utils::{is_valid_email, normalize_phone_number, normalize_text};

/// 员工详情视图, 带实时权限集
#[derive(Debug, Serialize)]
pub struct UserR {
    pub uid: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patronymic_name: Option<String>,
    pub email: String,
    pub phone_number: Option<String>,
    pub permission_codes: Vec<PermissionCode>,
}

impl UserR {
    pub fn new(user: UserEntity, codes: BTreeSet<PermissionCode>) -> Self {
        Self {
            uid: user.uid,
            first_name: user.first_name,
            last_name: user.last_name,
            patronymic_name: user.patronymic_name,
            email: user.email,
            phone_number: user.phone_number,
            permission_codes: codes.into_iter().collect(),
        }
    }

    pub fn from_staff(staff: CurrentStaff) -> Self {
        Self::new(staff.user, staff.permissions)
    }
}

/// 员工列表项
#[derive(Debug, Serialize)]
pub struct UserL {
    pub uid: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patronymic_name: Option<String>,
    pub email: String,
}

impl From<UserEntity> for UserL {
    fn from(user: UserEntity) -> Self {
        Self {
            uid: user.uid,
            first_name: user.first_name,
            last_name: user.last_name,
            patronymic_name: user.patronymic_name,
            email: user.email,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub limit: Option<i64>,
}

impl UsersQuery {
    pub fn normalize(&self) -> Result<i64, AppError> {
        let limit = self.limit.unwrap_or(30);
        if !(1..=100).contains(&limit) {
            return Err(AppError::validation("limit 必须在 1 到 100 之间"));
        }
        Ok(limit)
    }
}

/// 创建员工请求 (JSON)
#[derive(Debug, Deserialize)]
pub struct UserCBody {
    pub email: String,
    pub password: String,
}

impl UserCBody {
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_valid_email(self.email.trim()) {
            return Err(AppError::validation("邮箱格式无效"));
        }
        if self.password.is_empty() {
            return Err(AppError::validation("密码不能为空"));
        }
        // bcrypt 只取前 72 字节
        if self.password.len() > 72 {
            return Err(AppError::validation("密码不能超过 72 个字节"));
        }
        Ok(())
    }
}

/// 资料表单的原始字段: 缺字段不动, 传了空串表示清空
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patronymic_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub rating: Option<String>,
    pub csrf_token: Option<String>,
}

impl ProfileForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = ProfileForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(|name| name.to_string());
            let value = field.text().await?;
            match name.as_deref() {
                Some("first_name") => form.first_name = Some(value),
                Some("last_name") => form.last_name = Some(value),
                Some("patronymic_name") => form.patronymic_name = Some(value),
                Some("email") => form.email = Some(value),
                Some("phone_number") => form.phone_number = Some(value),
                Some("rating") => form.rating = Some(value),
                Some(CSRF_FIELD) => form.csrf_token = Some(value),
                _ => {}
            }
        }
        Ok(form)
    }

    /// 员工资料更新: 邮箱只能换新值, 不能清空
    pub fn into_user_update(self) -> Result<UserUpdate, AppError> {
        let email = match self.email {
            None => None,
            Some(raw) => match normalize_text(&raw) {
                None => return Err(AppError::validation("邮箱不能为空")),
                Some(email) => {
                    if !is_valid_email(&email) {
                        return Err(AppError::validation("邮箱格式无效"));
                    }
                    Some(email)
                }
            },
        };
        Ok(UserUpdate {
            first_name: name_field(self.first_name, "名")?,
            last_name: name_field(self.last_name, "姓")?,
            patronymic_name: name_field(self.patronymic_name, "父称")?,
            email,
            phone_number: phone_field(self.phone_number)?,
        })
    }
}

pub(crate) fn name_field(
    raw: Option<String>,
    label: &str,
) -> Result<Option<Option<String>>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = normalize_text(&raw);
    if let Some(value) = &value {
        if value.chars().count() > 64 {
            return Err(AppError::Validation(format!("{label}不能超过 64 个字符")));
        }
    }
    Ok(Some(value))
}

pub(crate) fn phone_field(raw: Option<String>) -> Result<Option<Option<String>>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match normalize_text(&raw) {
        None => Ok(Some(None)),
        Some(value) => match normalize_phone_number(&value) {
            Some(normalized) => Ok(Some(Some(normalized))),
            None => Err(AppError::validation(
                "电话号码须以 7, +7 或 8 开头并包含 10 位数字",
            )),
        },
    }
}

/// 权限集更新请求 (JSON), 未知代码在反序列化时即被拒绝
#[derive(Debug, Deserialize)]
pub struct PermissionCodesBody {
    pub permission_codes: Vec<PermissionCode>,
}

#[derive(Debug, Serialize)]
pub struct PermissionCodesR {
    pub permission_codes: Vec<PermissionCode>,
}

/// 后台权限编辑界面用的元数据
#[derive(Debug, Serialize)]
pub struct PermissionMetaR {
    pub code: PermissionCode,
    pub name: &'static str,
    pub group: PermissionGroup,
    pub group_name: &'static str,
}

pub fn permission_meta() -> Vec<PermissionMetaR> {
    PermissionCode::ALL
        .iter()
        .map(|code| PermissionMetaR {
            code: *code,
            name: code.name(),
            group: code.group(),
            group_name: code.group().name(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(field: &str, value: &str) -> ProfileForm {
        let mut form = ProfileForm::default();
        match field {
            "first_name" => form.first_name = Some(value.to_string()),
            "email" => form.email = Some(value.to_string()),
            "phone_number" => form.phone_number = Some(value.to_string()),
            _ => unreachable!(),
        }
        form
    }

    #[test]
    fn absent_fields_stay_untouched() {
        let update = ProfileForm::default().into_user_update().unwrap();
        assert!(update.first_name.is_none());
        assert!(update.email.is_none());
        assert!(update.phone_number.is_none());
    }

    #[test]
    fn blank_name_clears_column() {
        let update = form("first_name", "   ").into_user_update().unwrap();
        assert_eq!(update.first_name, Some(None));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let long = "и".repeat(65);
        assert!(form("first_name", &long).into_user_update().is_err());
    }

    #[test]
    fn user_email_cannot_be_cleared() {
        assert!(form("email", "  ").into_user_update().is_err());
        assert!(form("email", "not-an-email").into_user_update().is_err());
        let update = form("email", " new@mail.ru ").into_user_update().unwrap();
        assert_eq!(update.email.as_deref(), Some("new@mail.ru"));
    }

    #[test]
    fn phone_is_normalized_or_rejected() {
        let update = form("phone_number", "89991234567").into_user_update().unwrap();
        assert_eq!(update.phone_number, Some(Some("+79991234567".to_string())));

        let cleared = form("phone_number", "").into_user_update().unwrap();
        assert_eq!(cleared.phone_number, Some(None));

        assert!(form("phone_number", "12345").into_user_update().is_err());
    }

    #[test]
    fn user_create_validation() {
        let ok = UserCBody {
            email: "a@b.c".to_string(),
            password: "secret".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = UserCBody {
            email: "nope".to_string(),
            password: "secret".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let empty_password = UserCBody {
            email: "a@b.c".to_string(),
            password: String::new(),
        };
        assert!(empty_password.validate().is_err());
    }

    #[test]
    fn users_query_bounds() {
        let none = UsersQuery { limit: None };
        assert_eq!(none.normalize().unwrap(), 30);

        for good_limit in [1, 100] {
            let query = UsersQuery {
                limit: Some(good_limit),
            };
            assert_eq!(query.normalize().unwrap(), good_limit);
        }

        for bad_limit in [0, -1, 101] {
            let query = UsersQuery {
                limit: Some(bad_limit),
            };
            assert!(query.normalize().is_err(), "limit {bad_limit} 应当被拒绝");
        }
    }

    #[test]
    fn meta_covers_every_code() {
        let meta = permission_meta();
        assert_eq!(meta.len(), PermissionCode::ALL.len());
        assert!(meta.iter().any(|entry| {
            entry.code == PermissionCode::UPermission && entry.group == PermissionGroup::Permission
        }));
    }
}
