// 员工存储库
// 员工账号与权限集的数据库操作

use std::collections::BTreeSet;

use sqlx::PgPool;

use crate::database::models::user::UserEntity;
use crate::error::AppError;
use crate::permissions::PermissionCode;
use crate::utils;

/// 部分更新输入: 外层 None 表示不修改, 内层 None 表示清空
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub patronymic_name: Option<Option<String>>,
    /// 邮箱不可清空, 只能换成新值
    pub email: Option<String>,
    pub phone_number: Option<Option<String>>,
}

pub struct UserOperation {
    db: PgPool,
}

impl UserOperation {
    pub fn new(db: &PgPool) -> Self {
        Self { db: db.clone() }
    }

    pub async fn get(&self, uid: i64) -> Result<Option<UserEntity>, AppError> {
        let user = sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, AppError> {
        let user = sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// 列出员工, 始终排除请求者自己
    pub async fn list(&self, exclude_uid: i64, limit: i64) -> Result<Vec<UserEntity>, AppError> {
        let users = sqlx::query_as::<_, UserEntity>(
            "SELECT * FROM users WHERE uid <> $1 ORDER BY uid LIMIT $2",
        )
        .bind(exclude_uid)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    pub async fn create(&self, email: &str, password: &str) -> Result<UserEntity, AppError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("该邮箱已被注册".to_string()));
        }
        let hashed = utils::hash_password(password)?;
        let user = sqlx::query_as::<_, UserEntity>(
            "INSERT INTO users (email, password) VALUES ($1, $2) RETURNING *",
        )
        .bind(email)
        .bind(&hashed)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    pub async fn update(&self, uid: i64, update: UserUpdate) -> Result<UserEntity, AppError> {
        let Some(current) = self.get(uid).await? else {
            return Err(AppError::NotFound("用户"));
        };
        if let Some(email) = &update.email {
            if *email != current.email && self.find_by_email(email).await?.is_some() {
                return Err(AppError::Conflict("该邮箱已被注册".to_string()));
            }
        }

        let first_name = update.first_name.unwrap_or(current.first_name);
        let last_name = update.last_name.unwrap_or(current.last_name);
        let patronymic_name = update.patronymic_name.unwrap_or(current.patronymic_name);
        let email = update.email.unwrap_or(current.email);
        let phone_number = update.phone_number.unwrap_or(current.phone_number);

        let user = sqlx::query_as::<_, UserEntity>(
            "UPDATE users
             SET first_name = $2, last_name = $3, patronymic_name = $4, email = $5, phone_number = $6
             WHERE uid = $1
             RETURNING *",
        )
        .bind(uid)
        .bind(&first_name)
        .bind(&last_name)
        .bind(&patronymic_name)
        .bind(&email)
        .bind(&phone_number)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    /// 邮箱加 bcrypt 校验, 用户不存在与密码错误同样返回 None
    pub async fn verify_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserEntity>, AppError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        if utils::verify_password(password, &user.password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn permission_codes(
        &self,
        user_uid: i64,
    ) -> Result<BTreeSet<PermissionCode>, AppError> {
        let rows =
            sqlx::query_scalar::<_, String>("SELECT code FROM permissions WHERE user_uid = $1")
                .bind(user_uid)
                .fetch_all(&self.db)
                .await?;
        Ok(rows
            .iter()
            .filter_map(|code| PermissionCode::parse(code))
            .collect())
    }

    /// 在一个事务内整体替换权限集
    pub async fn replace_permissions(
        &self,
        user_uid: i64,
        codes: &BTreeSet<PermissionCode>,
    ) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM permissions WHERE user_uid = $1")
            .bind(user_uid)
            .execute(&mut *tx)
            .await?;
        for code in codes {
            sqlx::query("INSERT INTO permissions (code, user_uid) VALUES ($1, $2)")
                .bind(code.as_str())
                .bind(user_uid)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// 启动时保证初始管理员存在并持有全部权限
    pub async fn ensure_init_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserEntity, AppError> {
        let user = match self.find_by_email(email).await? {
            Some(user) => user,
            None => self.create(email, password).await?,
        };
        let all: BTreeSet<PermissionCode> = PermissionCode::ALL.into_iter().collect();
        self.replace_permissions(user.uid, &all).await?;
        Ok(user)
    }
}
