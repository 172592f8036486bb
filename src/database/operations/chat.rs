// 聊天存储库
// 访客会话行的数据库操作

use sqlx::PgPool;

use crate::database::models::chat::ChatEntity;
use crate::error::AppError;

/// 部分更新输入, 语义同员工资料更新
#[derive(Debug, Default)]
pub struct ChatUpdate {
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub patronymic_name: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone_number: Option<Option<String>>,
    pub rating: Option<i16>,
}

pub struct ChatOperation {
    db: PgPool,
}

impl ChatOperation {
    pub fn new(db: &PgPool) -> Self {
        Self { db: db.clone() }
    }

    /// 新聊天全部字段留空, 由访客自愈流程调用
    pub async fn create(&self) -> Result<ChatEntity, AppError> {
        let chat =
            sqlx::query_as::<_, ChatEntity>("INSERT INTO chats DEFAULT VALUES RETURNING *")
                .fetch_one(&self.db)
                .await?;
        Ok(chat)
    }

    pub async fn get(&self, uid: i64) -> Result<Option<ChatEntity>, AppError> {
        let chat = sqlx::query_as::<_, ChatEntity>("SELECT * FROM chats WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.db)
            .await?;
        Ok(chat)
    }

    /// 后台侧边栏用的聊天列表, 新聊天在前
    pub async fn list_uids(&self) -> Result<Vec<i64>, AppError> {
        let uids = sqlx::query_scalar::<_, i64>("SELECT uid FROM chats ORDER BY uid DESC")
            .fetch_all(&self.db)
            .await?;
        Ok(uids)
    }

    pub async fn update(&self, uid: i64, update: ChatUpdate) -> Result<ChatEntity, AppError> {
        let Some(current) = self.get(uid).await? else {
            return Err(AppError::NotFound("聊天"));
        };

        let first_name = update.first_name.unwrap_or(current.first_name);
        let last_name = update.last_name.unwrap_or(current.last_name);
        let patronymic_name = update.patronymic_name.unwrap_or(current.patronymic_name);
        let email = update.email.unwrap_or(current.email);
        let phone_number = update.phone_number.unwrap_or(current.phone_number);
        let rating = update.rating.unwrap_or(current.rating);

        let chat = sqlx::query_as::<_, ChatEntity>(
            "UPDATE chats
             SET first_name = $2, last_name = $3, patronymic_name = $4, email = $5,
                 phone_number = $6, rating = $7
             WHERE uid = $1
             RETURNING *",
        )
        .bind(uid)
        .bind(&first_name)
        .bind(&last_name)
        .bind(&patronymic_name)
        .bind(&email)
        .bind(&phone_number)
        .bind(rating)
        .fetch_one(&self.db)
        .await?;
        Ok(chat)
    }
}
