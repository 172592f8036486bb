// 消息存储库
// 消息创建, 历史分页与附件查找

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::database::models::message::{MessageEntity, MessageFileEntity, MessageWithFiles};
use crate::error::AppError;
use crate::files::{FileStorage, StoredFile, UploadedFile};
use crate::realtime;

pub struct MessageOperation {
    db: PgPool,
}

impl MessageOperation {
    pub fn new(db: &PgPool) -> Self {
        Self { db: db.clone() }
    }

    /// 创建消息: 附件先整批落盘, 再在一个事务内写入消息与附件行.
    /// 事务失败时清理已落盘的附件, 成功后广播事件 (广播失败不影响请求)
    pub async fn create(
        &self,
        redis: &Arc<RedisClient>,
        storage: &FileStorage,
        chat_uid: i64,
        text: Option<String>,
        files: Vec<UploadedFile>,
        author_uid: Option<i64>,
    ) -> Result<MessageWithFiles, AppError> {
        let stored = storage.store_batch(&files).await?;

        let created = match self.insert_rows(chat_uid, text, author_uid, &stored).await {
            Ok(created) => created,
            Err(err) => {
                storage.remove_batch(&stored).await;
                return Err(err);
            }
        };

        realtime::publish_message_created(redis, chat_uid, created.message.uid).await;
        Ok(created)
    }

    async fn insert_rows(
        &self,
        chat_uid: i64,
        text: Option<String>,
        author_uid: Option<i64>,
        stored: &[StoredFile],
    ) -> Result<MessageWithFiles, AppError> {
        let mut tx = self.db.begin().await?;

        let message = sqlx::query_as::<_, MessageEntity>(
            "INSERT INTO messages (chat_uid, text, created_at, user_uid)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(chat_uid)
        .bind(&text)
        .bind(Utc::now())
        .bind(author_uid)
        .fetch_one(&mut *tx)
        .await?;

        let mut files = Vec::with_capacity(stored.len());
        for file in stored {
            let row = sqlx::query_as::<_, MessageFileEntity>(
                "INSERT INTO message_files (name, mime_type, path, message_uid)
                 VALUES ($1, $2, $3, $4)
                 RETURNING *",
            )
            .bind(&file.name)
            .bind(&file.mime_type)
            .bind(file.path.to_string_lossy().as_ref())
            .bind(message.uid)
            .fetch_one(&mut *tx)
            .await?;
            files.push(row);
        }

        tx.commit().await?;
        Ok(MessageWithFiles { message, files })
    }

    /// 按创建时间倒序分页
    pub async fn list(
        &self,
        chat_uid: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageWithFiles>, AppError> {
        let messages = sqlx::query_as::<_, MessageEntity>(
            "SELECT * FROM messages
             WHERE chat_uid = $1
             ORDER BY created_at DESC, uid DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(chat_uid)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let uids: Vec<i64> = messages.iter().map(|message| message.uid).collect();
        let files = sqlx::query_as::<_, MessageFileEntity>(
            "SELECT * FROM message_files WHERE message_uid = ANY($1) ORDER BY uid",
        )
        .bind(&uids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<i64, Vec<MessageFileEntity>> = HashMap::new();
        for file in files {
            grouped.entry(file.message_uid).or_default().push(file);
        }

        Ok(messages
            .into_iter()
            .map(|message| {
                let files = grouped.remove(&message.uid).unwrap_or_default();
                MessageWithFiles { message, files }
            })
            .collect())
    }

    /// 附件查找限定在给定聊天内, 跨聊天访问与不存在不可区分
    pub async fn find_file(
        &self,
        chat_uid: i64,
        file_uid: i64,
    ) -> Result<Option<MessageFileEntity>, AppError> {
        let file = sqlx::query_as::<_, MessageFileEntity>(
            "SELECT f.* FROM message_files f
             JOIN messages m ON m.uid = f.message_uid
             WHERE m.chat_uid = $1 AND f.uid = $2",
        )
        .bind(chat_uid)
        .bind(file_uid)
        .fetch_optional(&self.db)
        .await?;
        Ok(file)
    }
}
