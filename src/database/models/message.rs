// 消息实体
// 消息及其附件行

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 消息实体, 对应 messages 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageEntity {
    pub uid: i64,
    /// 所属聊天
    pub chat_uid: i64,
    /// 正文, 纯附件消息为空
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    /// 员工作者, 访客消息为空
    pub user_uid: Option<i64>,
}

/// 附件实体, 对应 message_files 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageFileEntity {
    pub uid: i64,
    /// 原始文件名
    pub name: String,
    /// 按内容嗅探出的 MIME 类型
    pub mime_type: String,
    /// 磁盘上的存储路径
    pub path: String,
    pub message_uid: i64,
}

/// 消息与其附件
#[derive(Debug, Clone)]
pub struct MessageWithFiles {
    pub message: MessageEntity,
    pub files: Vec<MessageFileEntity>,
}
