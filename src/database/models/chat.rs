// 聊天实体
// 访客会话, 资料字段全部可空, 由员工后补

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 聊天实体, 对应 chats 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatEntity {
    pub uid: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patronymic_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// 员工给访客的评级
    pub rating: i16,
}
