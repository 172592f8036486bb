// 员工实体
// 后台账号, 权限行以 (code, user_uid) 存储, 读写均按代码字符串

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 员工实体, 对应 users 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserEntity {
    pub uid: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patronymic_name: Option<String>,
    pub email: String,
    pub phone_number: Option<String>,
    /// bcrypt 哈希, 永不出现在响应里
    #[serde(skip_serializing)]
    pub password: String,
}
