use std::collections::BTreeSet;

use crate::database::{ChatEntity, UserEntity};
use crate::permissions::PermissionCode;

/// 当前请求方: 员工或匿名访客.
/// 两种身份汇入同一条代码路径时 (websocket 转发, 连接日志) 用它区分
#[derive(Debug, Clone)]
pub enum Principal {
    Staff(UserEntity),
    Visitor(ChatEntity),
}

impl Principal {
    /// 日志里使用的身份标识
    pub fn label(&self) -> String {
        match self {
            Principal::Staff(user) => format!("staff:{}", user.uid),
            Principal::Visitor(chat) => format!("chat:{}", chat.uid),
        }
    }
}

/// 通过后台网关认证的员工与其实时权限集, 由网关塞入请求扩展
#[derive(Debug, Clone)]
pub struct CurrentStaff {
    pub user: UserEntity,
    pub permissions: BTreeSet<PermissionCode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(uid: i64) -> UserEntity {
        UserEntity {
            uid,
            first_name: None,
            last_name: None,
            patronymic_name: None,
            email: "a@b.c".to_string(),
            phone_number: None,
            password: "hash".to_string(),
        }
    }

    fn chat(uid: i64) -> ChatEntity {
        ChatEntity {
            uid,
            first_name: None,
            last_name: None,
            patronymic_name: None,
            email: None,
            phone_number: None,
            rating: 0,
        }
    }

    #[test]
    fn labels_distinguish_kinds() {
        assert_eq!(Principal::Staff(staff(5)).label(), "staff:5");
        assert_eq!(Principal::Visitor(chat(9)).label(), "chat:9");
    }
}
