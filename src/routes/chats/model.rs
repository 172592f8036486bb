// 后台聊天管理的请求与响应结构

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::{ChatEntity, ChatUpdate, MessageWithFiles};
use crate::error::AppError;
use crate::routes::users::model::{ProfileForm, name_field, phone_field};
use crate::utils::{is_valid_email, normalize_text};

/// 聊天详情
#[derive(Debug, Serialize)]
pub struct ChatR {
    pub uid: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub patronymic_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub rating: i16,
}

impl From<ChatEntity> for ChatR {
    fn from(chat: ChatEntity) -> Self {
        Self {
            uid: chat.uid,
            first_name: chat.first_name,
            last_name: chat.last_name,
            patronymic_name: chat.patronymic_name,
            email: chat.email,
            phone_number: chat.phone_number,
            rating: chat.rating,
        }
    }
}

/// 侧边栏列表项
#[derive(Debug, Serialize)]
pub struct ChatL {
    pub uid: i64,
}

/// 后台侧的消息视图, 附件带 MIME 类型
#[derive(Debug, Serialize)]
pub struct AdminMessageR {
    pub uid: i64,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_uid: Option<i64>,
    pub files: Vec<AdminFileR>,
}

#[derive(Debug, Serialize)]
pub struct AdminFileR {
    pub uid: i64,
    pub name: String,
    pub mime_type: String,
}

impl From<MessageWithFiles> for AdminMessageR {
    fn from(value: MessageWithFiles) -> Self {
        Self {
            uid: value.message.uid,
            text: value.message.text,
            created_at: value.message.created_at,
            user_uid: value.message.user_uid,
            files: value
                .files
                .into_iter()
                .map(|file| AdminFileR {
                    uid: file.uid,
                    name: file.name,
                    mime_type: file.mime_type,
                })
                .collect(),
        }
    }
}

/// 聊天资料更新: 与员工表单同源, 但邮箱可清空且带评级
pub fn chat_update_from_form(form: ProfileForm) -> Result<ChatUpdate, AppError> {
    let ProfileForm {
        first_name,
        last_name,
        patronymic_name,
        email,
        phone_number,
        rating,
        csrf_token: _,
    } = form;

    let email = match email {
        None => None,
        Some(raw) => match normalize_text(&raw) {
            None => Some(None),
            Some(email) => {
                if !is_valid_email(&email) {
                    return Err(AppError::validation("邮箱格式无效"));
                }
                Some(Some(email))
            }
        },
    };

    let rating = match rating {
        None => None,
        Some(raw) => match raw.trim().parse::<i16>() {
            Ok(rating) => Some(rating),
            Err(_) => return Err(AppError::validation("评级必须是整数")),
        },
    };

    Ok(ChatUpdate {
        first_name: name_field(first_name, "名")?,
        last_name: name_field(last_name, "姓")?,
        patronymic_name: name_field(patronymic_name, "父称")?,
        email,
        phone_number: phone_field(phone_number)?,
        rating,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_email_can_be_cleared() {
        let form = ProfileForm {
            email: Some("   ".to_string()),
            ..ProfileForm::default()
        };
        let update = chat_update_from_form(form).unwrap();
        assert_eq!(update.email, Some(None));
    }

    #[test]
    fn rating_parses_or_rejects() {
        let form = ProfileForm {
            rating: Some(" 4 ".to_string()),
            ..ProfileForm::default()
        };
        assert_eq!(chat_update_from_form(form).unwrap().rating, Some(4));

        let bad = ProfileForm {
            rating: Some("четыре".to_string()),
            ..ProfileForm::default()
        };
        assert!(chat_update_from_form(bad).is_err());
    }

    #[test]
    fn untouched_form_changes_nothing() {
        let update = chat_update_from_form(ProfileForm::default()).unwrap();
        assert!(update.first_name.is_none());
        assert!(update.email.is_none());
        assert!(update.rating.is_none());
    }
}
