// 访客消息接口的请求与响应结构
// MessageForm 同时服务访客与后台的多部分表单

use axum::extract::Multipart;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::MessageWithFiles;
use crate::error::AppError;
use crate::files::UploadedFile;
use crate::middleware::CSRF_FIELD;
use crate::utils::normalize_text;

/// 消息正文长度上限 (字符数)
pub const MAX_TEXT_LENGTH: usize = 1024;

/// 解析后的消息表单
#[derive(Debug, Default)]
pub struct MessageForm {
    pub text: Option<String>,
    pub files: Vec<UploadedFile>,
    pub csrf_token: Option<String>,
}

impl MessageForm {
    /// 逐字段读取 multipart, 只做传输解码与正文去空白.
    /// 内容校验放在 validate, 调用方先完成 CSRF 比对再校验
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MessageForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(|name| name.to_string());
            match name.as_deref() {
                Some("text") => {
                    form.text = normalize_text(&field.text().await?);
                }
                Some("files") => {
                    let file_name = field.file_name().unwrap_or("file").to_string();
                    let bytes = field.bytes().await?.to_vec();
                    if !bytes.is_empty() {
                        form.files.push(UploadedFile {
                            name: file_name,
                            bytes,
                        });
                    }
                }
                Some(CSRF_FIELD) => {
                    form.csrf_token = Some(field.text().await?);
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// 正文限长, 且正文与附件至少要有其一
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(text) = &self.text {
            if text.chars().count() > MAX_TEXT_LENGTH {
                return Err(AppError::validation("消息文本不能超过 1024 个字符"));
            }
        }
        if self.text.is_none() && self.files.is_empty() {
            return Err(AppError::validation("消息必须包含文本或附件"));
        }
        Ok(())
    }
}

/// 访客侧的消息视图, 附件只露出下载所需的字段.
/// 作者信息只在后台视图出现, 访客拿到的消息不带员工标识
#[derive(Debug, Serialize)]
pub struct MessageR {
    pub uid: i64,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub files: Vec<FileR>,
}

#[derive(Debug, Serialize)]
pub struct FileR {
    pub uid: i64,
    pub name: String,
}

impl From<MessageWithFiles> for MessageR {
    fn from(value: MessageWithFiles) -> Self {
        Self {
            uid: value.message.uid,
            text: value.message.text,
            created_at: value.message.created_at,
            files: value
                .files
                .into_iter()
                .map(|file| FileR {
                    uid: file.uid,
                    name: file.name,
                })
                .collect(),
        }
    }
}

/// 历史分页参数
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl MessagesQuery {
    /// 套默认值并校验边界, limit 必须落在 1..=100
    pub fn normalize(&self, default_limit: i64) -> Result<(i64, i64), AppError> {
        let limit = self.limit.unwrap_or(default_limit);
        if !(1..=100).contains(&limit) {
            return Err(AppError::validation("limit 必须在 1 到 100 之间"));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::validation("offset 不能为负数"));
        }
        Ok((limit, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MessageEntity, MessageFileEntity};

    #[test]
    fn query_bounds() {
        let none = MessagesQuery {
            limit: None,
            offset: None,
        };
        assert_eq!(none.normalize(30).unwrap(), (30, 0));

        let full = MessagesQuery {
            limit: Some(100),
            offset: Some(40),
        };
        assert_eq!(full.normalize(10).unwrap(), (100, 40));

        for bad_limit in [0, -1, 101] {
            let query = MessagesQuery {
                limit: Some(bad_limit),
                offset: None,
            };
            assert!(query.normalize(10).is_err(), "limit {bad_limit} 应当被拒绝");
        }

        let negative_offset = MessagesQuery {
            limit: None,
            offset: Some(-5),
        };
        assert!(negative_offset.normalize(10).is_err());
    }

    #[test]
    fn empty_form_is_invalid() {
        let form = MessageForm::default();
        assert!(form.validate().is_err());
    }

    #[test]
    fn text_only_and_files_only_are_valid() {
        let text_only = MessageForm {
            text: Some("привет".to_string()),
            ..MessageForm::default()
        };
        assert!(text_only.validate().is_ok());

        let files_only = MessageForm {
            files: vec![UploadedFile {
                name: "a.bin".to_string(),
                bytes: vec![1],
            }],
            ..MessageForm::default()
        };
        assert!(files_only.validate().is_ok());
    }

    #[test]
    fn overlong_text_is_rejected() {
        let form = MessageForm {
            text: Some("б".repeat(MAX_TEXT_LENGTH + 1)),
            ..MessageForm::default()
        };
        assert!(form.validate().is_err());

        let at_limit = MessageForm {
            text: Some("б".repeat(MAX_TEXT_LENGTH)),
            ..MessageForm::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn message_view_mapping() {
        let created_at = Utc::now();
        let value = MessageWithFiles {
            message: MessageEntity {
                uid: 11,
                chat_uid: 3,
                text: Some("hi".to_string()),
                created_at,
                user_uid: Some(2),
            },
            files: vec![MessageFileEntity {
                uid: 21,
                name: "doc.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                path: "/tmp/x_doc.pdf".to_string(),
                message_uid: 11,
            }],
        };

        let view = MessageR::from(value);
        assert_eq!(view.uid, 11);
        assert_eq!(view.files.len(), 1);
        assert_eq!(view.files[0].name, "doc.pdf");

        // 员工回复在访客侧不暴露作者, 附件也不露出存储细节
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("user_uid").is_none());
        assert!(json.get("files").unwrap()[0].get("path").is_none());
        assert!(json.get("files").unwrap()[0].get("mime_type").is_none());
    }
}
