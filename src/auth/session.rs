use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::token;
use crate::database::{ChatEntity, ChatOperation};
use crate::error::AppError;

/// 访客会话: 从访客 cookie 解析聊天身份.
/// 凭证缺失/无效/聊天行已消失时不报错, 而是创建新聊天并签发新凭证,
/// 新 cookie 随 jar 一起返回, 处理器必须把 jar 放进响应
#[derive(Debug)]
pub struct ChatSession {
    pub chat: ChatEntity,
    pub jar: CookieJar,
}

impl FromRequestParts<AppState> for ChatSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let chats = ChatOperation::new(&state.pool);

        if let Some(cookie) = jar.get(token::CHAT_TOKEN_KEY) {
            match token::verify_chat_token(cookie.value(), &state.config.secret_key) {
                Ok(chat_uid) => {
                    if let Some(chat) = chats.get(chat_uid).await? {
                        return Ok(ChatSession { chat, jar });
                    }
                    tracing::debug!("chat {} from cookie no longer exists", chat_uid);
                }
                Err(err) => {
                    tracing::debug!("invalid chat token: {}", err);
                }
            }
        }

        // 自愈: 铸造全新聊天身份
        let chat = chats.create().await?;
        let minted = token::issue_chat_token(chat.uid, &state.config.secret_key)?;
        tracing::info!("minted new chat identity {}", chat.uid);
        let jar = jar.add(token::chat_cookie(minted));
        Ok(ChatSession { chat, jar })
    }
}
