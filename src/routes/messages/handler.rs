// 访客消息接口
// 身份一律来自会话 cookie, 凭证问题自愈为新聊天.
// 会话 jar 必须随每个响应返回, 新铸的身份在校验失败时也不能丢

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::ChatSession;
use crate::database::MessageOperation;
use crate::error::AppError;
use crate::files::FileStreamer;
use crate::middleware::verify_form_token;
use crate::utils::success_to_api_response;

use super::model::{MessageForm, MessageR, MessagesQuery};

/// 访客每页默认 30 条
const DEFAULT_PAGE_SIZE: i64 = 30;

/// 业务结果连同会话 cookie 一起返回, 错误响应同样携带
fn with_session_jar(jar: CookieJar, result: Result<Response, AppError>) -> Response {
    let response = result.unwrap_or_else(|err| err.into_response());
    (jar, response).into_response()
}

#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    session: ChatSession,
) -> Response {
    let ChatSession { chat, jar } = session;
    with_session_jar(jar, list_inner(&state, query, chat.uid).await)
}

async fn list_inner(
    state: &AppState,
    query: MessagesQuery,
    chat_uid: i64,
) -> Result<Response, AppError> {
    let (limit, offset) = query.normalize(DEFAULT_PAGE_SIZE)?;
    let messages = MessageOperation::new(&state.pool)
        .list(chat_uid, limit, offset)
        .await?;
    let messages: Vec<MessageR> = messages.into_iter().map(MessageR::from).collect();
    Ok(success_to_api_response(messages).into_response())
}

#[axum::debug_handler]
pub async fn create_message(
    State(state): State<AppState>,
    session: ChatSession,
    multipart: Multipart,
) -> Response {
    let ChatSession { chat, jar } = session;
    let result = create_inner(&state, &jar, chat.uid, multipart).await;
    with_session_jar(jar, result)
}

async fn create_inner(
    state: &AppState,
    jar: &CookieJar,
    chat_uid: i64,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = MessageForm::from_multipart(multipart).await?;
    verify_form_token(jar, form.csrf_token.as_deref())?;
    form.validate()?;

    let created = MessageOperation::new(&state.pool)
        .create(
            &state.redis,
            &state.files,
            chat_uid,
            form.text,
            form.files,
            None,
        )
        .await?;
    Ok(success_to_api_response(MessageR::from(created)).into_response())
}

/// 附件下载, 查找范围限定在会话聊天内
#[axum::debug_handler]
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_uid): Path<i64>,
    session: ChatSession,
) -> Response {
    let ChatSession { chat, jar } = session;
    with_session_jar(jar, download_inner(&state, chat.uid, file_uid).await)
}

async fn download_inner(
    state: &AppState,
    chat_uid: i64,
    file_uid: i64,
) -> Result<Response, AppError> {
    let Some(file) = MessageOperation::new(&state.pool)
        .find_file(chat_uid, file_uid)
        .await?
    else {
        return Err(AppError::NotFound("文件"));
    };

    let streamer = FileStreamer::open(
        file.name,
        file.mime_type,
        std::path::Path::new(&file.path),
    )
    .await?;
    let headers = [
        (header::CONTENT_TYPE, streamer.mime_type.clone()),
        (header::CONTENT_DISPOSITION, streamer.content_disposition()),
    ];
    Ok((headers, Body::from_stream(streamer.into_stream())).into_response())
}
