// 后台聊天管理接口
// 消息相关端点也挂在聊天路径下, 附件查找始终以聊天为范围

use axum::body::Body;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::auth::CurrentStaff;
use crate::database::{ChatOperation, MessageOperation};
use crate::error::AppError;
use crate::files::FileStreamer;
use crate::middleware::verify_form_token;
use crate::routes::messages::model::{MessageForm, MessagesQuery};
use crate::routes::users::model::ProfileForm;
use crate::utils::success_to_api_response;

use super::model::{AdminMessageR, ChatL, ChatR, chat_update_from_form};

/// 后台每页默认 10 条
const DEFAULT_PAGE_SIZE: i64 = 10;

#[axum::debug_handler]
pub async fn list_chats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let uids = ChatOperation::new(&state.pool).list_uids().await?;
    let chats: Vec<ChatL> = uids.into_iter().map(|uid| ChatL { uid }).collect();
    Ok(success_to_api_response(chats))
}

#[axum::debug_handler]
pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_uid): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let Some(chat) = ChatOperation::new(&state.pool).get(chat_uid).await? else {
        return Err(AppError::NotFound("聊天"));
    };
    Ok(success_to_api_response(ChatR::from(chat)))
}

#[axum::debug_handler]
pub async fn update_chat(
    State(state): State<AppState>,
    Path(chat_uid): Path<i64>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = ProfileForm::from_multipart(multipart).await?;
    verify_form_token(&jar, form.csrf_token.as_deref())?;

    let chat = ChatOperation::new(&state.pool)
        .update(chat_uid, chat_update_from_form(form)?)
        .await?;
    Ok(success_to_api_response(ChatR::from(chat)))
}

#[axum::debug_handler]
pub async fn list_chat_messages(
    State(state): State<AppState>,
    Path(chat_uid): Path<i64>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = query.normalize(DEFAULT_PAGE_SIZE)?;
    let messages = MessageOperation::new(&state.pool)
        .list(chat_uid, limit, offset)
        .await?;
    let messages: Vec<AdminMessageR> = messages.into_iter().map(AdminMessageR::from).collect();
    Ok(success_to_api_response(messages))
}

/// 员工向聊天发消息. 聊天已不存在时跳回聊天列表
#[axum::debug_handler]
pub async fn create_chat_message(
    State(state): State<AppState>,
    Path(chat_uid): Path<i64>,
    Extension(staff): Extension<CurrentStaff>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = MessageForm::from_multipart(multipart).await?;
    verify_form_token(&jar, form.csrf_token.as_deref())?;
    form.validate()?;

    if ChatOperation::new(&state.pool).get(chat_uid).await?.is_none() {
        return Err(AppError::SeeOther("/admin/chats/".to_string()));
    }

    let created = MessageOperation::new(&state.pool)
        .create(
            &state.redis,
            &state.files,
            chat_uid,
            form.text,
            form.files,
            Some(staff.user.uid),
        )
        .await?;
    Ok(success_to_api_response(AdminMessageR::from(created)))
}

#[axum::debug_handler]
pub async fn download_chat_file(
    State(state): State<AppState>,
    Path((chat_uid, file_uid)): Path<(i64, i64)>,
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
