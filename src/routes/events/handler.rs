// 实时事件接入
// 后台订阅全局频道, 访客只订阅本聊天频道; 转发循环两端共用

use axum::Extension;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};

use crate::AppState;
use crate::auth::{ChatSession, CurrentStaff, Principal};
use crate::realtime;

/// 后台事件流, 网关已完成认证
#[axum::debug_handler]
pub async fn admin_events(
    State(state): State<AppState>,
    Extension(staff): Extension<CurrentStaff>,
    ws: WebSocketUpgrade,
) -> Response {
    let principal = Principal::Staff(staff.user);
    let redis = state.redis.clone();
    ws.on_upgrade(move |socket| {
        realtime::forward_events(
            socket,
            redis,
            realtime::ADMIN_EVENTS_CHANNEL.to_string(),
            principal,
        )
    })
}

/// 访客事件流, 会话自愈可能在握手响应里带新 cookie
#[axum::debug_handler]
pub async fn chat_events(
    State(state): State<AppState>,
    session: ChatSession,
    ws: WebSocketUpgrade,
) -> Response {
    let ChatSession { chat, jar } = session;
    let channel = realtime::chat_events_channel(chat.uid);
    let principal = Principal::Visitor(chat);
    let redis = state.redis.clone();
    let response =
        ws.on_upgrade(move |socket| realtime::forward_events(socket, redis, channel, principal));
    (jar, response).into_response()
}
