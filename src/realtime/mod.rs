// 实时事件
// 频道命名, 事件结构与 websocket 转发循环

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::StreamExt;
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};

use crate::auth::Principal;

/// 全部新消息事件的全局频道, 后台监听
pub const ADMIN_EVENTS_CHANNEL: &str = "helpdesk:events";

const CHAT_EVENTS_PREFIX: &str = "helpdesk:chat:";

/// 单个聊天的事件频道, 访客挂件监听
pub fn chat_events_channel(chat_uid: i64) -> String {
    format!("{CHAT_EVENTS_PREFIX}{chat_uid}")
}

/// 新消息事件, 以 JSON 文本投递. 订阅方拿到 uid 后自行拉取内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub chat_uid: i64,
    pub message_uid: i64,
}

impl MessageEvent {
    pub fn created(chat_uid: i64, message_uid: i64) -> Self {
        Self {
            kind: "message".to_string(),
            chat_uid,
            message_uid,
        }
    }
}

/// 消息创建成功后同时向全局频道与所属聊天频道广播.
/// 广播失败只记日志, 不影响已提交的请求
pub async fn publish_message_created(redis: &Arc<RedisClient>, chat_uid: i64, message_uid: i64) {
    let event = MessageEvent::created(chat_uid, message_uid);
    let payload = match serde_json::to_string(&event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!("failed to encode message event: {}", err);
            return;
        }
    };
    if let Err(err) = publish_to_channels(redis, chat_uid, &payload).await {
        tracing::warn!(
            "event publish failed for chat {} message {}: {}",
            chat_uid,
            message_uid,
            err
        );
    }
}

async fn publish_to_channels(
    redis: &Arc<RedisClient>,
    chat_uid: i64,
    payload: &str,
) -> Result<(), redis::RedisError> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    let _: () = conn.publish(ADMIN_EVENTS_CHANNEL, payload).await?;
    let _: () = conn.publish(chat_events_channel(chat_uid), payload).await?;
    Ok(())
}

/// 订阅频道并把事件原样转发给 websocket, 任一侧断开即结束.
/// 入站帧只用于断线检测, 内容一律忽略
pub async fn forward_events(
    mut socket: WebSocket,
    redis: Arc<RedisClient>,
    channel: String,
    principal: Principal,
) {
    let who = principal.label();

    let mut pubsub = match redis.get_async_pubsub().await {
        Ok(pubsub) => pubsub,
        Err(err) => {
            tracing::error!("pubsub connect failed for {}: {}", who, err);
            return;
        }
    };
    if let Err(err) = pubsub.subscribe(&channel).await {
        tracing::error!("subscribe {} failed for {}: {}", channel, who, err);
        return;
    }
    tracing::info!("{} subscribed to {}", who, channel);

    loop {
        let mut events = pubsub.on_message();
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!("ws read error for {}: {}", who, err);
                    break;
                }
            },
            event = events.next() => match event {
                Some(msg) => {
                    let payload: String = match msg.get_payload() {
                        Ok(payload) => payload,
                        Err(err) => {
                            tracing::warn!("bad event payload on {}: {}", channel, err);
                            continue;
                        }
                    };
                    if socket.send(WsMessage::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    if let Err(err) = pubsub.unsubscribe(&channel).await {
        tracing::debug!("unsubscribe {} failed: {}", channel, err);
    }
    tracing::info!("{} disconnected from {}", who, channel);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_wire_shape() {
        let event = MessageEvent::created(3, 9);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "message", "chat_uid": 3, "message_uid": 9})
        );
    }

    #[test]
    fn event_roundtrip() {
        let raw = r#"{"type":"message","chat_uid":1,"message_uid":2}"#;
        let event: MessageEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event, MessageEvent::created(1, 2));
    }

    #[test]
    fn channel_names() {
        assert_eq!(chat_events_channel(5), "helpdesk:chat:5");
        assert_ne!(chat_events_channel(5), ADMIN_EVENTS_CHANNEL);
    }
}
