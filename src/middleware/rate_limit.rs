// 访客接口限流
// Redis 固定窗口计数, 按客户端 IP 区分

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::config::Config;
use crate::error::AppError;

#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    config: Arc<Config>,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: Config) -> Self {
        Self {
            redis,
            config: Arc::new(config),
        }
    }

    // `Request<Body>` 不是 `Sync`, 若 async fn 直接持有 `&Request` 则返回的
    // future 不满足 axum 中间件要求的 `Send`, 故先取 key 再构造 future
    fn check(
        &self,
        req: &Request<Body>,
    ) -> impl Future<Output = Result<(), AppError>> + Send {
        let key = format!("helpdesk:rate:{}", client_ip(req));

        async move {
            let mut conn = self.redis.get_multiplexed_async_connection().await?;
            let count: i64 = conn.incr(&key, 1).await?;
            if count == 1 {
                // 窗口内第一个请求时挂上过期时间
                let _: () = conn
                    .expire(&key, self.config.rate_limit_window().as_secs() as i64)
                    .await?;
            }

            if count > self.config.rate_limit_requests as i64 {
                tracing::debug!("rate limit hit for {}", key);
                return Err(AppError::RateLimited);
            }
            Ok(())
        }
    }
}

/// 反向代理头优先, 退回连接对端地址
fn client_ip(req: &Request<Body>) -> String {
    req.headers()
        .get("x-real-ip")
        .and_then(|header| header.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|header| header.to_str().ok())
                .and_then(|value| value.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .map(|ip| ip.trim().to_string())
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Err(err) = limiter.check(&req).await {
        return err.into_response();
    }
    next.run(req).await
}
