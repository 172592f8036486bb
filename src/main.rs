use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use helpdesk_backend::{
    AppState,
    config::Config,
    database::UserOperation,
    files::FileStorage,
    middleware::{RateLimiter, csrf_protect, log_errors, rate_limit, require_staff},
    permissions::PermissionCode,
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// 各后台路由所需的权限集, 空集表示仅要求有效员工凭证
const STAFF_ONLY: &[PermissionCode] = &[];
const READ_USERS: &[PermissionCode] = &[PermissionCode::RUser];
const CREATE_USERS: &[PermissionCode] = &[PermissionCode::CUser];
const UPDATE_USERS: &[PermissionCode] = &[PermissionCode::UUser];
const MANAGE_PERMISSIONS: &[PermissionCode] = &[PermissionCode::UPermission];
const READ_PERMISSIONS: &[PermissionCode] = &[PermissionCode::RPermission];
const READ_CHATS: &[PermissionCode] = &[PermissionCode::RChat];
const UPDATE_CHATS: &[PermissionCode] = &[PermissionCode::RChat, PermissionCode::UChat];
const READ_MESSAGES: &[PermissionCode] = &[PermissionCode::RMessage];

/// 整个 multipart 请求体的上限, 单个附件的 20 MiB 上限另行校验
const UPLOAD_BODY_LIMIT: usize = 128 * 1024 * 1024;

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'helpdesk_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 应用迁移
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // 附件存储目录
    let files = FileStorage::new(config.files_path.clone());
    files
        .ensure_root()
        .await
        .expect("Failed to create files directory");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client);

    // 初始员工账号, 始终持有全部权限
    UserOperation::new(&pool)
        .ensure_init_user(&config.first_user_email, &config.first_user_password)
        .await
        .expect("Failed to bootstrap the initial staff user");

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc.clone(),
        files,
    };

    // 设置限流器
    let rate_limiter = Arc::new(RateLimiter::new(redis_arc, config.clone()));

    // 访客接口, 身份一律来自聊天会话 cookie
    let visitor_routes = Router::new()
        .route(
            "/",
            post(routes::messages::create_message).get(routes::messages::list_messages),
        )
        .route("/files/{file_uid}/", get(routes::messages::download_file))
        .route("/ws/", get(routes::events::chat_events))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            rate_limit,
        ));

    // 后台公开路由
    let admin_public = Router::new()
        .route("/auth/", get(routes::auth::login_page))
        .route("/auth/login/", post(routes::auth::login));

    // 后台受保护路由. 同一路径不同方法可以挂不同的权限网关,
    // 重复注册时由路由器按方法合并
    let admin_protected = Router::new()
        .route(
            "/",
            get(routes::auth::home).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), STAFF_ONLY),
                require_staff,
            )),
        )
        .route(
            "/auth/logout/",
            post(routes::auth::logout).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), STAFF_ONLY),
                require_staff,
            )),
        )
        .route(
            "/ws/",
            get(routes::events::admin_events).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), STAFF_ONLY),
                require_staff,
            )),
        )
        .route(
            "/api/users/",
            get(routes::users::list_users).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), READ_USERS),
                require_staff,
            )),
        )
        .route(
            "/api/users/",
            post(routes::users::create_user).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), CREATE_USERS),
                require_staff,
            )),
        )
        .route(
            "/api/users/{user_uid}/",
            get(routes::users::get_user).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), READ_USERS),
                require_staff,
            )),
        )
        .route(
            "/api/users/{user_uid}/",
            patch(routes::users::update_user).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), UPDATE_USERS),
                require_staff,
            )),
        )
        .route(
            "/api/users/{user_uid}/permissions/",
            patch(routes::users::update_user_permissions).route_layer(
                axum::middleware::from_fn_with_state(
                    (state.clone(), MANAGE_PERMISSIONS),
                    require_staff,
                ),
            ),
        )
        .route(
            "/api/permissions/",
            get(routes::users::list_permission_meta).route_layer(
                axum::middleware::from_fn_with_state(
                    (state.clone(), READ_PERMISSIONS),
                    require_staff,
                ),
            ),
        )
        .route(
            "/api/chats/",
            get(routes::chats::list_chats).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), READ_CHATS),
                require_staff,
            )),
        )
        .route(
            "/api/chats/{chat_uid}/",
            get(routes::chats::get_chat).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), READ_CHATS),
                require_staff,
            )),
        )
        .route(
            "/api/chats/{chat_uid}/",
            patch(routes::chats::update_chat).route_layer(axum::middleware::from_fn_with_state(
                (state.clone(), UPDATE_CHATS),
                require_staff,
            )),
        )
        .route(
            "/api/chats/{chat_uid}/messages/",
            get(routes::chats::list_chat_messages).route_layer(
                axum::middleware::from_fn_with_state((state.clone(), READ_MESSAGES), require_staff),
            ),
        )
        .route(
            "/api/chats/{chat_uid}/messages/",
            post(routes::chats::create_chat_message).route_layer(
                axum::middleware::from_fn_with_state((state.clone(), READ_CHATS), require_staff),
            ),
        )
        .route(
            "/api/chats/{chat_uid}/files/{file_uid}/",
            get(routes::chats::download_chat_file).route_layer(
                axum::middleware::from_fn_with_state((state.clone(), READ_CHATS), require_staff),
            ),
        );

    // 组装路由
    let router = Router::new()
        .nest("/api/messages", visitor_routes)
        .nest("/admin", admin_public.merge(admin_protected));

    // 站点级中间件: CSRF 校验与 5xx 日志
    let router = router
        .layer(axum::middleware::from_fn(csrf_protect))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        // 设置开发环境的CORS，允许所有来源
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
