use std::sync::Arc;
use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, Router},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tokio::time::Duration;

mod config;
mod error;
mod models;
mod routes;
mod services;
mod state;
mod utils;

use crate::{
    config::Config,
    services::{
        AuthService,
        CommentService,
        Database,
        LikeService,
        NotificationService,
        PlaylistService,
        SearchService,
        SubscriptionService,
        TweetService,
        UserService,
        VideoService,
        WatchHistoryService,
    },
    state::AppState,
    utils::sweeper::Sweeper,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("LOG_LEVEL").unwrap_or_else(|_| "videotube=debug,tower_http=debug".into())
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting VideoTube service...");

    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化数据库连接
    let db = match Database::new(&config).await {
        Ok(db) => {
            db.verify_connection().await?;
            db.init_schema().await?;
            info!("Database connection established successfully");
            Arc::new(db)
        }
        Err(e) => {
            error!("Failed to create database connection: {}", e);
            return Err(anyhow::anyhow!("Database initialization failed"));
        }
    };

    // 初始化所有服务
    let auth_service = AuthService::new(&config).await?;
    let user_service = UserService::new(db.clone()).await?;
    let notification_service = NotificationService::new(db.clone(), &config).await?;
    let video_service = VideoService::new(db.clone(), notification_service.clone()).await?;
    let comment_service = CommentService::new(db.clone(), notification_service.clone()).await?;
    let tweet_service = TweetService::new(db.clone(), notification_service.clone()).await?;
    let like_service = LikeService::new(db.clone(), notification_service.clone()).await?;
    let playlist_service = PlaylistService::new(db.clone()).await?;
    let subscription_service = SubscriptionService::new(db.clone(), notification_service.clone()).await?;
    let watch_history_service = WatchHistoryService::new(db.clone()).await?;
    let search_service = SearchService::new(db.clone()).await?;

    // 创建应用状态
    let app_state = Arc::new(AppState {
        config: config.clone(),
        db: (*db).clone(),
        auth_service,
        user_service,
        video_service,
        comment_service,
        tweet_service,
        like_service,
        playlist_service,
        subscription_service,
        notification_service,
        watch_history_service,
        search_service,
    });

    // 启动后台任务
    let sweepers = start_background_tasks(app_state.clone());

    // 配置 CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(
            config.cors_allowed_origins
                .split(',')
                .map(|origin| origin.parse::<HeaderValue>().unwrap())
                .collect::<Vec<_>>(),
        );

    // 构建应用路由
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .nest("/api/v1/users", routes::users::router())
        .nest("/api/v1/videos", routes::videos::router())
        .nest("/api/v1/comments", routes::comments::router())
        .nest("/api/v1/tweets", routes::tweets::router())
        .nest("/api/v1/playlists", routes::playlists::router())
        .nest("/api/v1/subscriptions", routes::subscriptions::router())
        .nest("/api/v1/notifications", routes::notifications::router())
        .nest("/api/v1/history", routes::watch_history::router())
        .nest("/api/v1/search", routes::search::router())
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            utils::middleware::auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            utils::middleware::rate_limit_middleware,
        ))
        .layer(middleware::from_fn(utils::middleware::request_id_middleware))
        .layer(middleware::from_fn(utils::middleware::request_logging_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 停掉周期任务后退出
    for sweeper in &sweepers {
        sweeper.stop();
    }
    info!("VideoTube service stopped");

    Ok(())
}

async fn health_check() -> &'static str {
    "VideoTube is running!"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

/// 周期任务挂在显式的 Sweeper 上，关闭时可以确定性地停掉
fn start_background_tasks(app_state: Arc<AppState>) -> Vec<Sweeper> {
    info!("Starting background tasks...");

    // 过期通知清理任务
    let notification_sweeper = Sweeper::new("notification-expiry");
    let notification_state = app_state.clone();
    notification_sweeper.start(
        Duration::from_secs(app_state.config.notification_sweep_interval),
        move || {
            let state = notification_state.clone();
            async move {
                if let Err(e) = state.notification_service.delete_expired().await {
                    error!("Failed to sweep expired notifications: {}", e);
                }
            }
        },
    );

    // 清理过期认证缓存任务
    let auth_sweeper = Sweeper::new("auth-cache");
    let auth_state = app_state;
    auth_sweeper.start(Duration::from_secs(3600), move || {
        let state = auth_state.clone();
        async move {
            if let Err(e) = state.auth_service.cleanup_expired_sessions().await {
                error!("Failed to cleanup expired sessions: {}", e);
            }
        }
    });

    info!("Background tasks started successfully");
    vec![notification_sweeper, auth_sweeper]
}
