use crate::{
    config::Config,
    services::{
        auth::AuthService,
        comment::CommentService,
        database::Database,
        like::LikeService,
        notification::NotificationService,
        playlist::PlaylistService,
        search::SearchService,
        subscription::SubscriptionService,
        tweet::TweetService,
        user::UserService,
        video::VideoService,
        watch_history::WatchHistoryService,
    },
};

/// 应用程序的共享状态
/// 包含所有服务和配置的引用
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 数据库连接
    pub db: Database,

    /// 认证服务
    pub auth_service: AuthService,

    /// 频道资料服务
    pub user_service: UserService,

    /// 视频服务
    pub video_service: VideoService,

    /// 评论服务
    pub comment_service: CommentService,

    /// 动态服务
    pub tweet_service: TweetService,

    /// 点赞服务
    pub like_service: LikeService,

    /// 播放列表服务
    pub playlist_service: PlaylistService,

    /// 订阅服务
    pub subscription_service: SubscriptionService,

    /// 通知服务
    pub notification_service: NotificationService,

    /// 观看历史服务
    pub watch_history_service: WatchHistoryService,

    /// 搜索服务
    pub search_service: SearchService,
}

impl AppState {
    /// 解析分页参数，未给出时用默认页大小，并钳制到上限
    pub fn page_params(&self, page: Option<usize>, limit: Option<usize>) -> (usize, usize) {
        let page = page.unwrap_or(1).max(1);
        let limit = limit
            .unwrap_or(self.config.default_page_size)
            .clamp(1, self.config.max_page_size);
        (page, limit)
    }

    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }
}
