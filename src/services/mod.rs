pub mod database;
pub mod auth;
pub mod user;
pub mod video;
pub mod comment;
pub mod tweet;
pub mod like;
pub mod playlist;
pub mod subscription;
pub mod notification;
pub mod watch_history;
pub mod search;

// 重新导出常用类型
pub use database::Database;
pub use auth::AuthService;
pub use user::UserService;
pub use video::VideoService;
pub use comment::CommentService;
pub use tweet::TweetService;
pub use like::LikeService;
pub use playlist::PlaylistService;
pub use subscription::SubscriptionService;
pub use notification::NotificationService;
pub use watch_history::WatchHistoryService;
pub use search::SearchService;
