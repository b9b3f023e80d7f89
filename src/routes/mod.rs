pub mod comments;
pub mod notifications;
pub mod playlists;
pub mod search;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;
pub mod watch_history;
