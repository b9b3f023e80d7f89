use crate::{config::Config, error::{AppError, Result}};
use axum::{
    async_trait,
    extract::FromRequestParts,
    headers::{authorization::Bearer, Authorization},
    http::request::Parts,
    Extension,
    RequestPartsExt, TypedHeader,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct AuthService {
    config: Config,
    http_client: Client,
    user_cache: Arc<RwLock<HashMap<String, CachedUser>>>,
}

#[derive(Debug, Clone)]
struct CachedUser {
    user: User,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // 用户ID
    pub exp: i64,           // 过期时间
    pub iat: i64,           // 签发时间
    pub email: Option<String>,
}

/// 通过身份服务解析出的已认证用户
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityUserResponse {
    id: String,
    email: String,
    username: Option<String>,
    email_verified: bool,
    profile: Option<IdentityProfileResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdentityProfileResponse {
    display_name: Option<String>,
    avatar_url: Option<String>,
}

impl AuthService {
    pub async fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: config.clone(),
            http_client,
            user_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn verify_jwt(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_ref());
        let validation = Validation::new(Algorithm::HS256);

        match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(token_data) => {
                debug!("JWT token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("JWT verification failed: {}", e);
                Err(AppError::Authentication("Invalid token".to_string()))
            }
        }
    }

    /// 从身份服务获取用户信息，带 15 分钟内存缓存
    pub async fn get_user(&self, user_id: &str, token: &str) -> Result<User> {
        if let Some(cached_user) = self.get_cached_user(user_id).await {
            debug!("Using cached user data for user: {}", user_id);
            return Ok(cached_user);
        }

        let url = format!("{}/api/users/me", self.config.auth_service_url);

        let response = self.http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to fetch user from identity service: {}", e);
                AppError::ExternalService("Failed to verify user with identity service".to_string())
            })?;

        if !response.status().is_success() {
            warn!("Identity service returned error status: {}", response.status());
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let user_data: IdentityUserResponse = response.json().await
            .map_err(|e| {
                error!("Failed to parse identity service response: {}", e);
                AppError::Authentication("Invalid response from identity service".to_string())
            })?;

        let user = User {
            id: user_data.id.clone(),
            email: user_data.email,
            username: user_data.username,
            display_name: user_data.profile.as_ref().and_then(|p| p.display_name.clone()),
            avatar_url: user_data.profile.as_ref().and_then(|p| p.avatar_url.clone()),
            is_verified: user_data.email_verified,
        };

        self.cache_user(&user_data.id, user.clone()).await;

        Ok(user)
    }

    async fn get_cached_user(&self, user_id: &str) -> Option<User> {
        let cache = self.user_cache.read().await;
        if let Some(cached) = cache.get(user_id) {
            if cached.expires_at > Utc::now() {
                return Some(cached.user.clone());
            }
        }
        None
    }

    async fn cache_user(&self, user_id: &str, user: User) {
        let mut cache = self.user_cache.write().await;
        cache.insert(user_id.to_string(), CachedUser {
            user,
            expires_at: Utc::now() + Duration::minutes(15),
        });
    }

    /// 清理过期的用户缓存条目
    pub async fn cleanup_expired_sessions(&self) -> Result<()> {
        let now = Utc::now();
        let mut user_cache = self.user_cache.write().await;
        let before_count = user_cache.len();
        user_cache.retain(|_, cached| cached.expires_at > now);
        debug!("Cleaned {} expired user cache entries", before_count - user_cache.len());
        Ok(())
    }
}

// Axum extractor for authentication
#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        // 认证中间件已把用户放进请求扩展
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }

        // 中间件未覆盖的路径上直接验证 Bearer token
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing authorization header".to_string()))?;

        let Extension(auth_service): Extension<AuthService> = parts
            .extract::<Extension<AuthService>>()
            .await
            .map_err(|_| AppError::Internal("Auth service not found in request extensions".to_string()))?;

        let claims = auth_service.verify_jwt(bearer.token())?;
        auth_service.get_user(&claims.sub, bearer.token()).await
    }
}
