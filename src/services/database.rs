use crate::config::Config;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Debug;
use surrealdb::engine::remote::http::{Client, Http};
use surrealdb::opt::auth::Root;
use surrealdb::{Response, Surreal};
use tracing::{debug, error, info};

/// 启动时应用的表结构定义（唯一索引等）
const SCHEMA: &str = include_str!("../../schema.surrealql");

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    pub client: Surreal<Client>,
    pub config: Config,
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let client = Surreal::new::<Http>(config.database_url.as_str()).await?;

        client
            .signin(Root {
                username: &config.database_username,
                password: &config.database_password,
            })
            .await?;

        client
            .use_ns(&config.database_namespace)
            .use_db(&config.database_name)
            .await?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.client.query("INFO FOR DB").await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    /// 应用表结构定义（幂等）
    pub async fn init_schema(&self) -> Result<()> {
        self.client.query(SCHEMA).await?;
        info!("Database schema applied");
        Ok(())
    }

    /// 执行原始查询
    pub async fn query(&self, sql: &str) -> Result<Response> {
        self.client.query(sql).await.map_err(AppError::from)
    }

    /// 执行带命名参数的查询
    pub async fn query_with_params<P>(&self, sql: &str, params: P) -> Result<Response>
    where
        P: Serialize + 'static,
    {
        self.client
            .query(sql)
            .bind(params)
            .await
            .map_err(AppError::from)
    }

    /// 创建记录。实体自带纯 UUID 的 `id` 字段，SurrealDB 以其作为记录 ID，
    /// 因此后续查询里 `meta::id(id)` 还原出同一个字符串。
    pub async fn create<T>(&self, table: &str, data: &T) -> Result<()>
    where
        T: Serialize + Send + Sync + Debug,
    {
        debug!("Creating record in table: {}", table);
        self.query_with_params(
            "CREATE type::table($table) CONTENT $data",
            json!({
                "table": table,
                "data": data,
            }),
        )
        .await?
        .check()?;
        Ok(())
    }

    /// 通过ID获取单个记录
    pub async fn get_by_id<T>(&self, table: &str, id: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        // 去掉可能携带的 table 前缀
        let prefix = format!("{}:", table);
        let pure_id = id.strip_prefix(&prefix).unwrap_or(id);

        let mut response = self
            .query_with_params(
                "SELECT *, meta::id(id) AS id FROM type::thing($table, $id)",
                json!({ "table": table, "id": pure_id }),
            )
            .await?;
        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }

    /// 通过ID合并更新记录并返回更新后的完整记录
    pub async fn update_by_id_with_json<T>(
        &self,
        table: &str,
        id: &str,
        updates: serde_json::Value,
    ) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        self.query_with_params(
            "UPDATE type::thing($table, $id) MERGE $updates",
            json!({ "table": table, "id": id, "updates": updates }),
        )
        .await?
        .check()?;
        self.get_by_id(table, id).await
    }

    /// 通过ID删除记录
    pub async fn delete_by_id(&self, table: &str, id: &str) -> Result<()> {
        self.query_with_params(
            "DELETE type::thing($table, $id)",
            json!({ "table": table, "id": id }),
        )
        .await?
        .check()?;
        Ok(())
    }

    /// 按单字段查找单个记录
    pub async fn find_one<T>(&self, table: &str, field: &str, value: &str) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de> + Send + Sync + Debug,
    {
        let sql = format!(
            "SELECT *, meta::id(id) AS id FROM type::table($table) WHERE {} = $value LIMIT 1",
            field
        );
        let mut response = self
            .query_with_params(&sql, json!({ "table": table, "value": value }))
            .await?;
        let results: Vec<T> = response.take(0)?;
        Ok(results.into_iter().next())
    }
}

/// 分页结果结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
}

impl<T> PaginatedResult<T> {
    /// 由完整计数和当前页数据组装分页信封。页码从 1 开始，
    /// 越界页返回空列表而不是错误。
    pub fn new(data: Vec<T>, total: usize, page: usize, per_page: usize) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            has_next_page: page < total_pages,
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_envelope() {
        let p = PaginatedResult::new(vec![1, 2, 3], 45, 1, 20);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);

        let last = PaginatedResult::<i32>::new(vec![], 45, 3, 20);
        assert!(!last.has_next_page);
    }

    #[test]
    fn test_pagination_out_of_range_page() {
        // 正好整除时不存在第 2 页
        let p = PaginatedResult::<i32>::new(vec![], 20, 2, 20);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next_page);
        assert!(p.data.is_empty());
    }
}
