// ==========================================
// 统计数据抽取 - 配置管理器
// ==========================================
// 职责: 知识库访问参数的加载、查询、覆写
// 存储: config_kv 表（与查询缓存同库，scope_id = 'global'）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImportResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 缓存库路径环境变量
pub const DB_PATH_ENV: &str = "SHIFTER_CACHE_DB";

// ==========================================
// 默认值
// ==========================================
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
pub const DEFAULT_ENTITY_DATA_URL: &str = "https://www.wikidata.org/wiki/Special:EntityData/{id}.json";
pub const DEFAULT_USER_AGENT: &str = "shifter-stats/0.1 (statistics extraction)";
pub const DEFAULT_TIMEOUT_SECS: u64 = crate::importer::http_client::DEFAULT_TIMEOUT_SECS;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_QUERY_LIMIT: u32 = 10;

// ==========================================
// LinkedDataSettings - 知识库访问参数
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedDataSettings {
    pub sparql_endpoint: String,
    pub entity_data_url: String, // 含 {id} 占位符
    pub user_agent: String,
    pub timeout: Duration,
    pub language: String,
    pub query_limit: u32,
}

impl Default for LinkedDataSettings {
    fn default() -> Self {
        Self {
            sparql_endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            entity_data_url: DEFAULT_ENTITY_DATA_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            language: DEFAULT_LANGUAGE.to_string(),
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl LinkedDataSettings {
    /// 实体数据 URL
    pub fn entity_url(&self, id: &str) -> String {
        self.entity_data_url.replace("{id}", id)
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> ImportResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::CacheError(format!("锁获取失败: {}", e)))
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取配置值，带默认值
    pub fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> ImportResult<T>
    where
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ImportError::ConfigValueError {
                key: key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            }),
        }
    }

    // ===== 知识库访问参数 =====

    /// 读取知识库访问参数（缺失项取默认值）
    pub fn get_linked_data_settings(&self) -> ImportResult<LinkedDataSettings> {
        let timeout_secs = self.get_parsed(config_keys::REQUEST_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?;
        let query_limit = self.get_parsed(config_keys::QUERY_LIMIT, DEFAULT_QUERY_LIMIT)?;
        if query_limit == 0 {
            return Err(ImportError::ConfigValueError {
                key: config_keys::QUERY_LIMIT.to_string(),
                value: "0".to_string(),
                message: "必须大于 0".to_string(),
            });
        }

        Ok(LinkedDataSettings {
            sparql_endpoint: self
                .get_config_or_default(config_keys::SPARQL_ENDPOINT, DEFAULT_SPARQL_ENDPOINT)?,
            entity_data_url: self
                .get_config_or_default(config_keys::ENTITY_DATA_URL, DEFAULT_ENTITY_DATA_URL)?,
            user_agent: self.get_config_or_default(config_keys::USER_AGENT, DEFAULT_USER_AGENT)?,
            timeout: Duration::from_secs(timeout_secs),
            language: self.get_config_or_default(config_keys::LANGUAGE, DEFAULT_LANGUAGE)?,
            query_limit,
        })
    }
}

/// 默认缓存库路径
///
/// 顺序: 环境变量 SHIFTER_CACHE_DB → 用户缓存目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./linked_data.db");
    if let Some(cache_dir) = dirs::cache_dir() {
        path = cache_dir.join("shifter-stats").join("linked_data.db");
    }
    path.to_string_lossy().to_string()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // SPARQL / 实体数据
    pub const SPARQL_ENDPOINT: &str = "sparql_endpoint";
    pub const ENTITY_DATA_URL: &str = "entity_data_url";

    // HTTP
    pub const USER_AGENT: &str = "user_agent";
    pub const REQUEST_TIMEOUT_SECS: &str = "request_timeout_secs";

    // 查询
    pub const LANGUAGE: &str = "language";
    pub const QUERY_LIMIT: &str = "query_limit";
}
