// ==========================================
// 统计数据抽取 - 知识库查询缓存仓储
// ==========================================
// 职责: linked_data_cache 表的读写（namespace + key → JSON 值）
// 红线: 缓存的 null 表示“已查询、无结果”，与“未缓存”严格区分
// 红线: Repository 不含业务逻辑
// ==========================================
// namespace 约定:
// - properties              属性 ID → 属性名
// - items                   实体 ID → {name, description, <属性名>: 值}
// - regions/name            地区名 → Entity | null
// - regions/code            地区代码 → Entity | null
// - fromAlias/<语言>/<类别>  别名代码 → [Entity]
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub const NAMESPACE_PROPERTIES: &str = "properties";
pub const NAMESPACE_ITEMS: &str = "items";
pub const NAMESPACE_REGION_NAMES: &str = "regions/name";
pub const NAMESPACE_REGION_CODES: &str = "regions/code";

/// 别名查询的 namespace
pub fn from_alias_namespace(lang: &str, instance_of: &str) -> String {
    format!("fromAlias/{}/{}", lang, instance_of)
}

// ==========================================
// LinkedDataCacheRepository
// ==========================================
pub struct LinkedDataCacheRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LinkedDataCacheRepository {
    /// 打开（或创建）缓存数据库
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存缓存（进程结束即丢弃）
    pub fn in_memory() -> ImportResult<Self> {
        let conn = crate::db::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 共用连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> ImportResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::CacheError(format!("缓存锁获取失败: {}", e)))
    }

    /// 读取缓存
    ///
    /// # 返回
    /// - Ok(None): 未缓存
    /// - Ok(Some(Value::Null)): 已缓存的“无结果”
    /// - Ok(Some(v)): 缓存值
    pub fn get(&self, namespace: &str, key: &str) -> ImportResult<Option<Value>> {
        let conn = self.get_conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM linked_data_cache WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| ImportError::CacheCorrupted {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// 写入缓存（覆盖）
    pub fn put(&self, namespace: &str, key: &str, value: &Value) -> ImportResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO linked_data_cache (namespace, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![namespace, key, value.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// 删除一个 namespace 下的全部缓存，返回删除条数
    pub fn clear_namespace(&self, namespace: &str) -> ImportResult<usize> {
        let conn = self.get_conn()?;
        let count = conn.execute(
            "DELETE FROM linked_data_cache WHERE namespace = ?1",
            params![namespace],
        )?;
        Ok(count)
    }

    pub fn count(&self, namespace: &str) -> ImportResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM linked_data_cache WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
