// ==========================================
// 统计数据抽取 - 知识库访问上下文
// ==========================================
// 职责: 打开共享数据库连接，装配配置管理器与缓存仓储，创建解析器
// 存储: 同一 SQLite 文件（config_kv + linked_data_cache）
// ==========================================

use crate::config::config_manager::{ConfigManager, LinkedDataSettings};
use crate::db::{open_in_memory, open_sqlite_connection};
use crate::importer::error::ImportResult;
use crate::linked_data::wikidata_resolver::WikidataResolver;
use crate::repository::linked_data_cache_repo::LinkedDataCacheRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct LinkedDataContext {
    conn: Arc<Mutex<Connection>>,
    config_manager: ConfigManager,
}

impl LinkedDataContext {
    /// 打开数据库文件（不存在则创建）
    pub fn open(db_path: &str) -> ImportResult<Self> {
        info!(db_path, "打开知识库缓存数据库");
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 内存数据库（测试 / 一次性运行）
    pub fn in_memory() -> ImportResult<Self> {
        let conn = open_in_memory()?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        let config_manager = ConfigManager::from_connection(conn.clone());
        Self {
            conn,
            config_manager,
        }
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    pub fn settings(&self) -> ImportResult<LinkedDataSettings> {
        self.config_manager.get_linked_data_settings()
    }

    pub fn cache(&self) -> LinkedDataCacheRepository {
        LinkedDataCacheRepository::from_connection(self.conn.clone())
    }

    /// 按当前配置创建 HTTP 解析器
    pub fn resolver(&self) -> ImportResult<WikidataResolver> {
        WikidataResolver::new(self.settings()?, self.cache())
    }
}
