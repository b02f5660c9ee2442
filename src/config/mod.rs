// ==========================================
// 统计数据抽取 - 配置层
// ==========================================
// 职责: 知识库访问参数管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

pub use config_manager::{config_keys, get_default_db_path, ConfigManager, LinkedDataSettings};
