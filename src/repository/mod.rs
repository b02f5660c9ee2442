// ==========================================
// 统计数据抽取 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod linked_data_cache_repo;

pub use linked_data_cache_repo::LinkedDataCacheRepository;
