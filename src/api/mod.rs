// ==========================================
// 统计数据抽取 - API 层
// ==========================================
// 职责: 各数据源的对外接口，统一输出 DataTable
// ==========================================

pub mod context;
pub mod energy_api;
pub mod ofs_api;
pub mod wikidata_api;
pub mod worldbank_api;

// 重导出核心类型
pub use context::LinkedDataContext;
pub use energy_api::EnergyDatasource;
pub use ofs_api::{DimensionEnrichment, OfsDatasource};
pub use wikidata_api::{ClassQuery, WikidataDatasource};
pub use worldbank_api::WorldBankDatasource;
