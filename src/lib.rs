// ==========================================
// 统计数据抽取 - 核心库
// ==========================================
// 数据源: 能源统计工作簿 / 统计局 JSON-stat / 世界银行压缩包 / 知识库
// 输出: 统一的扁平表格（值 + 维度列）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 单位、版式、表格、实体
pub mod domain;

// 导入层 - 工作簿 / 压缩包 / HTTP
pub mod importer;

// 引擎层 - 单位归一化与版式推断
pub mod engine;

// 知识库关联层
pub mod linked_data;

// 数据仓储层 - 知识库查询缓存
pub mod repository;

// 配置层
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 数据源接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    CanonicalUnit, CellValue, DataRow, DataTable, Entity, FieldValue, SheetMetadata,
    UnitDefinition, UnitMode,
};

pub use engine::{
    ConversionTables, DatasourceFilters, DatasourceQuery, LayoutInference, UnitParser,
};

pub use importer::{ImportError, ImportResult, Workbook};

pub use linked_data::{EnrichmentOptions, LinkedDataResolver, WikidataResolver};

pub use api::{
    ClassQuery, DimensionEnrichment, EnergyDatasource, LinkedDataContext, OfsDatasource,
    WikidataDatasource, WorldBankDatasource,
};

// ==========================================
// 常量定义
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "shifter-stats";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
