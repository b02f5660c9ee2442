// ==========================================
// 统计数据抽取 - 引擎层
// ==========================================
// 职责: 单位归一化、换算表、版式推断、数据行组装、JSON-stat 展开
// 红线: 引擎不做网络 I/O；知识库访问经 LinkedDataResolver 注入
// ==========================================

pub mod assembler;
pub mod conversion_table;
pub mod json_stat;
pub mod layout;
pub mod property;
pub mod unit_parser;

// 重导出核心类型
pub use assembler::{AssembledRows, DatasourceAssembler, DatasourceFilters, DatasourceQuery};
pub use conversion_table::{ConversionTable, ConversionTableLoader, ConversionTables};
pub use layout::{sheet_label, LayoutInference};
pub use property::standardize_property;
pub use unit_parser::{normalize_unit, UnitParser};
