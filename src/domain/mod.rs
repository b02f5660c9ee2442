// ==========================================
// 统计数据抽取 - 领域模型层
// ==========================================
// 职责: 定义单位、工作表元数据、输出表格、知识库实体
// 红线: 不含 I/O，不含引擎逻辑
// ==========================================

pub mod entity;
pub mod sheet;
pub mod table;
pub mod types;
pub mod unit;

// 重导出核心类型
pub use entity::{Entity, ItemRequest};
pub use sheet::{RegionRow, SheetLayout, SheetMetadata, YearColumn};
pub use table::{DataRow, DataTable};
pub use types::{CellValue, FieldValue, UnitMode};
pub use unit::{CanonicalUnit, UnitDefinition};
