// ==========================================
// 统计数据抽取 - 导入层
// ==========================================
// 职责: 外部数据读取（工作簿 / 压缩包文本 / HTTP JSON）
// 红线: 只做 I/O，不做单位/版式推断
// ==========================================

// 模块声明
pub mod archive_reader;
pub mod error;
pub mod http_client;
pub mod workbook;

// 重导出核心类型
pub use archive_reader::ArchiveReader;
pub use error::{ImportError, ImportResult};
pub use http_client::HttpClient;
pub use workbook::{CalamineWorkbook, MemoryWorkbook, Workbook};
