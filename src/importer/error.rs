// ==========================================
// 统计数据抽取 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 文件 / 版式 / 单位语法 / HTTP / 缓存 / 配置
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.ods/.zip）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("压缩包读取失败: {0}")]
    ArchiveError(String),

    // ===== 版式错误（输入与版式假设不一致）=====
    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error("版式不匹配 (工作表 {sheet}, 行 {row}, 列 {column}): {message}")]
    LayoutMismatch {
        sheet: String,
        row: u32,
        column: u32,
        message: String,
    },

    #[error("换算表缺少换算系数: {from} -> {to}")]
    MissingConversionFactor { from: String, to: String },

    #[error("数值格式错误 (行 {row}, 列 {column}): {value}")]
    ValueFormatError {
        row: usize,
        column: usize,
        value: String,
    },

    // ===== 单位语法错误 =====
    #[error("复合单位 {unit} 的{operand}带有限定后缀 {postfix}")]
    UnitQualifierInOperand {
        unit: String,
        operand: &'static str,
        postfix: String,
    },

    #[error("单位格式错误 ({unit}): {message}")]
    MalformedUnit { unit: String, message: String },

    #[error("单位换算系数非法 ({unit}): {factor}")]
    InvalidScaleFactor { unit: String, factor: f64 },

    // ===== HTTP 错误 =====
    #[error("HTTP 请求失败 ({url}): 状态码 {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP 传输失败: {0}")]
    HttpTransport(String),

    #[error("响应格式错误 ({url}): {message}")]
    ResponseFormat { url: String, message: String },

    // ===== 缓存 / 数据库错误 =====
    #[error("缓存读写失败: {0}")]
    CacheError(String),

    #[error("缓存内容损坏 (namespace: {namespace}, key: {key}): {message}")]
    CacheCorrupted {
        namespace: String,
        key: String,
        message: String,
    },

    // ===== 配置错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 查询参数错误 =====
    #[error("查询参数非法: {0}")]
    InvalidFilter(String),

    #[error("请求了知识库补充列，但未提供解析器")]
    ResolverMissing,

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<zip::result::ZipError>
impl From<zip::result::ZipError> for ImportError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::FileNotFound => {
                ImportError::ArchiveError("压缩包内未找到目标文件".to_string())
            }
            _ => ImportError::ArchiveError(err.to_string()),
        }
    }
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for ImportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ImportError::HttpStatus {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                status: status.as_u16(),
            },
            None => ImportError::HttpTransport(err.to_string()),
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::CacheError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::InternalError(format!("JSON 处理失败: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
