// ==========================================
// 统计数据抽取 - 工作表元数据
// ==========================================
// 由 LayoutInference 每次 metadata() 重新计算，不可变
// 坐标: 行列均为 1 起始（与工作簿读取器一致）
// ==========================================

use crate::domain::unit::UnitDefinition;
use serde::{Deserialize, Serialize};

/// 年份列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearColumn {
    pub label: i32,
    pub column: u32,
}

/// 地区行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRow {
    pub label: String,
    pub row: u32,
}

// ==========================================
// SheetLayout - 受支持工作表的版式
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub label: String,            // 去掉后缀标签的展示名
    pub unit: UnitDefinition,     // 表头单位
    pub years: Vec<YearColumn>,   // 连续年份列
    pub regions: Vec<RegionRow>,  // 地区行（跳过空行）
    pub header_row: u32,          // 年份表头所在行
}

// ==========================================
// SheetMetadata - 工作表元数据
// ==========================================
// 用途: 不受支持的工作表仅保留 type / index，调用方必须跳过
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetMetadata {
    pub sheet_type: String,          // 原始工作表名（过滤键）
    pub sheet_index: usize,          // 工作表序号
    pub layout: Option<SheetLayout>, // None = 不受支持
}

impl SheetMetadata {
    pub fn unsupported(sheet_type: impl Into<String>, sheet_index: usize) -> Self {
        Self {
            sheet_type: sheet_type.into(),
            sheet_index,
            layout: None,
        }
    }

    pub fn supported(&self) -> bool {
        self.layout.is_some()
    }
}
