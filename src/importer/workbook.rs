// ==========================================
// 统计数据抽取 - 工作簿读取器
// ==========================================
// 支持: Excel (.xlsx/.xls) / ODS，经 calamine 一次性载入内存
// 坐标: 行列均为 1 起始
// ==========================================

use crate::domain::types::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::{debug, info};

// ==========================================
// Workbook Trait
// ==========================================
// 用途: 核心只通过随机单元格读取访问工作簿
// 实现者: CalamineWorkbook, MemoryWorkbook
pub trait Workbook {
    /// 工作表名（按工作簿顺序）
    fn sheet_names(&self) -> Vec<String>;

    /// 读取单元格；越界返回 CellValue::Empty
    fn cell(&self, sheet_index: usize, row: u32, column: u32) -> CellValue;

    /// 工作表已用区域的 (行数, 列数)，从 1 计
    fn dimensions(&self, sheet_index: usize) -> (u32, u32);

    /// 按名称查找工作表序号
    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheet_names().iter().position(|n| n == name)
    }
}

// ==========================================
// CalamineWorkbook - 基于 calamine 的实现
// ==========================================
pub struct CalamineWorkbook {
    sheets: Vec<(String, Range<Data>)>,
}

impl CalamineWorkbook {
    /// 打开工作簿并载入所有工作表
    pub fn open<P: AsRef<Path>>(file_path: P) -> ImportResult<Self> {
        let path = file_path.as_ref();

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name)?;
            debug!(sheet = %name, size = ?range.get_size(), "载入工作表");
            sheets.push((name, range));
        }

        info!(file_path = %path.display(), sheets = sheets.len(), "工作簿载入完成");
        Ok(Self { sheets })
    }

    fn convert(data: &Data) -> CellValue {
        match data {
            Data::Empty => CellValue::Empty,
            Data::Int(v) => CellValue::Int(*v),
            // xlsx 中数值统一存为浮点；整数值按整数返回，年份表头依赖此行为
            Data::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => CellValue::Int(*v as i64),
            Data::Float(v) => CellValue::Float(*v),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Error(e.to_string()),
        }
    }
}

impl Workbook for CalamineWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn cell(&self, sheet_index: usize, row: u32, column: u32) -> CellValue {
        if row == 0 || column == 0 {
            return CellValue::Empty;
        }
        self.sheets
            .get(sheet_index)
            .and_then(|(_, range)| range.get_value((row - 1, column - 1)))
            .map(Self::convert)
            .unwrap_or(CellValue::Empty)
    }

    fn dimensions(&self, sheet_index: usize) -> (u32, u32) {
        self.sheets
            .get(sheet_index)
            .and_then(|(_, range)| range.end())
            .map(|(r, c)| (r + 1, c + 1))
            .unwrap_or((0, 0))
    }
}

// ==========================================
// MemoryWorkbook - 内存网格实现
// ==========================================
// 用途: 调用方已预载单元格时直接构建；测试夹具
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<MemorySheet>,
}

#[derive(Debug, Clone, Default)]
struct MemorySheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加工作表，返回其序号
    pub fn add_sheet(&mut self, name: impl Into<String>) -> usize {
        self.sheets.push(MemorySheet {
            name: name.into(),
            rows: Vec::new(),
        });
        self.sheets.len() - 1
    }

    /// 写入单元格（1 起始坐标，自动扩展网格）
    pub fn set_cell(&mut self, sheet_index: usize, row: u32, column: u32, value: impl Into<CellValue>) {
        assert!(row > 0 && column > 0, "单元格坐标从 1 开始");
        let sheet = &mut self.sheets[sheet_index];
        let (r, c) = ((row - 1) as usize, (column - 1) as usize);
        if sheet.rows.len() <= r {
            sheet.rows.resize(r + 1, Vec::new());
        }
        let cells = &mut sheet.rows[r];
        if cells.len() <= c {
            cells.resize(c + 1, CellValue::Empty);
        }
        cells[c] = value.into();
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn cell(&self, sheet_index: usize, row: u32, column: u32) -> CellValue {
        if row == 0 || column == 0 {
            return CellValue::Empty;
        }
        self.sheets
            .get(sheet_index)
            .and_then(|s| s.rows.get((row - 1) as usize))
            .and_then(|cells| cells.get((column - 1) as usize))
            .cloned()
            .unwrap_or(CellValue::Empty)
    }

    fn dimensions(&self, sheet_index: usize) -> (u32, u32) {
        match self.sheets.get(sheet_index) {
            Some(sheet) => {
                let rows = sheet.rows.len() as u32;
                let columns = sheet.rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
                (rows, columns)
            }
            None => (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_workbook_roundtrip() {
        let mut wb = MemoryWorkbook::new();
        let idx = wb.add_sheet("Contents");
        wb.set_cell(idx, 3, 2, 1965);
        wb.set_cell(idx, 5, 1, "Canada");

        assert_eq!(wb.sheet_names(), vec!["Contents".to_string()]);
        assert_eq!(wb.cell(idx, 3, 2), CellValue::Int(1965));
        assert_eq!(wb.cell(idx, 5, 1), CellValue::Text("Canada".to_string()));
        assert_eq!(wb.cell(idx, 100, 100), CellValue::Empty);
        assert_eq!(wb.cell(7, 1, 1), CellValue::Empty);
        assert_eq!(wb.dimensions(idx), (5, 2));
        assert_eq!(wb.sheet_index("Contents"), Some(0));
    }

    #[test]
    fn test_calamine_integral_float_is_int() {
        assert_eq!(CalamineWorkbook::convert(&Data::Float(1965.0)), CellValue::Int(1965));
        assert_eq!(CalamineWorkbook::convert(&Data::Float(-3.0)), CellValue::Int(-3));
    }

    #[test]
    fn test_calamine_fractional_float_stays_float() {
        assert_eq!(CalamineWorkbook::convert(&Data::Float(1965.5)), CellValue::Float(1965.5));
        assert_eq!(CalamineWorkbook::convert(&Data::Float(1e16)), CellValue::Float(1e16));
    }

    #[test]
    fn test_calamine_text_and_empty() {
        assert_eq!(CalamineWorkbook::convert(&Data::Empty), CellValue::Empty);
        assert_eq!(
            CalamineWorkbook::convert(&Data::String("Exajoules".to_string())),
            CellValue::Text("Exajoules".to_string())
        );
        assert_eq!(CalamineWorkbook::convert(&Data::Int(2021)), CellValue::Int(2021));
    }

    #[test]
    fn test_calamine_workbook_file_not_found() {
        let result = CalamineWorkbook::open("non_existent.xlsx");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_calamine_workbook_rejects_extension() {
        let temp = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let result = CalamineWorkbook::open(temp.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
