// ==========================================
// 统计数据抽取 - 工作表版式推断
// ==========================================
// 职责: 判断工作表是否为 年份 × 地区 数据表，并定位年份列 / 地区行 / 单位
// 输入: Workbook + UnitParser
// 输出: Vec<SheetMetadata>（每次调用重新计算）
// ==========================================
// 版式假设:
// - 年份表头在第 3 或第 4 行，第 2 列起
// - 表头行第 1 列为单位
// - 地区从表头下方第 2 行起，位于第 1 列
// ==========================================

use crate::domain::sheet::{RegionRow, SheetLayout, SheetMetadata, YearColumn};
use crate::domain::types::CellValue;
use crate::engine::unit_parser::UnitParser;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::workbook::Workbook;
use tracing::{debug, info, instrument};

/// 年份表头候选行（按顺序探测）
pub const YEAR_PROBE_ROWS: [u32; 2] = [3, 4];
pub const YEAR_PROBE_COLUMN: u32 = 2;

/// 年份合法区间（开区间）
pub const MIN_YEAR_EXCLUSIVE: i64 = 1800;
pub const MAX_YEAR_EXCLUSIVE: i64 = 2100;

/// 地区扫描计数器超过该值即结束（遇到地区行清零）
pub const MAX_BLANK_REGION_ROWS: u32 = 5;

pub const UNIT_COLUMN: u32 = 1;
pub const REGION_COLUMN: u32 = 1;

/// 工作表名中的单位后缀（展示名去掉）
pub const SHEET_LABEL_SUFFIXES: &[&str] = &[
    " - TWh",
    " - EJ",
    " - PJ",
    " - Cons capita",
    " - Barrels",
    " - Tonnes",
    " - Kboed",
    " - Prices",
];

/// 工作表展示名：去掉首个命中的单位后缀
pub fn sheet_label(sheet_name: &str) -> String {
    SHEET_LABEL_SUFFIXES
        .iter()
        .find_map(|suffix| sheet_name.strip_suffix(suffix))
        .unwrap_or(sheet_name)
        .to_string()
}

fn is_year(value: &CellValue) -> bool {
    matches!(value, CellValue::Int(y) if *y > MIN_YEAR_EXCLUSIVE && *y < MAX_YEAR_EXCLUSIVE)
}

// ==========================================
// LayoutInference - 版式推断引擎
// ==========================================
pub struct LayoutInference<'a> {
    parser: &'a UnitParser,
}

impl<'a> LayoutInference<'a> {
    pub fn new(parser: &'a UnitParser) -> Self {
        Self { parser }
    }

    /// 推断工作簿中所有工作表
    #[instrument(skip(self, workbook))]
    pub fn infer_all<W: Workbook + ?Sized>(&self, workbook: &W) -> ImportResult<Vec<SheetMetadata>> {
        let names = workbook.sheet_names();
        let mut metadata = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            metadata.push(self.infer_sheet(workbook, index, name)?);
        }
        info!(
            sheets = metadata.len(),
            supported = metadata.iter().filter(|m| m.supported()).count(),
            "版式推断完成"
        );
        Ok(metadata)
    }

    /// 推断单个工作表
    ///
    /// # 边界处理
    /// - 探测行不是合法年份 → 不受支持（非错误）
    /// - 年份表头中的非整数单元格跳过
    /// - 地区列中的空单元格/纯空白文本视为空行
    /// - 单位单元格不是文本 → LayoutMismatch
    pub fn infer_sheet<W: Workbook + ?Sized>(
        &self,
        workbook: &W,
        sheet_index: usize,
        sheet_name: &str,
    ) -> ImportResult<SheetMetadata> {
        let header_row = match YEAR_PROBE_ROWS
            .iter()
            .copied()
            .find(|row| is_year(&workbook.cell(sheet_index, *row, YEAR_PROBE_COLUMN)))
        {
            Some(row) => row,
            None => {
                debug!(sheet = %sheet_name, "未找到年份表头，跳过");
                return Ok(SheetMetadata::unsupported(sheet_name, sheet_index));
            }
        };

        let (height, width) = workbook.dimensions(sheet_index);

        // ===== 年份列 =====
        let mut years = Vec::new();
        let mut column = YEAR_PROBE_COLUMN;
        while column <= width {
            if !workbook.cell(sheet_index, header_row - 1, column).is_empty() {
                break;
            }
            let cell = workbook.cell(sheet_index, header_row, column);
            if let CellValue::Int(year) = cell {
                match i32::try_from(year) {
                    Ok(label) if is_year(&cell) => years.push(YearColumn { label, column }),
                    _ => debug!(sheet = %sheet_name, column, value = year, "表头整数不是年份，跳过"),
                }
            }
            column += 1;
        }

        // ===== 地区行 =====
        let mut regions = Vec::new();
        let mut blank_rows = 0;
        let mut row = header_row + 2;
        while row <= height {
            let cell = workbook.cell(sheet_index, row, REGION_COLUMN);
            if !cell.is_empty() {
                blank_rows = 0;
                regions.push(RegionRow {
                    label: cell.to_string(),
                    row,
                });
            }
            // 地区行本身也计数: 地区后最多读 5 个空行，起始处最多读 6 个
            blank_rows += 1;
            if blank_rows > MAX_BLANK_REGION_ROWS {
                break;
            }
            row += 1;
        }

        // ===== 单位 =====
        let unit_text = match workbook.cell(sheet_index, header_row, UNIT_COLUMN) {
            CellValue::Text(text) => text,
            other => {
                return Err(ImportError::LayoutMismatch {
                    sheet: sheet_name.to_string(),
                    row: header_row,
                    column: UNIT_COLUMN,
                    message: format!("单位单元格不是文本: {:?}", other),
                })
            }
        };
        let unit = self.parser.definition(&unit_text)?;

        debug!(
            sheet = %sheet_name,
            header_row,
            years = years.len(),
            regions = regions.len(),
            unit = %unit.iso.display(),
            "工作表版式"
        );

        Ok(SheetMetadata {
            sheet_type: sheet_name.to_string(),
            sheet_index,
            layout: Some(SheetLayout {
                label: sheet_label(sheet_name),
                unit,
                years,
                regions,
                header_row,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::CanonicalUnit;
    use crate::importer::workbook::MemoryWorkbook;

    // ==========================================
    // 测试数据准备
    // ==========================================

    /// 年份表头在 header_row，第 2 列起 years 个年份，末尾带一个上方有文本的增长率列
    fn data_sheet(wb: &mut MemoryWorkbook, name: &str, header_row: u32, unit: &str, first_year: i32, years: u32) -> usize {
        let s = wb.add_sheet(name);
        wb.set_cell(s, 1, 1, name);
        wb.set_cell(s, header_row, 1, unit);
        for i in 0..years {
            wb.set_cell(s, header_row, 2 + i, first_year + i as i32);
        }
        wb.set_cell(s, header_row - 1, 2 + years, "Growth rate per annum");
        wb.set_cell(s, header_row, 2 + years, 2020);
        s
    }

    #[test]
    fn test_sheet_label() {
        assert_eq!(sheet_label("Oil Production - Barrels"), "Oil Production");
        assert_eq!(sheet_label("Primary Energy Consumption"), "Primary Energy Consumption");
        assert_eq!(sheet_label("Cobalt and Lithium - Prices"), "Cobalt and Lithium");
    }

    #[test]
    fn test_unsupported_without_year_header() {
        let mut wb = MemoryWorkbook::new();
        let s = wb.add_sheet("Contents");
        wb.set_cell(s, 3, 2, "Primary Energy");
        wb.set_cell(s, 4, 2, 1750);

        let parser = UnitParser::new();
        let metadata = LayoutInference::new(&parser).infer_all(&wb).unwrap();
        assert_eq!(metadata, vec![SheetMetadata::unsupported("Contents", 0)]);
    }

    #[test]
    fn test_year_columns_stop_at_annotated_column() {
        let mut wb = MemoryWorkbook::new();
        data_sheet(&mut wb, "Primary Energy Consumption", 3, "Exajoules", 1965, 5);

        let parser = UnitParser::new();
        let metadata = LayoutInference::new(&parser).infer_all(&wb).unwrap();
        let layout = metadata[0].layout.as_ref().unwrap();

        assert_eq!(layout.header_row, 3);
        assert_eq!(
            layout.years,
            (0..5)
                .map(|i| YearColumn { label: 1965 + i as i32, column: 2 + i })
                .collect::<Vec<_>>()
        );
        assert_eq!(layout.unit.original, "Exajoules");
        assert_eq!(layout.unit.iso, CanonicalUnit::new("J", "", 1e18));
    }

    #[test]
    fn test_header_on_row_four() {
        let mut wb = MemoryWorkbook::new();
        let s = data_sheet(&mut wb, "Geothermal Capacity", 4, "Megawatts", 1975, 3);
        wb.set_cell(s, 6, 1, "Mexico");

        let parser = UnitParser::new();
        let metadata = LayoutInference::new(&parser).infer_sheet(&wb, s, "Geothermal Capacity").unwrap();
        let layout = metadata.layout.unwrap();
        assert_eq!(layout.header_row, 4);
        assert_eq!(layout.regions, vec![RegionRow { label: "Mexico".to_string(), row: 6 }]);
        assert_eq!(layout.unit.iso, CanonicalUnit::new("W", "", 1e6));
    }

    #[test]
    fn test_regions_skip_blank_rows() {
        let mut wb = MemoryWorkbook::new();
        let s = data_sheet(&mut wb, "Primary Energy Consumption", 3, "Exajoules", 1965, 2);
        wb.set_cell(s, 5, 1, "Canada");
        wb.set_cell(s, 6, 1, "Mexico");
        wb.set_cell(s, 7, 1, "US");
        wb.set_cell(s, 8, 1, "Total North America");
        wb.set_cell(s, 9, 1, "   ");
        wb.set_cell(s, 10, 1, "Argentina");
        // 3 个空行后仍继续
        wb.set_cell(s, 14, 1, "Brazil");

        let parser = UnitParser::new();
        let layout = LayoutInference::new(&parser)
            .infer_sheet(&wb, s, "Primary Energy Consumption")
            .unwrap()
            .layout
            .unwrap();
        let labels: Vec<(&str, u32)> = layout.regions.iter().map(|r| (r.label.as_str(), r.row)).collect();
        assert_eq!(
            labels,
            vec![
                ("Canada", 5),
                ("Mexico", 6),
                ("US", 7),
                ("Total North America", 8),
                ("Argentina", 10),
                ("Brazil", 14),
            ]
        );
    }

    #[test]
    fn test_regions_stop_after_five_blank_rows() {
        let mut wb = MemoryWorkbook::new();
        let s = data_sheet(&mut wb, "Primary Energy Consumption", 3, "Exajoules", 1965, 2);
        wb.set_cell(s, 5, 1, "Canada");
        // 行 6-10 为空，行 11 的注释不再是地区
        wb.set_cell(s, 11, 1, "Source: includes data from ...");

        let parser = UnitParser::new();
        let layout = LayoutInference::new(&parser)
            .infer_sheet(&wb, s, "Primary Energy Consumption")
            .unwrap()
            .layout
            .unwrap();
        assert_eq!(layout.regions.len(), 1);
    }

    #[test]
    fn test_regions_after_five_leading_blank_rows() {
        let mut wb = MemoryWorkbook::new();
        let s = data_sheet(&mut wb, "Primary Energy Consumption", 3, "Exajoules", 1965, 2);
        // 行 5-9 为空，首个地区在 header_row + 7
        wb.set_cell(s, 10, 1, "Canada");
        wb.set_cell(s, 11, 1, "Mexico");

        let parser = UnitParser::new();
        let layout = LayoutInference::new(&parser)
            .infer_sheet(&wb, s, "Primary Energy Consumption")
            .unwrap()
            .layout
            .unwrap();
        assert_eq!(
            layout.regions,
            vec![
                RegionRow { label: "Canada".to_string(), row: 10 },
                RegionRow { label: "Mexico".to_string(), row: 11 },
            ]
        );
    }

    #[test]
    fn test_regions_stop_after_six_leading_blank_rows() {
        let mut wb = MemoryWorkbook::new();
        let s = data_sheet(&mut wb, "Primary Energy Consumption", 3, "Exajoules", 1965, 2);
        // 行 5-10 为空
        wb.set_cell(s, 11, 1, "Canada");

        let parser = UnitParser::new();
        let layout = LayoutInference::new(&parser)
            .infer_sheet(&wb, s, "Primary Energy Consumption")
            .unwrap()
            .layout
            .unwrap();
        assert!(layout.regions.is_empty());
    }

    #[test]
    fn test_out_of_range_header_integers_are_skipped() {
        let mut wb = MemoryWorkbook::new();
        let s = wb.add_sheet("Primary Energy Consumption");
        wb.set_cell(s, 3, 1, "Exajoules");
        wb.set_cell(s, 3, 2, 1990);
        wb.set_cell(s, 3, 3, 5_000_000_000_i64);
        wb.set_cell(s, 3, 4, 7);
        wb.set_cell(s, 3, 5, 1991);

        let parser = UnitParser::new();
        let layout = LayoutInference::new(&parser)
            .infer_sheet(&wb, s, "Primary Energy Consumption")
            .unwrap()
            .layout
            .unwrap();
        assert_eq!(
            layout.years,
            vec![
                YearColumn { label: 1990, column: 2 },
                YearColumn { label: 1991, column: 5 },
            ]
        );
    }

    #[test]
    fn test_non_text_unit_is_layout_error() {
        let mut wb = MemoryWorkbook::new();
        let s = wb.add_sheet("Broken");
        wb.set_cell(s, 3, 1, 42);
        wb.set_cell(s, 3, 2, 1990);

        let parser = UnitParser::new();
        let result = LayoutInference::new(&parser).infer_sheet(&wb, s, "Broken");
        assert!(matches!(
            result,
            Err(ImportError::LayoutMismatch { row: 3, column: 1, .. })
        ));
    }
}
