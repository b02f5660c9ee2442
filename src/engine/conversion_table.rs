// ==========================================
// 统计数据抽取 - 换算表加载器
// ==========================================
// 职责: 读取 "Approximate conversion factors" 工作表
// 输入: Workbook + UnitParser（加载后追加加仑同义词）
// 输出: ConversionTables（原油 / 油品 / 天然气），构建后只读
// ==========================================
// 坐标（1 起始）:
// - 原油: 行 8-12（列 1 为源单位），列 4-8（目标单位 = 行 4 + " " + 行 5，行 4 可空）
// - 油品: 行 20-26（列 1 为品名），列 3-8（源单位 = 行 16，目标单位 = 行 17 去掉前两个字符）
// - 天然气: 行 33-38（列 1 为源单位），列 3-9（目标单位 = 行 29 + " " + 行 30）
// ==========================================

use crate::domain::table::DataTable;
use crate::domain::types::{CellValue, FieldValue};
use crate::engine::unit_parser::{normalize_unit, UnitParser};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::workbook::Workbook;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::{debug, info, instrument};

pub const CONVERSION_SHEET_NAME: &str = "Approximate conversion factors";

const OIL_ROWS: RangeInclusive<u32> = 8..=12;
const OIL_COLUMNS: RangeInclusive<u32> = 4..=8;
const OIL_TO_LABEL_ROWS: (u32, u32) = (4, 5);

const PRODUCT_ROWS: RangeInclusive<u32> = 20..=26;
const PRODUCT_COLUMNS: RangeInclusive<u32> = 3..=8;
const PRODUCT_FROM_LABEL_ROW: u32 = 16;
const PRODUCT_TO_LABEL_ROW: u32 = 17;

const GAS_ROWS: RangeInclusive<u32> = 33..=38;
const GAS_COLUMNS: RangeInclusive<u32> = 3..=9;
const GAS_TO_LABEL_ROWS: (u32, u32) = (29, 30);

// 非化石电力 → 一次能源换算系数
const NON_FOSSIL_BEFORE_2001: (u32, u32) = (45, 2);
const NON_FOSSIL_2001_FIRST_ROW: u32 = 46;
const NON_FOSSIL_2001_COLUMN: u32 = 2;
const NON_FOSSIL_2010_FIRST_ROW: u32 = 45;
const NON_FOSSIL_2010_COLUMN: u32 = 5;

pub const COLUMN_FACTOR: &str = "Factor";

// ==========================================
// ConversionTable - 单位换算表
// ==========================================
// from_unit → to_unit → factor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionTable {
    factors: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入换算系数（同键覆盖）
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>, factor: f64) {
        self.factors
            .entry(from.into())
            .or_default()
            .insert(to.into(), factor);
    }

    pub fn factor(&self, from: &str, to: &str) -> Option<f64> {
        self.factors.get(from).and_then(|targets| targets.get(to)).copied()
    }

    pub fn targets(&self, from: &str) -> Option<&BTreeMap<String, f64>> {
        self.factors.get(from)
    }

    pub fn from_units(&self) -> impl Iterator<Item = &String> {
        self.factors.keys()
    }

    /// 换算对数量
    pub fn len(&self) -> usize {
        self.factors.values().map(|targets| targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// 三张换算表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionTables {
    pub oil: ConversionTable,
    pub oil_products: BTreeMap<String, ConversionTable>,
    pub gas: ConversionTable,
}

// ==========================================
// ConversionTableLoader
// ==========================================
pub struct ConversionTableLoader<'a, W: Workbook + ?Sized> {
    workbook: &'a W,
    sheet_index: usize,
}

impl<'a, W: Workbook + ?Sized> ConversionTableLoader<'a, W> {
    /// 定位换算工作表；不存在即版式错误
    pub fn locate(workbook: &'a W) -> ImportResult<Self> {
        let sheet_index = workbook
            .sheet_index(CONVERSION_SHEET_NAME)
            .ok_or_else(|| ImportError::SheetNotFound(CONVERSION_SHEET_NAME.to_string()))?;
        Ok(Self {
            workbook,
            sheet_index,
        })
    }

    pub fn sheet_index(&self) -> usize {
        self.sheet_index
    }

    /// 加载三张换算表
    ///
    /// 规则:
    /// - 仅记录数值单元格，且源/目标单位（归一化后）不同
    /// - 同时记录原样系数与 ISO 系数: value / from.scale * to.scale
    /// - ISO 键为展示单位（基础单位 + 限定后缀），后写覆盖先写
    /// - 原油表加载后向 parser 追加 "us gallons" / "gallons"
    #[instrument(skip(self, parser))]
    pub fn load(&self, parser: &mut UnitParser) -> ImportResult<ConversionTables> {
        let mut tables = ConversionTables::default();

        // ==========================================
        // 原油
        // ==========================================
        for row in OIL_ROWS {
            let from_label = self.required_label(row, 1)?;
            for column in OIL_COLUMNS {
                let head = self.optional_label(OIL_TO_LABEL_ROWS.0, column);
                let tail = self.required_label(OIL_TO_LABEL_ROWS.1, column)?;
                let to_label = match head {
                    Some(head) => format!("{} {}", head, tail),
                    None => tail,
                };
                self.record(parser, &mut tables.oil, &from_label, &to_label, row, column)?;
            }
        }

        let gallons = tables
            .oil
            .factor("us gallons", "m³")
            .ok_or_else(|| ImportError::MissingConversionFactor {
                from: "us gallons".to_string(),
                to: "m³".to_string(),
            })?;
        parser.add_synonym("us gallons", "m³", gallons);
        parser.add_synonym("gallons", "m³", gallons);
        debug!(factor = gallons, "追加加仑同义词");

        // ==========================================
        // 油品
        // ==========================================
        for row in PRODUCT_ROWS {
            let product = self.required_label(row, 1)?;
            let table = tables.oil_products.entry(product).or_default();
            for column in PRODUCT_COLUMNS {
                let from_label = self.required_label(PRODUCT_FROM_LABEL_ROW, column)?;
                let to_label: String = self
                    .required_label(PRODUCT_TO_LABEL_ROW, column)?
                    .chars()
                    .skip(2)
                    .collect();
                self.record(parser, table, &from_label, &to_label, row, column)?;
            }
        }

        // ==========================================
        // 天然气
        // ==========================================
        for row in GAS_ROWS {
            let from_label = self.required_label(row, 1)?;
            for column in GAS_COLUMNS {
                let to_label = format!(
                    "{} {}",
                    self.required_label(GAS_TO_LABEL_ROWS.0, column)?,
                    self.required_label(GAS_TO_LABEL_ROWS.1, column)?
                );
                self.record(parser, &mut tables.gas, &from_label, &to_label, row, column)?;
            }
        }

        info!(
            oil = tables.oil.len(),
            oil_products = tables.oil_products.len(),
            gas = tables.gas.len(),
            "换算表加载完成"
        );
        Ok(tables)
    }

    /// 非化石电力折算一次能源的逐年系数（列 Year / Factor）
    ///
    /// - from_year..=2000: 统一取 B45
    /// - 2001-2009: 列 2，行 46 起
    /// - 2010-2019: 列 5，行 45 起
    /// 非数值单元格输出 Null
    pub fn non_fossil_electricity_factors(&self, from_year: i32) -> DataTable {
        let mut table = DataTable::new(vec![
            crate::domain::table::COLUMN_YEAR.to_string(),
            COLUMN_FACTOR.to_string(),
        ]);

        let before_2001 = self.factor_cell(NON_FOSSIL_BEFORE_2001.0, NON_FOSSIL_BEFORE_2001.1);
        for year in from_year..=2000 {
            table.rows.push(vec![FieldValue::Integer(year as i64), before_2001.clone()]);
        }
        for (offset, year) in (2001..=2009).enumerate() {
            let factor = self.factor_cell(NON_FOSSIL_2001_FIRST_ROW + offset as u32, NON_FOSSIL_2001_COLUMN);
            table.rows.push(vec![FieldValue::Integer(year), factor]);
        }
        for (offset, year) in (2010..=2019).enumerate() {
            let factor = self.factor_cell(NON_FOSSIL_2010_FIRST_ROW + offset as u32, NON_FOSSIL_2010_COLUMN);
            table.rows.push(vec![FieldValue::Integer(year), factor]);
        }
        table
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn record(
        &self,
        parser: &UnitParser,
        table: &mut ConversionTable,
        from_label: &str,
        to_label: &str,
        row: u32,
        column: u32,
    ) -> ImportResult<()> {
        let value = match self.workbook.cell(self.sheet_index, row, column).as_number() {
            Some(v) => v,
            None => return Ok(()),
        };
        let from_unit = normalize_unit(from_label);
        let to_unit = normalize_unit(to_label);
        if from_unit == to_unit {
            return Ok(());
        }

        let from_iso = parser.resolve(&from_unit)?;
        let to_iso = parser.resolve(&to_unit)?;

        table.insert(from_unit, to_unit, value);
        table.insert(
            from_iso.display(),
            to_iso.display(),
            value / from_iso.scale_factor * to_iso.scale_factor,
        );
        Ok(())
    }

    fn factor_cell(&self, row: u32, column: u32) -> FieldValue {
        match self.workbook.cell(self.sheet_index, row, column).as_number() {
            Some(v) => FieldValue::Number(v),
            None => FieldValue::Null,
        }
    }

    fn optional_label(&self, row: u32, column: u32) -> Option<String> {
        match self.workbook.cell(self.sheet_index, row, column) {
            CellValue::Text(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }

    fn required_label(&self, row: u32, column: u32) -> ImportResult<String> {
        self.optional_label(row, column)
            .ok_or_else(|| ImportError::LayoutMismatch {
                sheet: CONVERSION_SHEET_NAME.to_string(),
                row,
                column,
                message: "缺少单位标签".to_string(),
            })
    }
}
