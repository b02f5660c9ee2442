// ==========================================
// 统计数据抽取 - 输出表格模型
// ==========================================
// DataRow: 能源统计的一行（值 + 维度列）
// DataTable: 所有数据源共用的扁平表格
// ==========================================

use crate::domain::types::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

// 固定列名
pub const COLUMN_VALUE: &str = "Value";
pub const COLUMN_TYPE: &str = "Type";
pub const COLUMN_UNIT: &str = "Unit";
pub const COLUMN_TYPE_UNIT: &str = "TypeUnit";
pub const COLUMN_YEAR: &str = "Year";
pub const COLUMN_REGION: &str = "Region";

// ==========================================
// DataRow - 能源统计输出行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Type")]
    pub sheet_type: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "TypeUnit")]
    pub type_unit: String,
    /// 知识库补充字段（列名 → 值），未解析时为 Null
    #[serde(flatten)]
    pub linked: BTreeMap<String, FieldValue>,
}

// ==========================================
// DataTable - 扁平表格
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 取一列的所有值
    pub fn column(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// 追加一行（按列名取值，缺失列填 Null）
    pub fn push_record(&mut self, mut record: BTreeMap<String, FieldValue>) {
        let row = self
            .columns
            .iter()
            .map(|c| record.remove(c).unwrap_or(FieldValue::Null))
            .collect();
        self.rows.push(row);
    }

    /// 由能源统计行构建表格
    ///
    /// # 参数
    /// - linked_columns: 补充列（顺序即输出顺序）
    pub fn from_data_rows(rows: &[DataRow], linked_columns: &[String]) -> Self {
        let mut columns: Vec<String> = [
            COLUMN_VALUE,
            COLUMN_TYPE,
            COLUMN_UNIT,
            COLUMN_TYPE_UNIT,
            COLUMN_YEAR,
            COLUMN_REGION,
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        columns.extend(linked_columns.iter().cloned());

        let mut table = DataTable::new(columns);
        for row in rows {
            let mut values = vec![
                FieldValue::Number(row.value),
                FieldValue::Text(row.sheet_type.clone()),
                FieldValue::Text(row.unit.clone()),
                FieldValue::Text(row.type_unit.clone()),
                FieldValue::Integer(row.year as i64),
                FieldValue::Text(row.region.clone()),
            ];
            for column in linked_columns {
                values.push(row.linked.get(column).cloned().unwrap_or(FieldValue::Null));
            }
            table.rows.push(values);
        }
        table
    }

    /// 导出为 CSV（Null 输出为空字段）
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
