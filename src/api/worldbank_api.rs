// ==========================================
// 统计数据抽取 - 世界银行指标数据源
// ==========================================
// 输入: API_<指标>.zip（内含同名 CSV）
// 版式: 表头行含元数据列 + 四位数字年份列；其后每行一个国家/地区
// 输出: Year, Value, 元数据列（标准化列名）, [补充列...]
// ==========================================

use crate::domain::table::{DataTable, COLUMN_VALUE, COLUMN_YEAR};
use crate::domain::types::FieldValue;
use crate::engine::property::standardize_property;
use crate::importer::archive_reader::ArchiveReader;
use crate::importer::error::{ImportError, ImportResult};
use crate::linked_data::resolver::{EnrichmentOptions, LinkedDataResolver};
use crate::linked_data::wikidata_resolver::WikidataResolver;
use crate::linked_data::ELEMENT_WORLD;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 年份列表头
pub const YEAR_PATTERN: &str = r"^[0-9]{4}$";

/// 用于关联知识库的元数据列（标准化后）
pub const COLUMN_COUNTRY_CODE: &str = "CountryCode";

/// 世界银行的全球汇总代码
pub const WORLD_CODE: &str = "WLD";

const SOURCE_NAME: &str = "worldbank";

pub struct WorldBankDatasource {
    matrix: Vec<Vec<String>>,
}

impl WorldBankDatasource {
    /// 读取压缩包
    pub fn open<P: AsRef<Path>>(zip_path: P) -> ImportResult<Self> {
        Ok(Self::from_matrix(ArchiveReader.read_matrix(zip_path)?))
    }

    pub fn from_matrix(matrix: Vec<Vec<String>>) -> Self {
        Self { matrix }
    }

    /// 为世界银行代码配置解析器别名（WLD → Q16502）
    pub fn prepare_resolver(resolver: &mut WikidataResolver) {
        resolver.set_alias_code("World", WORLD_CODE, ELEMENT_WORLD, "World");
    }

    /// 表头行：首个包含年份单元格的行
    ///
    /// CSV 读取会跳过空行，文件开头的说明行数量不固定，因此按内容定位
    fn header_row(&self, year_re: &Regex) -> ImportResult<usize> {
        self.matrix
            .iter()
            .position(|row| row.iter().any(|cell| year_re.is_match(cell)))
            .ok_or_else(|| ImportError::LayoutMismatch {
                sheet: SOURCE_NAME.to_string(),
                row: 0,
                column: 0,
                message: "未找到年份表头".to_string(),
            })
    }

    /// 扁平数据表：每个非空年份单元格一行
    ///
    /// # 边界处理
    /// - 年份单元格为空 → 跳过
    /// - 年份单元格非数值 → ValueFormatError（行、列从 1 计）
    /// - 请求补充列但无 CountryCode 列 → LayoutMismatch
    #[instrument(skip(self, enrichment, resolver))]
    pub fn datasource(
        &self,
        enrichment: &EnrichmentOptions,
        mut resolver: Option<&mut dyn LinkedDataResolver>,
    ) -> ImportResult<DataTable> {
        let year_re = Regex::new(YEAR_PATTERN)
            .map_err(|e| ImportError::InternalError(format!("年份正则编译失败: {}", e)))?;
        let header_index = self.header_row(&year_re)?;
        let header = &self.matrix[header_index];

        let mut metadata_columns: Vec<(usize, String)> = Vec::new();
        let mut year_columns: Vec<(usize, i64)> = Vec::new();
        for (index, cell) in header.iter().enumerate() {
            if year_re.is_match(cell) {
                if let Ok(year) = cell.parse() {
                    year_columns.push((index, year));
                }
            } else if !cell.is_empty() {
                metadata_columns.push((index, standardize_property(cell)));
            }
        }
        debug!(
            header_row = header_index + 1,
            metadata = metadata_columns.len(),
            years = year_columns.len(),
            "世界银行表头"
        );

        let code_column = metadata_columns
            .iter()
            .find(|(_, name)| name == COLUMN_COUNTRY_CODE)
            .map(|(index, _)| *index);

        let linked_columns = if enrichment.requested() {
            match resolver.as_deref_mut() {
                Some(r) => enrichment.column_names(r)?,
                None => return Err(ImportError::ResolverMissing),
            }
        } else {
            Vec::new()
        };
        if !linked_columns.is_empty() && code_column.is_none() {
            return Err(ImportError::LayoutMismatch {
                sheet: SOURCE_NAME.to_string(),
                row: (header_index + 1) as u32,
                column: 0,
                message: format!("缺少 {} 列", COLUMN_COUNTRY_CODE),
            });
        }

        let mut columns = vec![COLUMN_YEAR.to_string(), COLUMN_VALUE.to_string()];
        columns.extend(metadata_columns.iter().map(|(_, name)| name.clone()));
        columns.extend(linked_columns.iter().cloned());
        let mut table = DataTable::new(columns);

        let mut linked_by_code: BTreeMap<String, BTreeMap<String, FieldValue>> = BTreeMap::new();

        for (row_index, row) in self.matrix.iter().enumerate().skip(header_index + 1) {
            let cell = |index: usize| row.get(index).map(String::as_str).unwrap_or("");

            let linked = match (resolver.as_deref_mut(), code_column) {
                (Some(r), Some(code_index)) if !linked_columns.is_empty() => {
                    let code = cell(code_index);
                    if !linked_by_code.contains_key(code) {
                        let entity = r.resolve_region(None, Some(code))?;
                        let fields = enrichment.linked_fields(r, entity.as_ref(), &linked_columns)?;
                        linked_by_code.insert(code.to_string(), fields);
                    }
                    linked_by_code.get(code).cloned().unwrap_or_default()
                }
                _ => BTreeMap::new(),
            };

            for (year_index, year) in &year_columns {
                let text = cell(*year_index);
                if text.is_empty() {
                    continue;
                }
                let value: f64 = text.parse().map_err(|_| ImportError::ValueFormatError {
                    row: row_index + 1,
                    column: year_index + 1,
                    value: text.to_string(),
                })?;

                let mut values = vec![FieldValue::Integer(*year), FieldValue::Number(value)];
                values.extend(
                    metadata_columns
                        .iter()
                        .map(|(index, _)| FieldValue::Text(cell(*index).to_string())),
                );
                values.extend(
                    linked_columns
                        .iter()
                        .map(|c| linked.get(c).cloned().unwrap_or(FieldValue::Null)),
                );
                table.rows.push(values);
            }
        }

        info!(rows = table.len(), "世界银行数据组装完成");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn sample() -> WorldBankDatasource {
        WorldBankDatasource::from_matrix(matrix(&[
            &["Data Source", "World Development Indicators"],
            &["Last Updated Date", "2021-06-30"],
            &["Country Name", "Country Code", "Indicator Name", "Indicator Code", "1960", "1961", ""],
            &["Switzerland", "CHE", "GDP (constant 2010 US$)", "NY.GDP.MKTP.KD", "1.5", "", ""],
            &["World", "WLD", "GDP (constant 2010 US$)", "NY.GDP.MKTP.KD", "100", "101.5", ""],
        ]))
    }

    #[test]
    fn test_columns_and_rows() {
        let table = sample().datasource(&EnrichmentOptions::default(), None).unwrap();
        assert_eq!(
            table.columns,
            vec!["Year", "Value", "CountryName", "CountryCode", "IndicatorName", "IndicatorCode"]
        );
        // CHE 1961 为空被跳过
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0][0], FieldValue::Integer(1960));
        assert_eq!(table.rows[0][1], FieldValue::Number(1.5));
        assert_eq!(table.rows[2][3], FieldValue::Text("WLD".to_string()));
    }

    #[test]
    fn test_non_numeric_value_is_error() {
        let ds = WorldBankDatasource::from_matrix(matrix(&[
            &["Country Name", "Country Code", "1960"],
            &["Switzerland", "CHE", "n/a"],
        ]));
        let result = ds.datasource(&EnrichmentOptions::default(), None);
        assert!(matches!(
            result,
            Err(ImportError::ValueFormatError { row: 2, column: 3, .. })
        ));
    }

    #[test]
    fn test_missing_header_is_layout_error() {
        let ds = WorldBankDatasource::from_matrix(matrix(&[&["Data Source", "WDI"]]));
        assert!(matches!(
            ds.datasource(&EnrichmentOptions::default(), None),
            Err(ImportError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_enrichment_requires_resolver() {
        let options = EnrichmentOptions {
            with_id: true,
            ..Default::default()
        };
        assert!(matches!(
            sample().datasource(&options, None),
            Err(ImportError::ResolverMissing)
        ));
    }
}
