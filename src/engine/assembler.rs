// ==========================================
// 统计数据抽取 - 数据行组装引擎
// ==========================================
// 职责: 按过滤条件遍历 工作表 × 年份 × 地区，输出扁平数据行
// 输入: Workbook + Vec<SheetMetadata> + DatasourceQuery
// 输出: AssembledRows（每次调用新建，不修改输入）
// 红线: 仅 iso 模式换算数值并追加限定后缀
// ==========================================

use crate::domain::sheet::{SheetLayout, SheetMetadata};
use crate::domain::table::{DataRow, DataTable};
use crate::domain::types::{FieldValue, UnitMode};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::workbook::Workbook;
use crate::linked_data::resolver::{EnrichmentOptions, LinkedDataResolver};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// 地区名前缀（解析知识库实体前去掉）
pub const TOTAL_PREFIX: &str = "Total ";

// ==========================================
// DatasourceFilters - 过滤条件
// ==========================================
// 各条件 AND 组合；None 表示不过滤
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasourceFilters {
    pub types: Option<Vec<String>>,   // 工作表名（精确匹配）
    pub years: Option<Vec<i32>>,      // 年份
    pub years_factor: Option<i32>,    // year % f == 0
    pub regions: Option<Vec<String>>, // 地区名（精确匹配）
    pub units: Option<Vec<String>>,   // 输出单位文本（单位 + 后缀）
}

impl DatasourceFilters {
    /// 校验过滤条件
    pub fn validate(&self) -> ImportResult<()> {
        if let Some(factor) = self.years_factor {
            if factor <= 0 {
                return Err(ImportError::InvalidFilter(format!(
                    "years_factor 必须大于 0: {}",
                    factor
                )));
            }
        }
        Ok(())
    }

    pub fn accepts_type(&self, sheet_type: &str) -> bool {
        self.types
            .as_ref()
            .map_or(true, |types| types.iter().any(|t| t == sheet_type))
    }

    pub fn accepts_year(&self, year: i32) -> bool {
        let listed = self.years.as_ref().map_or(true, |years| years.contains(&year));
        let multiple = self.years_factor.map_or(true, |f| f > 0 && year % f == 0);
        listed && multiple
    }

    pub fn accepts_region(&self, region: &str) -> bool {
        self.regions
            .as_ref()
            .map_or(true, |regions| regions.iter().any(|r| r == region))
    }

    pub fn accepts_unit(&self, unit: &str) -> bool {
        self.units
            .as_ref()
            .map_or(true, |units| units.iter().any(|u| u == unit))
    }
}

/// 一次 datasource() 调用的全部参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasourceQuery {
    pub filters: DatasourceFilters,
    pub units: UnitMode,
    pub enrichment: EnrichmentOptions,
}

/// 组装结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledRows {
    pub rows: Vec<DataRow>,
    pub linked_columns: Vec<String>,
}

impl AssembledRows {
    pub fn into_table(self) -> DataTable {
        DataTable::from_data_rows(&self.rows, &self.linked_columns)
    }
}

/// 某模式下的 (单位文本, 后缀, 数值乘数)
pub fn unit_for_mode(layout: &SheetLayout, mode: UnitMode) -> (&str, &str, f64) {
    match mode {
        UnitMode::Original => (layout.unit.original.as_str(), "", 1.0),
        UnitMode::Normalized => (layout.unit.normalized.as_str(), "", 1.0),
        UnitMode::Iso => (
            layout.unit.iso.base_unit.as_str(),
            layout.unit.iso.postfix.as_str(),
            layout.unit.iso.scale_factor,
        ),
    }
}

// ==========================================
// DatasourceAssembler - 数据行组装引擎
// ==========================================
pub struct DatasourceAssembler<'a, W: Workbook + ?Sized> {
    workbook: &'a W,
}

impl<'a, W: Workbook + ?Sized> DatasourceAssembler<'a, W> {
    pub fn new(workbook: &'a W) -> Self {
        Self { workbook }
    }

    /// 组装数据行
    ///
    /// 规则:
    /// - 跳过不受支持的工作表
    /// - 单元格非数值 → 跳过（非错误）
    /// - 单位过滤作用于输出单位文本（单位 + 后缀）
    /// - 补充列: 地区名去掉 "Total " 后解析；未解析填 Null
    ///
    /// 边界处理:
    /// - 请求补充列但 resolver 为 None → ResolverMissing
    /// - years_factor <= 0 → InvalidFilter
    #[instrument(skip(self, metadata, query, resolver), fields(sheets = metadata.len(), units = %query.units))]
    pub fn assemble(
        &self,
        metadata: &[SheetMetadata],
        query: &DatasourceQuery,
        mut resolver: Option<&mut dyn LinkedDataResolver>,
    ) -> ImportResult<AssembledRows> {
        query.filters.validate()?;

        let enrichment = &query.enrichment;
        let linked_columns = if enrichment.requested() {
            match resolver.as_deref_mut() {
                Some(r) => enrichment.column_names(r)?,
                None => return Err(ImportError::ResolverMissing),
            }
        } else {
            Vec::new()
        };

        // 同一地区在一次调用内只解析一次
        let mut linked_by_region: BTreeMap<String, BTreeMap<String, FieldValue>> = BTreeMap::new();
        let mut rows = Vec::new();

        for sheet in metadata {
            let layout = match &sheet.layout {
                Some(layout) => layout,
                None => continue,
            };
            if !query.filters.accepts_type(&sheet.sheet_type) {
                continue;
            }

            let (unit, postfix, factor) = unit_for_mode(layout, query.units);
            let displayed_unit = format!("{}{}", unit, postfix);
            if !query.filters.accepts_unit(&displayed_unit) {
                debug!(sheet = %sheet.sheet_type, unit = %displayed_unit, "单位不在过滤列表，跳过");
                continue;
            }
            let type_unit = format!("{} [{}]{}", layout.label, unit, postfix);

            for year in &layout.years {
                if !query.filters.accepts_year(year.label) {
                    continue;
                }
                for region in &layout.regions {
                    if !query.filters.accepts_region(&region.label) {
                        continue;
                    }
                    let value = match self
                        .workbook
                        .cell(sheet.sheet_index, region.row, year.column)
                        .as_number()
                    {
                        Some(v) => v,
                        None => continue,
                    };

                    let linked = match resolver.as_deref_mut() {
                        Some(r) if !linked_columns.is_empty() => {
                            if !linked_by_region.contains_key(&region.label) {
                                let fields =
                                    Self::link_region(r, enrichment, &region.label, &linked_columns)?;
                                linked_by_region.insert(region.label.clone(), fields);
                            }
                            linked_by_region
                                .get(&region.label)
                                .cloned()
                                .unwrap_or_default()
                        }
                        _ => BTreeMap::new(),
                    };

                    rows.push(DataRow {
                        value: value * factor,
                        year: year.label,
                        region: region.label.clone(),
                        sheet_type: sheet.sheet_type.clone(),
                        unit: displayed_unit.clone(),
                        type_unit: type_unit.clone(),
                        linked,
                    });
                }
            }
        }

        info!(rows = rows.len(), linked_columns = linked_columns.len(), "数据行组装完成");
        Ok(AssembledRows {
            rows,
            linked_columns,
        })
    }

    fn link_region(
        resolver: &mut dyn LinkedDataResolver,
        enrichment: &EnrichmentOptions,
        region: &str,
        columns: &[String],
    ) -> ImportResult<BTreeMap<String, FieldValue>> {
        let name = region.strip_prefix(TOTAL_PREFIX).unwrap_or(region);
        let entity = resolver.resolve_region(Some(name), None)?;
        if entity.is_none() {
            debug!(region = %region, "地区未关联到知识库实体");
        }
        enrichment.linked_fields(resolver, entity.as_ref(), columns)
    }
}
