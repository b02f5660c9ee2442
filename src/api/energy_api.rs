// ==========================================
// 统计数据抽取 - 能源统计工作簿数据源
// ==========================================
// 职责: metadata() / datasource() / 换算表 / 非化石电力系数
// 输入: 能源统计工作簿（含 "Approximate conversion factors" 工作表）
// 红线: metadata() 每次重新推断；datasource() 每次返回新表
// ==========================================

use crate::domain::sheet::SheetMetadata;
use crate::domain::table::DataTable;
use crate::engine::assembler::{DatasourceAssembler, DatasourceQuery};
use crate::engine::conversion_table::{ConversionTableLoader, ConversionTables};
use crate::engine::layout::LayoutInference;
use crate::engine::unit_parser::UnitParser;
use crate::importer::error::ImportResult;
use crate::importer::workbook::{CalamineWorkbook, Workbook};
use crate::linked_data::resolver::LinkedDataResolver;
use crate::linked_data::wikidata_resolver::WikidataResolver;
use crate::linked_data::ELEMENT_WORLD;
use std::path::Path;
use tracing::{info, instrument};

/// 非化石电力系数的默认起始年份
pub const DEFAULT_FACTOR_FROM_YEAR: i32 = 1900;

/// 为能源统计地区配置解析器别名（"World" → Q16502）
pub fn prepare_resolver(resolver: &mut WikidataResolver) {
    resolver.set_alias("World", "World", ELEMENT_WORLD, "World");
}

// ==========================================
// EnergyDatasource
// ==========================================
pub struct EnergyDatasource<W: Workbook = CalamineWorkbook> {
    workbook: W,
    parser: UnitParser,
    conversion_tables: ConversionTables,
}

impl EnergyDatasource<CalamineWorkbook> {
    /// 打开工作簿文件
    pub fn open<P: AsRef<Path>>(file_path: P) -> ImportResult<Self> {
        let workbook = CalamineWorkbook::open(file_path)?;
        Self::from_workbook(workbook)
    }
}

impl<W: Workbook> EnergyDatasource<W> {
    /// 由已加载的工作簿创建
    ///
    /// 构建时加载换算表（同时为单位解析器追加加仑同义词）
    pub fn from_workbook(workbook: W) -> ImportResult<Self> {
        let mut parser = UnitParser::new();
        let conversion_tables = ConversionTableLoader::locate(&workbook)?.load(&mut parser)?;
        info!(sheets = workbook.sheet_names().len(), "能源统计工作簿加载完成");
        Ok(Self {
            workbook,
            parser,
            conversion_tables,
        })
    }

    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    pub fn parser(&self) -> &UnitParser {
        &self.parser
    }

    pub fn conversion_tables(&self) -> &ConversionTables {
        &self.conversion_tables
    }

    /// 所有工作表的版式元数据
    pub fn metadata(&self) -> ImportResult<Vec<SheetMetadata>> {
        LayoutInference::new(&self.parser).infer_all(&self.workbook)
    }

    /// 扁平数据表
    ///
    /// 列: Value, Type, Unit, TypeUnit, Year, Region, [补充列...]
    #[instrument(skip(self, query, resolver))]
    pub fn datasource(
        &self,
        query: &DatasourceQuery,
        resolver: Option<&mut dyn LinkedDataResolver>,
    ) -> ImportResult<DataTable> {
        let metadata = self.metadata()?;
        let rows = DatasourceAssembler::new(&self.workbook).assemble(&metadata, query, resolver)?;
        Ok(rows.into_table())
    }

    /// 非化石电力折算一次能源的逐年系数
    pub fn non_fossil_electricity_factors(&self, from_year: i32) -> ImportResult<DataTable> {
        Ok(ConversionTableLoader::locate(&self.workbook)?.non_fossil_electricity_factors(from_year))
    }
}
