// ==========================================
// 统计数据抽取 - 命令行入口
// ==========================================
// 输出: CSV 写到标准输出；日志写到标准错误
// 知识库缓存: SHIFTER_CACHE_DB 或用户缓存目录
// ==========================================

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use shifter_stats::api::energy_api::{self, DEFAULT_FACTOR_FROM_YEAR};
use shifter_stats::api::{
    ClassQuery, DimensionEnrichment, EnergyDatasource, LinkedDataContext, OfsDatasource,
    WikidataDatasource, WorldBankDatasource,
};
use shifter_stats::config::get_default_db_path;
use shifter_stats::domain::table::DataTable;
use shifter_stats::domain::types::{FieldValue, UnitMode};
use shifter_stats::engine::{DatasourceFilters, DatasourceQuery};
use shifter_stats::linked_data::{EnrichmentOptions, LinkedDataResolver, WikidataResolver};
use std::io;
use std::path::PathBuf;

// ==========================================
// 参数定义
// ==========================================

/// 知识库补充列
#[derive(Args, Debug)]
struct LinkedDataArgs {
    /// 补充实体 ID 列
    #[arg(long = "wikidata-id")]
    with_id: bool,

    /// 补充实体名称列
    #[arg(long = "wikidata-name")]
    with_name: bool,

    /// 补充实体类型列
    #[arg(long = "wikidata-type")]
    with_type: bool,

    /// 补充属性列（可重复）
    #[arg(long = "wikidata-property", value_name = "PROPERTY")]
    properties: Vec<String>,
}

impl LinkedDataArgs {
    fn enrichment(&self) -> EnrichmentOptions {
        EnrichmentOptions {
            with_id: self.with_id,
            with_name: self.with_name,
            with_type: self.with_type,
            properties: self.properties.clone(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "shifter-stats")]
#[command(version, about = "统计数据抽取与单位归一化", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出能源统计工作簿中各工作表的版式
    Metadata {
        /// 能源统计工作簿 (xlsx)
        workbook: PathBuf,
    },

    /// 抽取能源统计工作簿的长表
    Datasource {
        /// 能源统计工作簿 (xlsx)
        workbook: PathBuf,

        /// 只保留这些数据类型（可重复）
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,

        /// 只保留这些地区（可重复）
        #[arg(long = "region", value_name = "REGION")]
        regions: Vec<String>,

        /// 只保留这些年份（可重复）
        #[arg(long = "year", value_name = "YEAR")]
        years: Vec<i32>,

        /// 只保留这些单位（可重复）
        #[arg(long = "unit", value_name = "UNIT")]
        units: Vec<String>,

        /// 只保留能被该值整除的年份
        #[arg(long)]
        years_factor: Option<i32>,

        /// 单位输出模式: original | normalized | iso
        #[arg(long = "units", default_value = "iso")]
        unit_mode: UnitMode,

        #[command(flatten)]
        linked: LinkedDataArgs,
    },

    /// 非化石电力换算系数
    Factors {
        /// 能源统计工作簿 (xlsx)
        workbook: PathBuf,

        /// 输出的起始年份
        #[arg(long, default_value_t = DEFAULT_FACTOR_FROM_YEAR)]
        from_year: i32,
    },

    /// 读取世界银行指标压缩包
    Worldbank {
        /// API_<指标>.zip
        zip: PathBuf,

        #[command(flatten)]
        linked: LinkedDataArgs,
    },

    /// 查询统计局 JSON-stat 接口
    Ofs {
        /// 接口地址
        url: String,

        /// POST 查询体 (JSON 文件)
        query: PathBuf,

        /// 需要补充知识库列的维度
        #[arg(long)]
        dimension: Option<String>,

        #[command(flatten)]
        linked: LinkedDataArgs,
    },

    /// 列出知识库类别下的实体
    Wikidata {
        /// 类别实体 ID，如 Q6256
        class: String,

        /// 最多返回的实体数
        #[arg(long)]
        limit: Option<u32>,

        /// 输出实体 ID 列
        #[arg(long)]
        with_id: bool,

        /// 输出实体描述列
        #[arg(long)]
        with_description: bool,

        /// 补充属性列（可重复）
        #[arg(long = "wikidata-property", value_name = "PROPERTY")]
        properties: Vec<String>,
    },
}

/// 重复选项为空表示不过滤
fn filter_values<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn write_table(table: &DataTable) -> anyhow::Result<()> {
    table.write_csv(io::stdout().lock()).context("写出 CSV 失败")
}

/// 需要补充列时才打开知识库缓存
fn open_resolver(enrichment_requested: bool) -> anyhow::Result<Option<WikidataResolver>> {
    if !enrichment_requested {
        return Ok(None);
    }
    let db_path = get_default_db_path();
    let context = LinkedDataContext::open(&db_path)
        .with_context(|| format!("无法打开知识库缓存: {}", db_path))?;
    Ok(Some(context.resolver()?))
}

// ==========================================
// 子命令
// ==========================================

fn metadata_command(workbook: PathBuf) -> anyhow::Result<()> {
    let source = EnergyDatasource::open(workbook)?;
    let columns = [
        "Type", "Index", "Supported", "Label", "Unit", "NormalizedUnit", "IsoUnit", "IsoFactor",
        "HeaderRow", "Years", "Regions",
    ];
    let mut table = DataTable::new(columns.iter().map(|c| c.to_string()).collect());
    for sheet in source.metadata()? {
        let mut row = vec![
            FieldValue::Text(sheet.sheet_type.clone()),
            FieldValue::Integer(sheet.sheet_index as i64),
            FieldValue::Text(sheet.supported().to_string()),
        ];
        match &sheet.layout {
            Some(layout) => row.extend([
                FieldValue::Text(layout.label.clone()),
                FieldValue::Text(layout.unit.original.clone()),
                FieldValue::Text(layout.unit.normalized.clone()),
                FieldValue::Text(layout.unit.iso.display()),
                FieldValue::Number(layout.unit.iso.scale_factor),
                FieldValue::Integer(layout.header_row as i64),
                FieldValue::Integer(layout.years.len() as i64),
                FieldValue::Integer(layout.regions.len() as i64),
            ]),
            None => row.resize(columns.len(), FieldValue::Null),
        }
        table.rows.push(row);
    }
    write_table(&table)
}

fn datasource_command(workbook: PathBuf, query: DatasourceQuery) -> anyhow::Result<()> {
    let source = EnergyDatasource::open(workbook)?;

    let mut resolver = open_resolver(query.enrichment.requested())?;
    if let Some(r) = resolver.as_mut() {
        energy_api::prepare_resolver(r);
    }
    let table = source.datasource(
        &query,
        resolver.as_mut().map(|r| r as &mut dyn LinkedDataResolver),
    )?;
    write_table(&table)
}

fn worldbank_command(zip: PathBuf, enrichment: EnrichmentOptions) -> anyhow::Result<()> {
    let source = WorldBankDatasource::open(zip)?;

    let mut resolver = open_resolver(enrichment.requested())?;
    if let Some(r) = resolver.as_mut() {
        WorldBankDatasource::prepare_resolver(r);
    }
    let table = source.datasource(
        &enrichment,
        resolver.as_mut().map(|r| r as &mut dyn LinkedDataResolver),
    )?;
    write_table(&table)
}

fn ofs_command(
    url: &str,
    query_path: PathBuf,
    enrichment: Option<DimensionEnrichment>,
) -> anyhow::Result<()> {
    let query_text = std::fs::read_to_string(&query_path)
        .with_context(|| format!("无法读取查询文件: {}", query_path.display()))?;
    let query: serde_json::Value = serde_json::from_str(&query_text)
        .with_context(|| format!("查询文件不是合法 JSON: {}", query_path.display()))?;
    let requested = enrichment.as_ref().map_or(false, |e| e.options.requested());

    let source = OfsDatasource::new(url)?;
    let mut resolver = open_resolver(requested)?;
    let table = source.datasource(
        &query,
        enrichment.as_ref(),
        resolver.as_mut().map(|r| r as &mut dyn LinkedDataResolver),
    )?;
    write_table(&table)
}

fn wikidata_command(query: ClassQuery) -> anyhow::Result<()> {
    let mut resolver = open_resolver(true)?.ok_or_else(|| anyhow!("无法创建知识库解析器"))?;
    let table = WikidataDatasource::new(&mut resolver).datasource(&query)?;
    write_table(&table)
}

fn main() -> anyhow::Result<()> {
    shifter_stats::logging::init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, version = shifter_stats::VERSION, "启动");

    match cli.command {
        Commands::Metadata { workbook } => metadata_command(workbook),
        Commands::Datasource {
            workbook,
            types,
            regions,
            years,
            units,
            years_factor,
            unit_mode,
            linked,
        } => {
            let query = DatasourceQuery {
                filters: DatasourceFilters {
                    types: filter_values(types),
                    years: filter_values(years),
                    years_factor,
                    regions: filter_values(regions),
                    units: filter_values(units),
                },
                units: unit_mode,
                enrichment: linked.enrichment(),
            };
            datasource_command(workbook, query)
        }
        Commands::Factors { workbook, from_year } => {
            let source = EnergyDatasource::open(workbook)?;
            write_table(&source.non_fossil_electricity_factors(from_year)?)
        }
        Commands::Worldbank { zip, linked } => worldbank_command(zip, linked.enrichment()),
        Commands::Ofs {
            url,
            query,
            dimension,
            linked,
        } => {
            let enrichment = dimension.map(|dimension| DimensionEnrichment {
                dimension,
                options: linked.enrichment(),
            });
            ofs_command(&url, query, enrichment)
        }
        Commands::Wikidata {
            class,
            limit,
            with_id,
            with_description,
            properties,
        } => {
            let mut query = ClassQuery::new(&class);
            query.with_id = with_id;
            query.with_description = with_description;
            query.properties = properties;
            if let Some(limit) = limit {
                query.limit = limit;
            }
            wikidata_command(query)
        }
    }
}
