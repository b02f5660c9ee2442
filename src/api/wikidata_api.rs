// ==========================================
// 统计数据抽取 - 知识库类别数据源
// ==========================================
// 职责: 列出某类别下的实体，每个实体输出一行属性
// 列: [Id], [Name], [Description], 各属性（标准化列名，无前缀）
// ==========================================

use crate::domain::entity::ItemRequest;
use crate::domain::table::DataTable;
use crate::engine::property::standardize_property;
use crate::importer::error::ImportResult;
use crate::linked_data::resolver::LinkedDataResolver;
use crate::linked_data::wikidata_resolver::WikidataResolver;
use tracing::info;

/// 默认列出的实体数
pub const DEFAULT_ITEM_LIMIT: u32 = 100;

/// 类别查询选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassQuery {
    pub instance_of: String,
    pub with_id: bool,
    pub with_name: bool,
    pub with_description: bool,
    pub properties: Vec<String>,
    pub limit: u32,
}

impl ClassQuery {
    pub fn new(instance_of: &str) -> Self {
        Self {
            instance_of: instance_of.to_string(),
            with_id: false,
            with_name: true,
            with_description: false,
            properties: Vec::new(),
            limit: DEFAULT_ITEM_LIMIT,
        }
    }

    fn item_request(&self) -> ItemRequest {
        ItemRequest {
            with_id: self.with_id,
            with_name: self.with_name,
            with_description: self.with_description,
            properties: self.properties.clone(),
            prefix: String::new(),
        }
    }
}

pub struct WikidataDatasource<'a> {
    resolver: &'a mut WikidataResolver,
}

impl<'a> WikidataDatasource<'a> {
    pub fn new(resolver: &'a mut WikidataResolver) -> Self {
        Self { resolver }
    }

    pub fn datasource(&mut self, query: &ClassQuery) -> ImportResult<DataTable> {
        let ids = self.resolver.list_items(&query.instance_of, query.limit)?;
        let table = items_table(&mut *self.resolver, &ids, query)?;
        info!(instance_of = %query.instance_of, rows = table.len(), "类别数据组装完成");
        Ok(table)
    }
}

/// 实体 ID 列表 → 表格
pub fn items_table(
    resolver: &mut dyn LinkedDataResolver,
    ids: &[String],
    query: &ClassQuery,
) -> ImportResult<DataTable> {
    let mut columns = Vec::new();
    if query.with_id {
        columns.push("Id".to_string());
    }
    if query.with_name {
        columns.push("Name".to_string());
    }
    if query.with_description {
        columns.push("Description".to_string());
    }
    for property_id in &query.properties {
        columns.push(standardize_property(&resolver.property_name(property_id)?));
    }

    let request = query.item_request();
    let mut table = DataTable::new(columns);
    for id in ids {
        table.push_record(resolver.item_attributes(id, &request)?);
    }
    Ok(table)
}
