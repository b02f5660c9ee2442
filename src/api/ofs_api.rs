// ==========================================
// 统计数据抽取 - 统计局 PX-Web 数据源
// ==========================================
// 职责: 表描述（GET）与 JSON-stat 查询（POST）→ 扁平表格
// 输出: values + 各维度标签列, [补充列...]
// 补充: 指定维度的取值按州（canton）别名关联知识库实体
// ==========================================

use crate::config::config_manager::{DEFAULT_USER_AGENT, LinkedDataSettings};
use crate::domain::table::DataTable;
use crate::domain::types::FieldValue;
use crate::engine::json_stat;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::http_client::{HttpClient, DEFAULT_TIMEOUT_SECS};
use crate::linked_data::resolver::{EnrichmentOptions, LinkedDataResolver};
use crate::linked_data::ELEMENT_CANTON_CH;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// 维度补充列选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionEnrichment {
    pub dimension: String, // 维度标签（输出列名）
    pub options: EnrichmentOptions,
}

pub struct OfsDatasource {
    url: String,
    client: HttpClient,
}

impl OfsDatasource {
    /// 使用默认用户代理与超时
    pub fn new(url: &str) -> ImportResult<Self> {
        let client = HttpClient::new(DEFAULT_USER_AGENT, Duration::from_secs(DEFAULT_TIMEOUT_SECS))?;
        Ok(Self::with_client(url, client))
    }

    /// 使用配置中的用户代理与超时
    pub fn with_settings(url: &str, settings: &LinkedDataSettings) -> ImportResult<Self> {
        let client = HttpClient::new(settings.user_agent.clone(), settings.timeout)?;
        Ok(Self::with_client(url, client))
    }

    pub fn with_client(url: &str, client: HttpClient) -> Self {
        Self {
            url: url.to_string(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 表描述（变量、取值、标签）
    pub fn metadata(&self) -> ImportResult<Value> {
        self.client.get_json(&self.url, &[])
    }

    /// 提交 JSON-stat 查询并展开
    #[instrument(skip(self, query, enrichment, resolver), fields(url = %self.url))]
    pub fn datasource(
        &self,
        query: &Value,
        enrichment: Option<&DimensionEnrichment>,
        resolver: Option<&mut dyn LinkedDataResolver>,
    ) -> ImportResult<DataTable> {
        let response = self.client.post_json(&self.url, query)?;
        let table = table_from_response(&response, enrichment, resolver)?;
        info!(rows = table.len(), columns = table.columns.len(), "统计局数据组装完成");
        Ok(table)
    }
}

/// JSON-stat 响应 → 表格（可选维度补充列）
///
/// # 边界处理
/// - 维度标签不存在 → InvalidFilter
/// - 别名无匹配 → 补充列填 Null
pub fn table_from_response(
    response: &Value,
    enrichment: Option<&DimensionEnrichment>,
    resolver: Option<&mut dyn LinkedDataResolver>,
) -> ImportResult<DataTable> {
    let mut table = json_stat::unpivot(response)?;

    let enrichment = match enrichment {
        Some(e) if e.options.requested() => e,
        _ => return Ok(table),
    };
    let resolver = resolver.ok_or(ImportError::ResolverMissing)?;
    let dimension_index = table.column_index(&enrichment.dimension).ok_or_else(|| {
        ImportError::InvalidFilter(format!("维度不存在: {}", enrichment.dimension))
    })?;

    let linked_columns = enrichment.options.column_names(resolver)?;
    let mut linked_by_value: BTreeMap<String, BTreeMap<String, FieldValue>> = BTreeMap::new();

    for row in &mut table.rows {
        let key = row[dimension_index].to_string();
        if !linked_by_value.contains_key(&key) {
            let entity = resolver
                .items_from_alias(ELEMENT_CANTON_CH, &key)?
                .into_iter()
                .next();
            if entity.is_none() {
                debug!(value = %key, "维度取值未关联到知识库实体");
            }
            let fields = enrichment
                .options
                .linked_fields(resolver, entity.as_ref(), &linked_columns)?;
            linked_by_value.insert(key.clone(), fields);
        }
        if let Some(fields) = linked_by_value.get(&key) {
            row.extend(
                linked_columns
                    .iter()
                    .map(|c| fields.get(c).cloned().unwrap_or(FieldValue::Null)),
            );
        }
    }
    table.columns.extend(linked_columns);
    Ok(table)
}
