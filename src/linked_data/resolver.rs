// ==========================================
// 统计数据抽取 - 知识库解析接口
// ==========================================
// 职责: 定义地区/实体解析的 Trait 与补充列的生成规则
// 实现者: WikidataResolver；测试中的内存实现
// ==========================================

use crate::domain::entity::{Entity, ItemRequest};
use crate::domain::types::FieldValue;
use crate::engine::property::standardize_property;
use crate::importer::error::ImportResult;
use std::collections::BTreeMap;

/// 补充列前缀
pub const LINKED_COLUMN_PREFIX: &str = "Wikidata";

// ==========================================
// LinkedDataResolver Trait
// ==========================================
// 单线程、阻塞；实现者自行负责缓存
pub trait LinkedDataResolver {
    /// 按名称和/或代码解析地区；无结果返回 None（并缓存）
    fn resolve_region(&mut self, name: Option<&str>, code: Option<&str>) -> ImportResult<Option<Entity>>;

    /// 读取实体的名称/描述/属性，键为 `{prefix}Id` / `{prefix}Name` /
    /// `{prefix}Description` / `{prefix}<标准化属性名>`
    fn item_attributes(
        &mut self,
        item_id: &str,
        request: &ItemRequest,
    ) -> ImportResult<BTreeMap<String, FieldValue>>;

    /// 属性 ID → 属性名（如 P297 → "ISO 3166-1 alpha-2 code"）
    fn property_name(&mut self, property_id: &str) -> ImportResult<String>;

    /// 指定类别下别名包含 code 的实体（按 ID 数值排序）
    fn items_from_alias(&mut self, instance_of: &str, code: &str) -> ImportResult<Vec<Entity>>;
}

// ==========================================
// EnrichmentOptions - 补充列选项
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentOptions {
    pub with_id: bool,
    pub with_name: bool,
    pub with_type: bool,
    pub properties: Vec<String>, // 属性 ID
}

impl EnrichmentOptions {
    /// 是否需要补充列
    pub fn requested(&self) -> bool {
        self.with_id || self.with_name || self.with_type || !self.properties.is_empty()
    }

    pub fn item_request(&self) -> ItemRequest {
        ItemRequest {
            with_id: self.with_id,
            with_name: self.with_name,
            with_description: false,
            properties: self.properties.clone(),
            prefix: LINKED_COLUMN_PREFIX.to_string(),
        }
    }

    /// 补充列名（顺序: Id, Name, Type, 各属性）
    pub fn column_names(&self, resolver: &mut dyn LinkedDataResolver) -> ImportResult<Vec<String>> {
        let mut columns = Vec::new();
        if self.with_id {
            columns.push(format!("{}Id", LINKED_COLUMN_PREFIX));
        }
        if self.with_name {
            columns.push(format!("{}Name", LINKED_COLUMN_PREFIX));
        }
        if self.with_type {
            columns.push(format!("{}Type", LINKED_COLUMN_PREFIX));
        }
        for property_id in &self.properties {
            let name = resolver.property_name(property_id)?;
            columns.push(format!("{}{}", LINKED_COLUMN_PREFIX, standardize_property(&name)));
        }
        Ok(columns)
    }

    /// 生成一行的补充字段
    ///
    /// entity 为 None 时所有请求列填 Null
    pub fn linked_fields(
        &self,
        resolver: &mut dyn LinkedDataResolver,
        entity: Option<&Entity>,
        columns: &[String],
    ) -> ImportResult<BTreeMap<String, FieldValue>> {
        let mut fields: BTreeMap<String, FieldValue> =
            columns.iter().map(|c| (c.clone(), FieldValue::Null)).collect();

        let entity = match entity {
            Some(e) => e,
            None => return Ok(fields),
        };

        if self.with_type {
            fields.insert(
                format!("{}Type", LINKED_COLUMN_PREFIX),
                FieldValue::Text(entity.entity_type.clone()),
            );
        }
        if self.with_id || self.with_name || !self.properties.is_empty() {
            for (key, value) in resolver.item_attributes(&entity.id, &self.item_request())? {
                if fields.contains_key(&key) {
                    fields.insert(key, value);
                }
            }
        }
        Ok(fields)
    }
}
