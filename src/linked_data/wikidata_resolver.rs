// ==========================================
// 统计数据抽取 - Wikidata 解析器
// ==========================================
// 职责: 地区名/代码 → 实体，实体 → 名称/描述/属性值
// 查询: SPARQL 端点 + Special:EntityData JSON
// 缓存: LinkedDataCacheRepository（命中与未命中都缓存）
// ==========================================
// 地区解析顺序:
// 1. 自定义别名（代码 → 名称）
// 2. 缓存（代码 → 名称）；缓存的 null 直接返回 None
// 3. 代码为 2/3 位: 洲/国家类别内按 ISO 代码，再不限类别
// 4. 名称为 2/3 位: 同上
// 5. 扩展类别列表内按标签精确匹配
// 6. 逐类别: 别名包含 + 人口降序；别名包含 + ID 排序
// 7. 缓存 null
// ==========================================

use crate::config::config_manager::LinkedDataSettings;
use crate::domain::entity::{Entity, ItemRequest};
use crate::domain::types::FieldValue;
use crate::engine::property::standardize_property;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::http_client::HttpClient;
use crate::linked_data::resolver::LinkedDataResolver;
use crate::linked_data::sparql;
use crate::linked_data::*;
use crate::repository::linked_data_cache_repo::{
    from_alias_namespace, LinkedDataCacheRepository, NAMESPACE_ITEMS, NAMESPACE_PROPERTIES,
    NAMESPACE_REGION_CODES, NAMESPACE_REGION_NAMES,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// 代码查询使用的类别
const CODE_CLASSES: &[(&str, &str)] = &[(ELEMENT_CONTINENT, "continent"), (ELEMENT_COUNTRY, "country")];

/// 名称查询使用的类别
const NAME_CLASSES: &[(&str, &str)] = &[
    (ELEMENT_CONTINENT, "continent"),
    (ELEMENT_COUNTRY, "country"),
    (ELEMENT_SUBCONTINENT, "subcontinent"),
    (ELEMENT_GEOPOLITICAL_REGION, "geographic region"),
    (ELEMENT_SUBREGION, "subregion"),
    (ELEMENT_ELECTORAL_DISTRICT, "electoral district"),
    (ELEMENT_POLITICAL_TERRITORY_ENTITY, "political territorial entity"),
];

const OTHER_TYPE: &str = "other";

/// 2 位 → alpha-2，3 位 → alpha-3
pub fn code_property(code: &str) -> Option<&'static str> {
    match code.chars().count() {
        2 => Some(PROPERTY_ISO_3166_1_ALPHA_2),
        3 => Some(PROPERTY_ISO_3166_1_ALPHA_3),
        _ => None,
    }
}

// ==========================================
// LinkedDataTransport Trait
// ==========================================
// 用途: 隔离网络访问，测试中替换为脚本化实现
pub trait LinkedDataTransport {
    /// 执行 SPARQL 查询，返回 JSON 结果
    fn sparql(&self, query: &str) -> ImportResult<Value>;

    /// 读取实体数据文档（{"entities": {id: {...}}}）
    fn entity_data(&self, id: &str) -> ImportResult<Value>;
}

/// 基于 HttpClient 的实现
pub struct HttpLinkedDataTransport {
    client: HttpClient,
    settings: LinkedDataSettings,
}

impl HttpLinkedDataTransport {
    pub fn new(settings: LinkedDataSettings) -> ImportResult<Self> {
        let client = HttpClient::new(settings.user_agent.clone(), settings.timeout)?;
        Ok(Self { client, settings })
    }
}

impl LinkedDataTransport for HttpLinkedDataTransport {
    fn sparql(&self, query: &str) -> ImportResult<Value> {
        self.client.get_json(
            &self.settings.sparql_endpoint,
            &[("query", query), ("format", "json")],
        )
    }

    fn entity_data(&self, id: &str) -> ImportResult<Value> {
        self.client.get_json(&self.settings.entity_url(id), &[])
    }
}

// ==========================================
// 实体数据解析
// ==========================================

/// 取指定语言的标签/描述
fn localized(entity: &Value, field: &str, lang: &str) -> Value {
    entity
        .get(field)
        .and_then(|m| m.get(lang))
        .and_then(|v| v.get("value"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// 取属性的首个声明值
///
/// - quantity → amount 数值
/// - wikibase-entityid → 实体 ID
/// - time → 时间文本
/// - monolingualtext → 文本
/// - 其它 → 原样
pub fn claim_value(entity: &Value, property_id: &str) -> Value {
    let value = match entity
        .get("claims")
        .and_then(|c| c.get(property_id))
        .and_then(Value::as_array)
        .and_then(|claims| claims.first())
        .and_then(|claim| claim.pointer("/mainsnak/datavalue/value"))
    {
        Some(v) => v,
        None => return Value::Null,
    };

    match value {
        Value::Object(map) => {
            if let Some(amount) = map.get("amount").and_then(Value::as_str) {
                return parse_amount(amount);
            }
            if let Some(id) = map.get("id").and_then(Value::as_str) {
                return Value::String(id.to_string());
            }
            if let Some(time) = map.get("time") {
                return time.clone();
            }
            if let Some(text) = map.get("text") {
                return text.clone();
            }
            value.clone()
        }
        other => other.clone(),
    }
}

fn parse_amount(amount: &str) -> Value {
    let trimmed = amount.trim_start_matches('+');
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) => Value::from(f),
        Err(_) => Value::String(amount.to_string()),
    }
}

// ==========================================
// WikidataResolver
// ==========================================
pub struct WikidataResolver {
    transport: Box<dyn LinkedDataTransport>,
    cache: LinkedDataCacheRepository,
    language: String,
    limit: u32,
    name_aliases: BTreeMap<String, Entity>,
    code_aliases: BTreeMap<String, Entity>,
    entities: BTreeMap<String, Value>, // 本次运行已下载的实体文档
}

impl WikidataResolver {
    /// 使用 HTTP 访问创建
    pub fn new(settings: LinkedDataSettings, cache: LinkedDataCacheRepository) -> ImportResult<Self> {
        let language = settings.language.clone();
        let limit = settings.query_limit;
        let transport = HttpLinkedDataTransport::new(settings)?;
        Ok(Self::with_transport(Box::new(transport), cache, &language, limit))
    }

    pub fn with_transport(
        transport: Box<dyn LinkedDataTransport>,
        cache: LinkedDataCacheRepository,
        language: &str,
        limit: u32,
    ) -> Self {
        Self {
            transport,
            cache,
            language: language.to_string(),
            limit,
            name_aliases: BTreeMap::new(),
            code_aliases: BTreeMap::new(),
            entities: BTreeMap::new(),
        }
    }

    /// 名称别名（优先于缓存和查询）
    pub fn set_alias(&mut self, instance_of: &str, name: &str, item_id: &str, label: &str) {
        self.name_aliases
            .insert(name.to_string(), Self::alias_entity(instance_of, item_id, label));
    }

    /// 代码别名（优先于缓存和查询）
    pub fn set_alias_code(&mut self, instance_of: &str, code: &str, item_id: &str, label: &str) {
        self.code_aliases
            .insert(code.to_string(), Self::alias_entity(instance_of, item_id, label));
    }

    fn alias_entity(instance_of: &str, item_id: &str, label: &str) -> Entity {
        Entity::from_url(&format!("{}{}", ENTITY_URL_PREFIX, item_id), label, instance_of)
    }

    /// 列出类别下的实体 ID
    #[instrument(skip(self))]
    pub fn list_items(&mut self, instance_of: &str, limit: u32) -> ImportResult<Vec<String>> {
        let query = sparql::items_of_class(instance_of, &self.language, limit);
        let entities = self.query_entities(&query, instance_of)?;
        info!(instance_of, count = entities.len(), "类别实体列表");
        Ok(entities.into_iter().map(|e| e.id).collect())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn query_entities(&self, query: &str, entity_type: &str) -> ImportResult<Vec<Entity>> {
        debug!(query = %query, "SPARQL 查询");
        let response = self.transport.sparql(query)?;
        sparql::parse_bindings(&response, entity_type)
    }

    fn entity_document(&mut self, id: &str) -> ImportResult<Value> {
        if let Some(entity) = self.entities.get(id) {
            return Ok(entity.clone());
        }
        debug!(id, "下载实体数据");
        let document = self.transport.entity_data(id)?;
        let entities = document
            .get("entities")
            .and_then(Value::as_object)
            .ok_or_else(|| ImportError::ResponseFormat {
                url: id.to_string(),
                message: "缺少 entities".to_string(),
            })?;
        // 重定向时键为目标实体 ID
        let entity = entities
            .get(id)
            .or_else(|| entities.values().next())
            .cloned()
            .ok_or_else(|| ImportError::ResponseFormat {
                url: id.to_string(),
                message: "entities 为空".to_string(),
            })?;
        self.entities.insert(id.to_string(), entity.clone());
        Ok(entity)
    }

    fn cached_entity(&self, namespace: &str, key: &str) -> ImportResult<Option<Option<Entity>>> {
        match self.cache.get(namespace, key)? {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(value) => serde_json::from_value(value)
                .map(|e| Some(Some(e)))
                .map_err(|e| ImportError::CacheCorrupted {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// 代码命中: 缓存 code → entity
    fn remember_code(&self, code: &str, entity: &Entity) -> ImportResult<Option<Entity>> {
        self.cache
            .put(NAMESPACE_REGION_CODES, code, &serde_json::to_value(entity)?)?;
        Ok(Some(entity.clone()))
    }

    /// 名称命中: 缓存 name → entity，code（若有）→ null
    fn remember_name(&self, name: &str, code: Option<&str>, entity: &Entity) -> ImportResult<Option<Entity>> {
        if let Some(code) = code {
            self.cache.put(NAMESPACE_REGION_CODES, code, &Value::Null)?;
        }
        self.cache
            .put(NAMESPACE_REGION_NAMES, name, &serde_json::to_value(entity)?)?;
        Ok(Some(entity.clone()))
    }

    /// 按 ISO 代码查询：先限定洲/国家，再不限类别
    fn search_by_code(&self, code: &str) -> ImportResult<Option<Entity>> {
        let property = match code_property(code) {
            Some(p) => p,
            None => return Ok(None),
        };
        for (class, entity_type) in CODE_CLASSES {
            let query = sparql::items_by_code(Some(class), property, code, &self.language, self.limit);
            if let Some(first) = self.query_entities(&query, entity_type)?.into_iter().next() {
                return Ok(Some(first));
            }
        }
        let query = sparql::items_by_code(None, property, code, &self.language, self.limit);
        Ok(self.query_entities(&query, OTHER_TYPE)?.into_iter().next())
    }

    fn search_by_name(&self, name: &str) -> ImportResult<Option<Entity>> {
        for (class, entity_type) in NAME_CLASSES {
            let query = sparql::items_by_label(class, name, &self.language, self.limit);
            if let Some(first) = self.query_entities(&query, entity_type)?.into_iter().next() {
                return Ok(Some(first));
            }
        }

        for (class, entity_type) in NAME_CLASSES {
            let query = sparql::items_by_alias_with_population(class, name, &self.language, self.limit);
            if let Some(first) = self.query_entities(&query, entity_type)?.into_iter().next() {
                return Ok(Some(first));
            }

            let query = sparql::items_by_alias(class, name, &self.language, self.limit);
            let mut items = self.query_entities(&query, entity_type)?;
            items.sort_by_key(Entity::numeric_id);
            if let Some(first) = items.into_iter().next() {
                return Ok(Some(first));
            }
        }
        Ok(None)
    }
}

impl LinkedDataResolver for WikidataResolver {
    #[instrument(skip(self))]
    fn resolve_region(&mut self, name: Option<&str>, code: Option<&str>) -> ImportResult<Option<Entity>> {
        // ===== 自定义别名 =====
        if let Some(entity) = code.and_then(|c| self.code_aliases.get(c)) {
            return Ok(Some(entity.clone()));
        }
        if let Some(entity) = name.and_then(|n| self.name_aliases.get(n)) {
            return Ok(Some(entity.clone()));
        }

        // ===== 缓存 =====
        let mut none_match = false;
        if let Some(code) = code {
            match self.cached_entity(NAMESPACE_REGION_CODES, code)? {
                Some(Some(entity)) => return Ok(Some(entity)),
                Some(None) => none_match = true,
                None => {}
            }
        }
        if let Some(name) = name {
            match self.cached_entity(NAMESPACE_REGION_NAMES, name)? {
                Some(Some(entity)) => return Ok(Some(entity)),
                Some(None) => none_match = true,
                None => {}
            }
        }
        if none_match {
            return Ok(None);
        }

        // ===== 按代码 =====
        if let Some(code) = code {
            if let Some(entity) = self.search_by_code(code)? {
                return self.remember_code(code, &entity);
            }
        }

        let name = match name {
            Some(name) => name,
            None => {
                if let Some(code) = code {
                    self.cache.put(NAMESPACE_REGION_CODES, code, &Value::Null)?;
                }
                debug!(?code, "地区代码未解析");
                return Ok(None);
            }
        };

        // ===== 名称本身是代码 =====
        if let Some(entity) = self.search_by_code(name)? {
            return self.remember_name(name, code, &entity);
        }

        // ===== 按名称 =====
        if let Some(entity) = self.search_by_name(name)? {
            return self.remember_name(name, code, &entity);
        }

        if let Some(code) = code {
            self.cache.put(NAMESPACE_REGION_CODES, code, &Value::Null)?;
        }
        self.cache.put(NAMESPACE_REGION_NAMES, name, &Value::Null)?;
        info!(name, "地区未解析，已缓存空结果");
        Ok(None)
    }

    fn item_attributes(
        &mut self,
        item_id: &str,
        request: &ItemRequest,
    ) -> ImportResult<BTreeMap<String, FieldValue>> {
        let mut item: Map<String, Value> = match self.cache.get(NAMESPACE_ITEMS, item_id)? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let mut dirty = false;

        if item.is_empty() {
            let entity = self.entity_document(item_id)?;
            item.insert("name".to_string(), localized(&entity, "labels", &self.language));
            item.insert(
                "description".to_string(),
                localized(&entity, "descriptions", &self.language),
            );
            dirty = true;
        }

        let prefix = &request.prefix;
        let mut result = BTreeMap::new();
        if request.with_id {
            result.insert(format!("{}Id", prefix), FieldValue::Text(item_id.to_string()));
        }
        if request.with_name {
            result.insert(
                format!("{}Name", prefix),
                item.get("name").map(FieldValue::from_json).unwrap_or(FieldValue::Null),
            );
        }
        if request.with_description {
            result.insert(
                format!("{}Description", prefix),
                item.get("description").map(FieldValue::from_json).unwrap_or(FieldValue::Null),
            );
        }

        for property_id in &request.properties {
            let property_name = self.property_name(property_id)?;
            if !item.contains_key(&property_name) {
                let entity = self.entity_document(item_id)?;
                item.insert(property_name.clone(), claim_value(&entity, property_id));
                dirty = true;
            }
            result.insert(
                format!("{}{}", prefix, standardize_property(&property_name)),
                item.get(&property_name).map(FieldValue::from_json).unwrap_or(FieldValue::Null),
            );
        }

        if dirty {
            self.cache.put(NAMESPACE_ITEMS, item_id, &Value::Object(item))?;
        }
        Ok(result)
    }

    fn property_name(&mut self, property_id: &str) -> ImportResult<String> {
        if let Some(Value::String(name)) = self.cache.get(NAMESPACE_PROPERTIES, property_id)? {
            return Ok(name);
        }
        let entity = self.entity_document(property_id)?;
        let name = match localized(&entity, "labels", &self.language) {
            Value::String(name) => name,
            _ => property_id.to_string(),
        };
        self.cache
            .put(NAMESPACE_PROPERTIES, property_id, &Value::String(name.clone()))?;
        Ok(name)
    }

    #[instrument(skip(self))]
    fn items_from_alias(&mut self, instance_of: &str, code: &str) -> ImportResult<Vec<Entity>> {
        let namespace = from_alias_namespace(&self.language, instance_of);
        if let Some(cached) = self.cache.get(&namespace, code)? {
            return serde_json::from_value(cached).map_err(|e| ImportError::CacheCorrupted {
                namespace: namespace.clone(),
                key: code.to_string(),
                message: e.to_string(),
            });
        }

        let query = sparql::items_by_alias(instance_of, code, &self.language, self.limit);
        let mut items = self.query_entities(&query, instance_of)?;
        items.sort_by_key(Entity::numeric_id);
        self.cache.put(&namespace, code, &serde_json::to_value(&items)?)?;
        Ok(items)
    }
}
