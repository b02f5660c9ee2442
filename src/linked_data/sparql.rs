// ==========================================
// 统计数据抽取 - SPARQL 查询构建与结果解析
// ==========================================
// 所有查询返回 ?item ?itemLabel，标签由 wikibase:label 服务按语言填充
// ==========================================

use crate::domain::entity::Entity;
use crate::importer::error::{ImportError, ImportResult};
use crate::linked_data::{PROPERTY_INSTANCE_OF, PROPERTY_POPULATION};
use serde_json::Value;

/// 字符串字面量转义
pub fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn wrap(lang: &str, inner_select: &str, body: &str, limit: u32, order: &str) -> String {
    format!(
        r#"SELECT DISTINCT ?item ?itemLabel WHERE {{
    SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{lang}". }} {{
        SELECT DISTINCT {inner_select} WHERE {{
{body}
        }}
        LIMIT {limit}
    }}
}}{order}"#
    )
}

fn instance_of_clause(instance_of: Option<&str>) -> String {
    match instance_of {
        Some(class) => format!(
            "            ?item p:{p} ?statement0.\n            ?statement0 (ps:{p}) wd:{class}.\n",
            p = PROPERTY_INSTANCE_OF,
        ),
        None => String::new(),
    }
}

/// 按 ISO 代码属性查询（可限定类别）
pub fn items_by_code(instance_of: Option<&str>, code_property: &str, code: &str, lang: &str, limit: u32) -> String {
    let body = format!(
        "{}            ?item p:{p} ?code.\n            ?code (ps:{p}) \"{code}\"",
        instance_of_clause(instance_of),
        p = code_property,
        code = escape_literal(code),
    );
    wrap(lang, "?item", &body, limit, "")
}

/// 按标签精确匹配（不区分大小写）
pub fn items_by_label(instance_of: &str, label: &str, lang: &str, limit: u32) -> String {
    let body = format!(
        "{}            ?item rdfs:label ?label.\n            FILTER(LCASE(?label) = \"{label}\"@{lang})",
        instance_of_clause(Some(instance_of)),
        label = escape_literal(&label.to_lowercase()),
    );
    wrap(lang, "?item", &body, limit, "")
}

/// 别名包含匹配，按人口降序
pub fn items_by_alias_with_population(instance_of: &str, alias: &str, lang: &str, limit: u32) -> String {
    let body = format!(
        "{}            ?item skos:altLabel ?alias.\n            ?item wdt:{pop} ?population.\n            FILTER(CONTAINS(?alias, \"{alias}\"@{lang}))",
        instance_of_clause(Some(instance_of)),
        pop = PROPERTY_POPULATION,
        alias = escape_literal(alias),
    );
    wrap(lang, "?item ?population", &body, limit, "\nORDER BY DESC(?population)")
}

/// 别名包含匹配
pub fn items_by_alias(instance_of: &str, alias: &str, lang: &str, limit: u32) -> String {
    let body = format!(
        "{}            ?item skos:altLabel ?alias.\n            FILTER(CONTAINS(?alias, \"{alias}\"@{lang}))",
        instance_of_clause(Some(instance_of)),
        alias = escape_literal(alias),
    );
    wrap(lang, "?item", &body, limit, "")
}

/// 列出类别下的实体
pub fn items_of_class(instance_of: &str, lang: &str, limit: u32) -> String {
    let body = instance_of_clause(Some(instance_of));
    wrap(lang, "?item", body.trim_end(), limit, "")
}

/// 解析 SPARQL JSON 结果为实体列表
pub fn parse_bindings(response: &Value, entity_type: &str) -> ImportResult<Vec<Entity>> {
    let bindings = response
        .pointer("/results/bindings")
        .and_then(Value::as_array)
        .ok_or_else(|| ImportError::ResponseFormat {
            url: "sparql".to_string(),
            message: "缺少 results.bindings".to_string(),
        })?;

    let mut entities = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let url = match binding.pointer("/item/value").and_then(Value::as_str) {
            Some(url) => url,
            None => continue,
        };
        let label = binding
            .pointer("/itemLabel/value")
            .and_then(Value::as_str)
            .unwrap_or("");
        entities.push(Entity::from_url(url, label, entity_type));
    }
    Ok(entities)
}
