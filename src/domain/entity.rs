// ==========================================
// 统计数据抽取 - 知识库实体
// ==========================================

use serde::{Deserialize, Serialize};

/// 解析到的知识库实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,          // 实体 ID（如 Q16502）
    pub url: String,         // 实体 URL
    pub label: String,       // 标签
    #[serde(rename = "type")]
    pub entity_type: String, // 分类（country / continent / 自定义别名类型）
}

impl Entity {
    /// 由 SPARQL 返回的实体 URL 构建（ID 取 URL 最后一段）
    pub fn from_url(url: &str, label: &str, entity_type: &str) -> Self {
        let id = url.rsplit('/').next().unwrap_or(url).to_string();
        Self {
            id,
            url: url.to_string(),
            label: label.to_string(),
            entity_type: entity_type.to_string(),
        }
    }

    /// ID 的数值部分（Q16502 → 16502），用于稳定排序
    pub fn numeric_id(&self) -> u64 {
        self.id
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .parse()
            .unwrap_or(u64::MAX)
    }
}

// ==========================================
// ItemRequest - 实体属性请求
// ==========================================
// 指定需要输出的补充列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub with_id: bool,
    pub with_name: bool,
    pub with_description: bool,
    pub properties: Vec<String>, // 属性 ID（如 P297）
    pub prefix: String,          // 列名前缀（如 "Wikidata"）
}
