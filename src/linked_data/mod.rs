// ==========================================
// 统计数据抽取 - 知识库关联层
// ==========================================
// 职责: 地区名/代码 → 知识库实体，实体 → 补充列
// 红线: 未解析的实体填 Null，不中断输出
// ==========================================

pub mod resolver;
pub mod sparql;
pub mod wikidata_resolver;

pub use resolver::{EnrichmentOptions, LinkedDataResolver, LINKED_COLUMN_PREFIX};
pub use wikidata_resolver::{HttpLinkedDataTransport, LinkedDataTransport, WikidataResolver};

// ==========================================
// 知识库类别 / 属性 ID
// ==========================================
pub const ELEMENT_COUNTRY: &str = "Q6256";
pub const ELEMENT_CONTINENT: &str = "Q5107";
pub const ELEMENT_CANTON_CH: &str = "Q23058";
pub const ELEMENT_SUBCONTINENT: &str = "Q855697";
pub const ELEMENT_GEOPOLITICAL_REGION: &str = "Q82794";
pub const ELEMENT_SUBREGION: &str = "Q7631958";
pub const ELEMENT_ELECTORAL_DISTRICT: &str = "Q192611";
pub const ELEMENT_POLITICAL_TERRITORY_ENTITY: &str = "Q1048835";
pub const ELEMENT_WORLD: &str = "Q16502";

pub const PROPERTY_INSTANCE_OF: &str = "P31";
pub const PROPERTY_ISO_3166_1_ALPHA_2: &str = "P297";
pub const PROPERTY_ISO_3166_1_ALPHA_3: &str = "P298";
pub const PROPERTY_ISO_3166_1_NUMERIC: &str = "P299";
pub const PROPERTY_ISO_3166_2: &str = "P300";
pub const PROPERTY_POPULATION: &str = "P1082";

/// SPARQL 返回的实体 URL 前缀
pub const ENTITY_URL_PREFIX: &str = "http://www.wikidata.org/entity/";
