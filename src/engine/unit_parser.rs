// ==========================================
// 统计数据抽取 - 单位解析引擎
// ==========================================
// 职责: 自由文本单位 → (基础单位, 限定后缀, 换算系数)
// 红线: 限定后缀只改语义不改量级，必须保留
// 红线: 复合单位的分子/分母不允许带限定后缀
// ==========================================
// 解析顺序（每步作用于工作副本）:
// 1. 去掉尾部注释标记 "*"
// 2. 限定后缀（首个命中）→ postfix
// 3. 单位族后缀（首个命中）→ 解析后拼回单位名
// 4. 量级前缀（至多一个）
// 5. 同义词表 → ISO 单位
// 6. "A / B" 复合单位：两侧分别走 1,3-5
// ==========================================

use crate::domain::unit::{CanonicalUnit, UnitDefinition};
use crate::importer::error::{ImportError, ImportResult};
use std::collections::BTreeMap;

// ==========================================
// 词缀规则表
// ==========================================

/// 词缀命中后的效果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AffixEffect {
    Decorative,     // 注释标记，丢弃
    Qualifier,      // 限定后缀 → postfix
    Family,         // 单位族后缀 → 拼回单位名
    Magnitude(f64), // 量级前缀 → 乘以系数
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffixRule {
    pub pattern: &'static str,
    pub effect: AffixEffect,
}

const fn rule(pattern: &'static str, effect: AffixEffect) -> AffixRule {
    AffixRule { pattern, effect }
}

pub const ANNOTATION_SUFFIXES: &[AffixRule] = &[rule("*", AffixEffect::Decorative)];

pub const QUALIFIER_POSTFIXES: &[AffixRule] = &[
    rule(" (input-equivalent)", AffixEffect::Qualifier),
    rule(" per capita", AffixEffect::Qualifier),
    rule(" daily", AffixEffect::Qualifier),
    rule(" per year", AffixEffect::Qualifier),
    rule(" per day", AffixEffect::Qualifier),
];

pub const FAMILY_POSTFIXES: &[AffixRule] = &[
    rule(" of carbon dioxide", AffixEffect::Family),
    rule(" of oil equivalent", AffixEffect::Family),
    rule(" of lithium content", AffixEffect::Family),
    rule("1", AffixEffect::Family),
    rule("*", AffixEffect::Family),
];

// 顺序有意义: "thousand million " 必须先于 "thousand "
pub const MAGNITUDE_PREFIXES: &[AffixRule] = &[
    rule("kilo", AffixEffect::Magnitude(1e3)),
    rule("mega", AffixEffect::Magnitude(1e6)),
    rule("giga", AffixEffect::Magnitude(1e9)),
    rule("tera", AffixEffect::Magnitude(1e12)),
    rule("peta", AffixEffect::Magnitude(1e15)),
    rule("exa", AffixEffect::Magnitude(1e18)),
    rule("thousand million ", AffixEffect::Magnitude(1e9)),
    rule("thousand ", AffixEffect::Magnitude(1e3)),
    rule("million ", AffixEffect::Magnitude(1e6)),
    rule("billion ", AffixEffect::Magnitude(1e9)),
    rule("trillion ", AffixEffect::Magnitude(1e12)),
];

/// 首个命中的后缀规则：返回 (剩余文本, 命中规则)
pub fn strip_suffix_rule<'t>(text: &'t str, rules: &[AffixRule]) -> (&'t str, Option<AffixRule>) {
    for r in rules {
        if let Some(rest) = text.strip_suffix(r.pattern) {
            return (rest, Some(*r));
        }
    }
    (text, None)
}

/// 首个命中的前缀规则：返回 (剩余文本, 命中规则)
pub fn strip_prefix_rule<'t>(text: &'t str, rules: &[AffixRule]) -> (&'t str, Option<AffixRule>) {
    for r in rules {
        if let Some(rest) = text.strip_prefix(r.pattern) {
            return (rest, Some(*r));
        }
    }
    (text, None)
}

// ==========================================
// 同义词 → ISO 单位表
// ==========================================
// (名称, ISO 单位, 系数)；名称比较不区分大小写
pub const STATIC_SYNONYMS: &[(&str, &str, f64)] = &[
    // 1 metric tonne = 2204.62 lb
    ("lb", "tonnes", 2204.62),
    ("pounds", "tonnes", 2204.62),
    ("short tons", "tonnes", 1.1023),
    // 1 kilolitre = 6.2898 barrels
    ("barrels", "m³", 6.2898),
    ("litres", "m³", 1000.0),
    // 1 kilojoule = 0.239 kcal = 0.948 Btu
    ("kilocalorie", "J", 1.0 / 239.0),
    ("kcal", "J", 1.0 / 239.0),
    ("calorie", "J", 1.0 / 0.239),
    ("cal", "J", 1.0 / 0.239),
    ("Btu", "J", 1.0 / 948.0),
    // 1 boe = 5.8 million Btu = 6.119 million kJ
    ("barrel of oil equivalent", "J", 6_119_000.0),
    // 1 kWh = 3600 kJ
    ("kilowatt-hour", "J", 3.6),
    ("kilowatt-hours", "J", 3.6),
    ("kWh", "J", 3.6),
    ("watt-hour", "J", 3600.0),
    ("watt-hours", "J", 3600.0),
    ("Wh", "J", 3600.0),
    ("cubic meters", "m³", 1.0),
    ("cubic meter", "m³", 1.0),
    ("meters", "m", 1.0),
    ("meter", "m", 1.0),
    ("joules", "J", 1.0),
    ("joule", "J", 1.0),
    ("cubic feets", "m³", 35.3146667),
    ("cubic feet", "m³", 35.3146667),
    ("watts", "W", 1.0),
    ("watt", "W", 1.0),
];

/// 同义词表项
#[derive(Debug, Clone, PartialEq)]
pub struct IsoSynonym {
    pub unit: String,
    pub factor: f64,
}

// ==========================================
// 单位文本归一化
// ==========================================

/// 归一化单位文本（纯函数，幂等）
///
/// trim → 小写 → 去掉开头 "1 " → "/" 两侧加空格 → 合并空白
/// → "equiv." 展开 → " daily" 改为 " per day"
pub fn normalize_unit(unit: &str) -> String {
    let lowered = unit.trim().to_lowercase();
    let without_one = lowered.strip_prefix("1 ").unwrap_or(&lowered);
    let spaced = without_one.replace('/', " / ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("equiv.", "equivalent")
        .replace(" daily", " per day")
}

/// 复合单位中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    Whole,
    Numerator,
    Denominator,
}

impl Operand {
    fn describe(self) -> &'static str {
        match self {
            Operand::Whole => "整体",
            Operand::Numerator => "分子",
            Operand::Denominator => "分母",
        }
    }
}

// ==========================================
// UnitParser - 单位解析器
// ==========================================
// 构建后只读；换算表加载时追加 "us gallons" 等派生同义词
#[derive(Debug, Clone)]
pub struct UnitParser {
    synonyms: BTreeMap<String, IsoSynonym>,
}

impl Default for UnitParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitParser {
    /// 使用静态同义词表创建
    pub fn new() -> Self {
        let mut parser = Self {
            synonyms: BTreeMap::new(),
        };
        for (name, unit, factor) in STATIC_SYNONYMS {
            parser.add_synonym(name, unit, *factor);
        }
        parser
    }

    /// 追加/覆盖同义词
    pub fn add_synonym(&mut self, name: &str, unit: &str, factor: f64) {
        self.synonyms.insert(
            name.to_lowercase(),
            IsoSynonym {
                unit: unit.to_string(),
                factor,
            },
        );
    }

    pub fn synonym(&self, name: &str) -> Option<&IsoSynonym> {
        self.synonyms.get(&name.to_lowercase())
    }

    pub fn synonyms(&self) -> impl Iterator<Item = (&String, &IsoSynonym)> {
        self.synonyms.iter()
    }

    /// 解析原始单位文本（先归一化）
    pub fn parse(&self, unit_text: &str) -> ImportResult<CanonicalUnit> {
        self.resolve(&normalize_unit(unit_text))
    }

    /// 构建工作表单位的三种表示
    pub fn definition(&self, original: &str) -> ImportResult<UnitDefinition> {
        let original = original.trim().to_string();
        let normalized = normalize_unit(&original);
        let iso = self.resolve(&normalized)?;
        Ok(UnitDefinition {
            original,
            normalized,
            iso,
        })
    }

    /// 解析已归一化的单位文本
    pub fn resolve(&self, normalized: &str) -> ImportResult<CanonicalUnit> {
        let text = normalized.trim();

        let (base_unit, postfix, factor) = if text.contains('/') {
            let parts: Vec<&str> = text.split('/').collect();
            if parts.len() != 2 {
                return Err(ImportError::MalformedUnit {
                    unit: normalized.to_string(),
                    message: "复合单位只允许一个 \"/\"".to_string(),
                });
            }
            let (num_unit, num_factor) =
                self.resolve_operand(normalized, parts[0].trim(), Operand::Numerator)?;
            let (den_unit, den_factor) =
                self.resolve_operand(normalized, parts[1].trim(), Operand::Denominator)?;
            (
                format!("{} / {}", num_unit, den_unit),
                String::new(),
                num_factor / den_factor,
            )
        } else {
            let (rest, _) = strip_suffix_rule(text, ANNOTATION_SUFFIXES);
            let (rest, qualifier) = strip_suffix_rule(rest, QUALIFIER_POSTFIXES);
            let postfix = qualifier.map(|r| r.pattern.to_string()).unwrap_or_default();
            let (unit, factor) = self.resolve_operand(normalized, rest, Operand::Whole)?;
            (unit, postfix, factor)
        };

        if !(factor.is_finite() && factor > 0.0) {
            return Err(ImportError::InvalidScaleFactor {
                unit: normalized.to_string(),
                factor,
            });
        }

        Ok(CanonicalUnit::new(base_unit, postfix, factor))
    }

    /// 解析单个单位（步骤 1, 3-5）
    fn resolve_operand(
        &self,
        full_unit: &str,
        text: &str,
        operand: Operand,
    ) -> ImportResult<(String, f64)> {
        let (text, _) = strip_suffix_rule(text, ANNOTATION_SUFFIXES);

        if operand != Operand::Whole {
            if let (_, Some(qualifier)) = strip_suffix_rule(text, QUALIFIER_POSTFIXES) {
                return Err(ImportError::UnitQualifierInOperand {
                    unit: full_unit.to_string(),
                    operand: operand.describe(),
                    postfix: qualifier.pattern.to_string(),
                });
            }
        }

        // 同义词表中原样存在的名称直接命中（如 "kilowatt-hour"、"barrel of oil equivalent"）
        if let Some(synonym) = self.synonym(text) {
            return Ok((synonym.unit.clone(), synonym.factor));
        }

        let (text, family) = strip_suffix_rule(text, FAMILY_POSTFIXES);
        let family = family.map(|r| r.pattern).unwrap_or("");

        let (mut name, mut factor) = match strip_prefix_rule(text, MAGNITUDE_PREFIXES) {
            (rest, Some(AffixRule {
                effect: AffixEffect::Magnitude(m),
                ..
            })) => (rest.to_string(), m),
            _ => (text.to_string(), 1.0),
        };

        if let Some(synonym) = self.synonym(&name) {
            factor *= synonym.factor;
            name = synonym.unit.clone();
        }

        Ok((format!("{}{}", name, family), factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = expected.abs() * 1e-12;
        assert!(
            (actual - expected).abs() <= tolerance,
            "actual={} expected={}",
            actual,
            expected
        );
    }

    // ==========================================
    // 归一化
    // ==========================================

    #[test]
    fn test_normalize_unit() {
        assert_eq!(normalize_unit("  Exajoules "), "exajoules");
        assert_eq!(normalize_unit("Thousand barrels daily"), "thousand barrels per day");
        assert_eq!(normalize_unit("1 Tonne/year"), "tonne / year");
        assert_eq!(normalize_unit("Million tonnes oil equiv."), "million tonnes oil equivalent");
    }

    #[test]
    fn test_normalize_unit_idempotent() {
        for raw in ["US dollars/barrel", "Thousand barrels daily", "1 kWh", "Exajoules  (input-equivalent)"] {
            let once = normalize_unit(raw);
            assert_eq!(normalize_unit(&once), once);
        }
    }

    // ==========================================
    // 量级前缀 / 同义词
    // ==========================================

    #[test]
    fn test_parse_exajoules() {
        let unit = UnitParser::new().parse("Exajoules").unwrap();
        assert_eq!(unit, CanonicalUnit::new("J", "", 1e18));
    }

    #[test]
    fn test_parse_megawatts() {
        let unit = UnitParser::new().parse("Megawatts").unwrap();
        assert_eq!(unit, CanonicalUnit::new("W", "", 1e6));
    }

    #[test]
    fn test_every_static_synonym_parses_to_literal_factor() {
        let parser = UnitParser::new();
        for (name, unit, factor) in STATIC_SYNONYMS {
            let parsed = parser.parse(name).unwrap();
            assert_eq!(&parsed.base_unit, unit, "unit of {}", name);
            assert_close(parsed.scale_factor, *factor);
            assert_eq!(parsed.postfix, "");
        }
    }

    #[test]
    fn test_plurality_invariance() {
        let parser = UnitParser::new();
        for (singular, plural) in [
            ("kilowatt-hour", "kilowatt-hours"),
            ("terawatt-hour", "terawatt-hours"),
            ("joule", "joules"),
            ("cubic meter", "cubic meters"),
        ] {
            assert_eq!(parser.parse(singular).unwrap(), parser.parse(plural).unwrap());
        }
    }

    #[test]
    fn test_magnitude_word_prefixes() {
        let parser = UnitParser::new();
        assert_close(parser.parse("Thousand million cubic feet").unwrap().scale_factor, 1e9 * 35.3146667);
        assert_close(parser.parse("Billion cubic meters").unwrap().scale_factor, 1e9);
        assert_close(parser.parse("Trillion cubic feet").unwrap().scale_factor, 1e12 * 35.3146667);
        assert_eq!(parser.parse("Terawatt-hours").unwrap().base_unit, "J");
        assert_close(parser.parse("Terawatt-hours").unwrap().scale_factor, 3600.0 * 1e12);
    }

    #[test]
    fn test_unknown_unit_passes_through() {
        let unit = UnitParser::new().parse("US dollars").unwrap();
        assert_eq!(unit, CanonicalUnit::new("us dollars", "", 1.0));
    }

    // ==========================================
    // 后缀
    // ==========================================

    #[test]
    fn test_qualifier_postfix_preserved() {
        let parser = UnitParser::new();
        let unit = parser.parse("Exajoules (input-equivalent)").unwrap();
        assert_eq!(unit, CanonicalUnit::new("J", " (input-equivalent)", 1e18));

        let unit = parser.parse("Gigajoules per capita").unwrap();
        assert_eq!(unit, CanonicalUnit::new("J", " per capita", 1e9));
    }

    #[test]
    fn test_daily_becomes_per_day() {
        let unit = UnitParser::new().parse("Thousand barrels daily").unwrap();
        assert_eq!(unit.base_unit, "m³");
        assert_eq!(unit.postfix, " per day");
        assert_close(unit.scale_factor, 6.2898 * 1e3);
    }

    #[test]
    fn test_family_postfix_folded_into_unit() {
        let parser = UnitParser::new();
        let unit = parser.parse("Million tonnes of carbon dioxide").unwrap();
        assert_eq!(unit, CanonicalUnit::new("tonnes of carbon dioxide", "", 1e6));

        let unit = parser.parse("Million tonnes of oil equivalent").unwrap();
        assert_eq!(unit, CanonicalUnit::new("tonnes of oil equivalent", "", 1e6));
    }

    #[test]
    fn test_trailing_annotation_dropped() {
        let unit = UnitParser::new().parse("Terawatt-hours*").unwrap();
        assert_eq!(unit.base_unit, "J");
        assert_eq!(unit.postfix, "");
    }

    #[test]
    fn test_footnote_digit_is_family_postfix() {
        let unit = UnitParser::new().parse("Tonnes1").unwrap();
        assert_eq!(unit, CanonicalUnit::new("tonnes1", "", 1.0));
    }

    // ==========================================
    // 复合单位
    // ==========================================

    #[test]
    fn test_compound_factor_law() {
        let parser = UnitParser::new();
        let cases = [
            ("kilowatt-hours", "cubic feet"),
            ("Thousand barrels", "Million tonnes"),
            ("exajoules", "litres"),
        ];
        for (a, b) in cases {
            let compound = parser.parse(&format!("{} / {}", a, b)).unwrap();
            let num = parser.parse(a).unwrap();
            let den = parser.parse(b).unwrap();
            assert_close(compound.scale_factor, num.scale_factor / den.scale_factor);
            assert_eq!(compound.base_unit, format!("{} / {}", num.base_unit, den.base_unit));
        }
    }

    #[test]
    fn test_compound_rejects_qualifier_in_denominator() {
        let err = UnitParser::new().parse("tonnes / barrels per day").unwrap_err();
        assert!(matches!(
            err,
            ImportError::UnitQualifierInOperand { operand: "分母", .. }
        ));
    }

    #[test]
    fn test_compound_rejects_qualifier_in_numerator() {
        let err = UnitParser::new().parse("gigajoules per capita / litres").unwrap_err();
        assert!(matches!(
            err,
            ImportError::UnitQualifierInOperand { operand: "分子", .. }
        ));
    }

    #[test]
    fn test_compound_with_two_slashes_is_malformed() {
        let err = UnitParser::new().parse("a / b / c").unwrap_err();
        assert!(matches!(err, ImportError::MalformedUnit { .. }));
    }

    #[test]
    fn test_added_synonym_is_used() {
        let mut parser = UnitParser::new();
        parser.add_synonym("us gallons", "m³", 0.14969724);
        let unit = parser.parse("Million US gallons").unwrap();
        assert_eq!(unit.base_unit, "m³");
        assert_close(unit.scale_factor, 0.14969724 * 1e6);
    }

    #[test]
    fn test_definition_keeps_three_forms() {
        let definition = UnitParser::new().definition(" Exajoules ").unwrap();
        assert_eq!(definition.original, "Exajoules");
        assert_eq!(definition.normalized, "exajoules");
        assert_eq!(definition.iso, CanonicalUnit::new("J", "", 1e18));
    }
}
