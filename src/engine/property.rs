// ==========================================
// 统计数据抽取 - 属性名标准化
// ==========================================
// "ISO 3166-1 alpha-2 code" → "Iso3166_1Alpha_2Code"
// ==========================================

/// 将属性/表头名转为列名：`-` 换成 `_`，按空格切词，
/// 每个词首字母大写、其余小写后拼接
pub fn standardize_property(words: &str) -> String {
    words
        .replace('-', "_")
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut out: String = first.to_uppercase().collect();
                    out.push_str(&chars.as_str().to_lowercase());
                    out
                }
                None => String::new(),
            }
        })
        .collect()
}
