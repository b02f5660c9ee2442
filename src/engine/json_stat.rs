// ==========================================
// 统计数据抽取 - JSON-stat 展开
// ==========================================
// 职责: JSON-stat 数据集 → 扁平表格
// 输出列: "values" + 每个维度的标签
// 规则: 第 k 个维度的类别在值数组上按 (i / number) % n 循环，
//       number = total / (前序维度类别数之积 × n)
// ==========================================

use crate::domain::table::DataTable;
use crate::domain::types::FieldValue;
use crate::importer::error::{ImportError, ImportResult};
use serde_json::Value;

pub const COLUMN_VALUES: &str = "values";

/// 一个维度的有序类别标签
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub id: String,
    pub label: String,
    pub categories: Vec<String>,
}

fn format_error(message: impl Into<String>) -> ImportError {
    ImportError::ResponseFormat {
        url: "json-stat".to_string(),
        message: message.into(),
    }
}

/// 数据集主体：兼容 {"dataset": {...}} 与 2.0 版顶层数据集
fn dataset(document: &Value) -> &Value {
    document.get("dataset").unwrap_or(document)
}

/// 读取维度及其类别顺序
///
/// 类别顺序取 category.index（对象: 代码 → 位置；或数组: 代码列表），
/// 缺失时按 category.label 的键顺序；标签缺失时使用代码
pub fn dimensions(document: &Value) -> ImportResult<Vec<Dimension>> {
    let dataset = dataset(document);
    let dimension_root = dataset
        .get("dimension")
        .ok_or_else(|| format_error("缺少 dimension"))?;
    let ids = dimension_root
        .get("id")
        .or_else(|| dataset.get("id"))
        .and_then(Value::as_array)
        .ok_or_else(|| format_error("缺少 dimension.id"))?;

    let mut dimensions = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.as_str().ok_or_else(|| format_error("维度 ID 不是文本"))?;
        let dimension = dimension_root
            .get(id)
            .ok_or_else(|| format_error(format!("缺少维度 {}", id)))?;
        let category = dimension
            .get("category")
            .ok_or_else(|| format_error(format!("维度 {} 缺少 category", id)))?;
        let labels = category.get("label").and_then(Value::as_object);

        let codes: Vec<String> = match category.get("index") {
            Some(Value::Array(codes)) => codes
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect(),
            Some(Value::Object(positions)) => {
                let mut ordered: Vec<(u64, &String)> = positions
                    .iter()
                    .map(|(code, pos)| (pos.as_u64().unwrap_or(u64::MAX), code))
                    .collect();
                ordered.sort();
                ordered.into_iter().map(|(_, code)| code.clone()).collect()
            }
            _ => labels
                .map(|l| l.keys().cloned().collect())
                .unwrap_or_default(),
        };

        let categories = codes
            .iter()
            .map(|code| {
                labels
                    .and_then(|l| l.get(code))
                    .and_then(Value::as_str)
                    .unwrap_or(code)
                    .to_string()
            })
            .collect();

        dimensions.push(Dimension {
            id: id.to_string(),
            label: dimension
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or(id)
                .to_string(),
            categories,
        });
    }
    Ok(dimensions)
}

/// 读取值数组（对象形式的稀疏值按下标展开，缺失为 Null）
fn values(dataset: &Value, total: usize) -> ImportResult<Vec<FieldValue>> {
    match dataset.get("value") {
        Some(Value::Array(values)) => Ok(values.iter().map(FieldValue::from_json).collect()),
        Some(Value::Object(sparse)) => {
            let mut out = vec![FieldValue::Null; total];
            for (index, value) in sparse {
                let i: usize = index
                    .parse()
                    .map_err(|_| format_error(format!("值下标非法: {}", index)))?;
                if i < total {
                    out[i] = FieldValue::from_json(value);
                }
            }
            Ok(out)
        }
        _ => Err(format_error("缺少 value")),
    }
}

/// 展开 JSON-stat 数据集
pub fn unpivot(document: &Value) -> ImportResult<DataTable> {
    let dimensions = dimensions(document)?;
    let total: usize = dimensions.iter().map(|d| d.categories.len()).product();
    let values = values(dataset(document), total)?;
    if values.len() != total {
        return Err(format_error(format!(
            "值数量 {} 与维度类别数之积 {} 不一致",
            values.len(),
            total
        )));
    }

    let mut columns = vec![COLUMN_VALUES.to_string()];
    let mut dimension_columns: Vec<Vec<&str>> = Vec::with_capacity(dimensions.len());
    let mut length = 1usize;
    for dimension in &dimensions {
        let n = dimension.categories.len();
        if n == 0 {
            return Err(format_error(format!("维度 {} 没有类别", dimension.id)));
        }
        let number = total / (length * n);
        let column = (0..total)
            .map(|i| dimension.categories[(i / number) % n].as_str())
            .collect();
        dimension_columns.push(column);
        columns.push(dimension.label.clone());
        length *= n;
    }

    let mut table = DataTable::new(columns);
    for (i, value) in values.into_iter().enumerate() {
        let mut row = Vec::with_capacity(dimension_columns.len() + 1);
        row.push(value);
        for column in &dimension_columns {
            row.push(FieldValue::Text(column[i].to_string()));
        }
        table.rows.push(row);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_by_three() -> Value {
        json!({"dataset": {
            "dimension": {
                "id": ["Jahr", "Kanton"],
                "size": [2, 3],
                "Jahr": {"label": "Jahr", "category": {
                    "index": {"2020": 0, "2021": 1},
                    "label": {"2020": "2020", "2021": "2021"}
                }},
                "Kanton": {"label": "Kanton", "category": {
                    "index": {"ZH": 0, "BE": 1, "LU": 2},
                    "label": {"ZH": "Zürich", "BE": "Bern", "LU": "Luzern"}
                }}
            },
            "value": [1, 2, 3, 4, 5, 6]
        }})
    }

    #[test]
    fn test_unpivot_row_major() {
        let table = unpivot(&two_by_three()).unwrap();
        assert_eq!(table.columns, vec!["values", "Jahr", "Kanton"]);
        assert_eq!(table.len(), 6);
        assert_eq!(
            table.rows[4],
            vec![
                FieldValue::Integer(5),
                FieldValue::Text("2021".to_string()),
                FieldValue::Text("Bern".to_string()),
            ]
        );
        let cantons: Vec<String> = table
            .column("Kanton")
            .unwrap()
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(cantons, vec!["Zürich", "Bern", "Luzern", "Zürich", "Bern", "Luzern"]);
    }

    #[test]
    fn test_index_as_array() {
        let doc = json!({
            "id": ["sex"],
            "value": [10.5, null],
            "dimension": {"sex": {"category": {"index": ["M", "F"], "label": {"M": "male", "F": "female"}}}}
        });
        let table = unpivot(&doc).unwrap();
        assert_eq!(table.columns, vec!["values", "sex"]);
        assert_eq!(table.rows[0], vec![FieldValue::Number(10.5), FieldValue::Text("male".to_string())]);
        assert_eq!(table.rows[1][0], FieldValue::Null);
    }

    #[test]
    fn test_size_mismatch_is_error() {
        let mut doc = two_by_three();
        doc["dataset"]["value"] = json!([1, 2, 3]);
        assert!(matches!(unpivot(&doc), Err(ImportError::ResponseFormat { .. })));
    }
}
