// ==========================================
// 统计数据抽取 - 单位领域模型
// ==========================================
// value_in_base_unit = value_in_original_unit * scale_factor
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// CanonicalUnit - 规范单位
// ==========================================
// 红线: postfix 改变语义但不改变量级，不可丢弃
// 红线: scale_factor > 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalUnit {
    pub base_unit: String,  // 基础单位（J / W / m / m³ / tonnes 及其复合）
    pub postfix: String,    // 限定后缀（含前导空格，如 " per capita"），无则为空
    pub scale_factor: f64,  // 到基础单位的乘数
}

impl CanonicalUnit {
    pub fn new(base_unit: impl Into<String>, postfix: impl Into<String>, scale_factor: f64) -> Self {
        Self {
            base_unit: base_unit.into(),
            postfix: postfix.into(),
            scale_factor,
        }
    }

    /// 展示用单位文本：基础单位 + 限定后缀
    pub fn display(&self) -> String {
        format!("{}{}", self.base_unit, self.postfix)
    }

    /// 两个单位是否可直接比较（基础单位与限定后缀都一致）
    pub fn is_comparable(&self, other: &CanonicalUnit) -> bool {
        self.base_unit == other.base_unit && self.postfix == other.postfix
    }
}

// ==========================================
// UnitDefinition - 工作表单位的三种表示
// ==========================================
// 对应输出模式: original / normalized / iso
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub original: String,    // 单元格原文（已 trim）
    pub normalized: String,  // 归一化文本
    pub iso: CanonicalUnit,  // 规范单位
}
