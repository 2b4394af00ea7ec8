//! 表单字段定义

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 显式声明的控件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Dropdown,
}

/// 字段校验规则
///
/// 每个规则同时提供判定函数 `check` 和错误信息函数 `error_message`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldRule {
    /// 不校验
    #[default]
    Any,
    /// 非空
    Required,
    /// MM/DD/YYYY 格式的合法日期
    UsDate,
    /// 0 < 小时数 <= 24
    Hours,
    /// 非空且不超过给定字符数
    MaxLength(usize),
}

impl FieldRule {
    pub fn check(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            FieldRule::Any => true,
            FieldRule::Required => !value.is_empty(),
            FieldRule::UsDate => NaiveDate::parse_from_str(value, "%m/%d/%Y").is_ok(),
            FieldRule::Hours => value
                .parse::<f64>()
                .map(|h| h > 0.0 && h <= 24.0)
                .unwrap_or(false),
            FieldRule::MaxLength(max) => !value.is_empty() && value.chars().count() <= *max,
        }
    }

    pub fn error_message(&self, label: &str, value: &str) -> String {
        match self {
            FieldRule::Any => format!("{} 的值无效", label),
            FieldRule::Required => format!("{} 不能为空", label),
            FieldRule::UsDate => format!("{} 必须是 MM/DD/YYYY 格式的日期: '{}'", label, value),
            FieldRule::Hours => format!("{} 必须是 0 到 24 之间的小时数: '{}'", label, value),
            FieldRule::MaxLength(max) => format!(
                "{} 不能为空且不能超过 {} 个字符 (当前 {})",
                label,
                max,
                value.chars().count()
            ),
        }
    }
}

/// 表单字段定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// 字段键（与条目取值对应）
    pub key: String,
    /// 人类可读的标签
    pub label: String,
    /// CSS 定位器，为空表示配置缺失
    #[serde(default)]
    pub locator: String,
    /// 显式控件类型，缺省时根据 ARIA 属性判断
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default)]
    pub rule: FieldRule,
    #[serde(default)]
    pub optional: bool,
    /// 固定注入值，优先于条目中的值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject_value: Option<String>,
}

impl FieldSpec {
    pub fn new(key: &str, label: &str, locator: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            locator: locator.to_string(),
            field_type: None,
            rule: FieldRule::Any,
            optional: false,
            inject_value: None,
        }
    }

    pub fn dropdown(mut self) -> Self {
        self.field_type = Some(FieldType::Dropdown);
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// 校验字段值，失败时返回错误信息
    pub fn validate(&self, value: &str) -> Result<(), String> {
        if self.rule.check(value) {
            Ok(())
        } else {
            Err(self.rule.error_message(&self.label, value))
        }
    }
}
