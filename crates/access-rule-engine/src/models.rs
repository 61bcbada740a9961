//! 规则引擎领域模型

use crate::error::{Result, RuleError};
use crate::operators::{Operator, RuleOperator};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 单条规则
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// 点号分隔的字段路径，如 "role" 或 "profile.isActive()"
    pub field: String,
    /// 未声明时为 `None`，评估时使用配置的默认操作符
    pub operator: Option<RuleOperator>,
    pub value: Value,
}

impl Rule {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: Some(RuleOperator::Supported(operator)),
            value: value.into(),
        }
    }

    /// 从 JSON 对象读取规则
    ///
    /// 只要是对象就能得到规则：非字符串的 `field` 记为空，`null` 的 `operator` 等同缺失，
    /// 其他非字符串的 `operator` 记为不支持，缺失的 `value` 记为 `null`，这些规则在评估时判定为不匹配。
    /// 非对象返回 `None`。
    pub fn from_json(raw: &JsonValue) -> Option<Self> {
        let object = raw.as_object()?;

        let field = object
            .get("field")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        let operator = object
            .get("operator")
            .filter(|op| !op.is_null())
            .map(|op| match op.as_str() {
                Some(s) => RuleOperator::from(s),
                None => RuleOperator::Unsupported(op.to_string()),
            });

        let value = object.get("value").map(Value::from).unwrap_or_default();

        Some(Self {
            field,
            operator,
            value,
        })
    }
}

/// 规则集
///
/// 有序的规则列表，按 AND 语义评估。可以携带动作名称等元数据。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "JsonValue")]
pub struct RuleSet {
    pub action: Option<String>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            action: None,
            rules,
        }
    }

    pub fn for_action(action: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            action: Some(action.into()),
            rules,
        }
    }

    /// 从已解码的 JSON 读取规则集
    ///
    /// 支持两种形式：
    /// - 规则数组：`[{"field": ..., "operator": ..., "value": ...}, ...]`
    /// - 信封对象：`{"action": "submit_form", "rules": [...]}`
    pub fn from_json(raw: &JsonValue) -> Result<Self> {
        let (action, rules) = match raw {
            JsonValue::Array(_) => (None, raw),
            JsonValue::Object(envelope) => {
                let rules = envelope.get("rules").ok_or_else(|| {
                    RuleError::InvalidRuleSet("规则集对象缺少 rules 字段".to_string())
                })?;
                let action = envelope
                    .get("action")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string);
                (action, rules)
            }
            other => {
                return Err(RuleError::InvalidRuleSet(format!(
                    "规则集必须是数组或对象，实际为 {}",
                    json_type_name(other)
                )));
            }
        };

        let items = rules.as_array().ok_or_else(|| {
            RuleError::InvalidRuleSet(format!(
                "rules 必须是数组，实际为 {}",
                json_type_name(rules)
            ))
        })?;

        let rules = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                Rule::from_json(item).ok_or_else(|| {
                    RuleError::InvalidRuleSet(format!(
                        "rules[{}] 必须是对象，实际为 {}",
                        i,
                        json_type_name(item)
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rule_set = Self { action, rules };
        rule_set.validate()?;
        Ok(rule_set)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: JsonValue = serde_json::from_str(json)?;
        Self::from_json(&raw)
    }

    /// 规则集必须至少包含一条规则
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(RuleError::InvalidRuleSet("规则列表不能为空".to_string()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }
}

impl TryFrom<JsonValue> for RuleSet {
    type Error = RuleError;

    fn try_from(raw: JsonValue) -> Result<Self> {
        Self::from_json(&raw)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// 单条规则的评估结果
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub index: usize,
    pub field: String,
    pub operator: String,
    /// 解析出的实际值；字段为空或操作符不支持时未解析
    pub actual: Option<Value>,
    pub expected: Value,
    pub matched: bool,
}

/// 评估报告
///
/// 评估同样短路，第一条不匹配的规则之后的规则不会出现在 `outcomes` 中。
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub matched: bool,
    pub action: Option<String>,
    pub outcomes: Vec<RuleOutcome>,
    pub evaluation_trace: Vec<String>,
}

impl EvaluationReport {
    pub fn new(action: Option<String>) -> Self {
        Self {
            matched: false,
            action,
            outcomes: Vec::new(),
            evaluation_trace: Vec::new(),
        }
    }

    /// 第一条不匹配的规则
    pub fn failed_rule(&self) -> Option<&RuleOutcome> {
        self.outcomes.iter().find(|o| !o.matched)
    }
}
