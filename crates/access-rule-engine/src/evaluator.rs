//! 条件评估器
//!
//! 对解析出的实际值和规则中的期望值做类型感知的比较。所有操作符与类型的组合都有确定结果，
//! 不会返回错误：无法比较的形状一律视为不匹配。

use crate::config::EngineSettings;
use crate::operators::Operator;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::borrow::Cow;
use std::cmp::Ordering;

/// 内置的无时区日期时间格式，按 UTC 解释
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// 内置的纯日期格式，取当天零点
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// 条件评估器
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    /// 额外的日期格式，在内置格式之后尝试
    date_formats: Vec<String>,
    /// `in` 在嵌套集合中递归的最大层数
    max_collection_depth: usize,
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self::from_settings(&EngineSettings::default())
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            date_formats: settings.date_formats.clone(),
            max_collection_depth: settings.max_collection_depth,
        }
    }

    /// 评估条件
    ///
    /// # Arguments
    /// * `actual` - 从主体解析出的字段值，缺失时为 `Value::Null`
    /// * `operator` - 操作符
    /// * `expected` - 规则中定义的期望值
    pub fn evaluate(&self, actual: &Value, operator: Operator, expected: &Value) -> bool {
        let (actual, expected) = self.normalize_dates(actual, expected);
        let (actual, expected) = (actual.as_ref(), expected.as_ref());

        match operator {
            Operator::Eq => Self::loosely_equals(actual, expected),
            Operator::Neq => !Self::loosely_equals(actual, expected),
            Operator::In => self.in_list(actual, expected),
            Operator::NotIn => !self.in_list(actual, expected),
            Operator::Gt => Self::order(actual, expected) == Some(Ordering::Greater),
            Operator::Lt => Self::order(actual, expected) == Some(Ordering::Less),
            Operator::Contains => Self::contains(actual, expected),
        }
    }

    /// 一侧是日期时间、另一侧是字符串时，尝试把字符串解析为日期时间
    ///
    /// 解析失败则保持原样，后续按通用语义比较。
    fn normalize_dates<'v>(
        &self,
        actual: &'v Value,
        expected: &'v Value,
    ) -> (Cow<'v, Value>, Cow<'v, Value>) {
        match (actual, expected) {
            (Value::DateTime(_), Value::String(s)) => {
                (Cow::Borrowed(actual), self.coerce_datetime(s, expected))
            }
            (Value::String(s), Value::DateTime(_)) => {
                (self.coerce_datetime(s, actual), Cow::Borrowed(expected))
            }
            _ => (Cow::Borrowed(actual), Cow::Borrowed(expected)),
        }
    }

    fn coerce_datetime<'v>(&self, text: &str, original: &'v Value) -> Cow<'v, Value> {
        match parse_datetime(text, &self.date_formats) {
            Some(dt) => Cow::Owned(Value::DateTime(dt)),
            None => Cow::Borrowed(original),
        }
    }

    /// 宽松相等
    ///
    /// 依次判断：日期按时间戳、`null` 与字符串 "null"、严格相等、数值相等、字符串形式相等。
    pub fn loosely_equals(a: &Value, b: &Value) -> bool {
        if let (Value::DateTime(x), Value::DateTime(y)) = (a, b) {
            return x.timestamp() == y.timestamp();
        }

        match (a, b) {
            (Value::Null, Value::String(s)) | (Value::String(s), Value::Null)
                if s.eq_ignore_ascii_case("null") =>
            {
                return true;
            }
            _ => {}
        }

        if a == b {
            return true;
        }

        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return x == y;
        }

        match (a.to_text(), b.to_text()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// 列表包含检查 (in)
    ///
    /// 字符串期望值按逗号拆分并去除空白，非集合期望值包装为单元素列表。
    fn in_list(&self, actual: &Value, expected: &Value) -> bool {
        let candidates: Vec<Cow<'_, Value>> = match expected {
            Value::String(s) if s.is_empty() => Vec::new(),
            Value::String(s) => s
                .split(',')
                .map(|part| Cow::Owned(Value::from(part.trim())))
                .collect(),
            other => match other.elements() {
                Some(items) => items.into_iter().map(Cow::Borrowed).collect(),
                None => vec![Cow::Borrowed(other)],
            },
        };

        self.matches_any(actual, &candidates, 0)
    }

    /// 实际值为集合时，任一元素（递归）命中任一候选即为真
    fn matches_any(&self, actual: &Value, candidates: &[Cow<'_, Value>], depth: usize) -> bool {
        if let Some(items) = actual.elements() {
            if depth >= self.max_collection_depth {
                return false;
            }
            return items
                .into_iter()
                .any(|item| self.matches_any(item, candidates, depth + 1));
        }

        candidates
            .iter()
            .any(|candidate| Self::loosely_equals(actual, candidate))
    }

    /// 大小比较：日期按时间戳，双方可转数值时按浮点数，否则按字符串字典序
    fn order(a: &Value, b: &Value) -> Option<Ordering> {
        if let (Value::DateTime(x), Value::DateTime(y)) = (a, b) {
            return Some(x.timestamp().cmp(&y.timestamp()));
        }

        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return x.partial_cmp(&y);
        }

        match (a.to_text(), b.to_text()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => None,
        }
    }

    /// 字符串/集合包含检查
    ///
    /// 字符串按不区分大小写的子串匹配，空串总是命中。
    fn contains(actual: &Value, expected: &Value) -> bool {
        if let Some(items) = actual.elements() {
            return items
                .into_iter()
                .any(|item| Self::loosely_equals(item, expected));
        }

        if let Value::String(haystack) = actual {
            let Some(needle) = expected.to_text() else {
                return false;
            };
            return needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase());
        }

        false
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// 使用默认设置比较两个值
pub fn compare(actual: &Value, operator: Operator, expected: &Value) -> bool {
    ConditionEvaluator::new().evaluate(actual, operator, expected)
}

/// 宽松解析日期时间
///
/// 依次尝试 `@<unix 秒>`、RFC 3339、RFC 2822、内置格式和额外格式；
/// 不带时区的值按 UTC 解释。不接受 "now" 之类的相对表达，保证评估结果可重复。
pub fn parse_datetime(input: &str, extra_formats: &[String]) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(seconds) = s.strip_prefix('@') {
        return seconds
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = NAIVE_DATETIME_FORMATS
        .iter()
        .copied()
        .chain(extra_formats.iter().map(String::as_str))
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.and_utc());
    }

    if let Some(dt) = extra_formats
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    DATE_FORMATS
        .iter()
        .copied()
        .chain(extra_formats.iter().map(String::as_str))
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
