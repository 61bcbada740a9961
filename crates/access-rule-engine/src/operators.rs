//! 规则操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 条件操作符
///
/// 操作符集合是封闭的，新增或删除操作符需要同步修改比较器中的 match 分支。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "contains")]
    Contains,
}

impl Operator {
    /// 所有受支持的操作符
    pub const ALL: [Operator; 7] = [
        Self::Eq,
        Self::Neq,
        Self::In,
        Self::NotIn,
        Self::Gt,
        Self::Lt,
        Self::Contains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Contains => "contains",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 未知操作符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "不支持的操作符: {}", self.0)
    }
}

impl std::error::Error for UnknownOperator {}

impl FromStr for Operator {
    type Err = UnknownOperator;

    /// 严格匹配，不做大小写或空白归一化
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

/// 规则中声明的操作符
///
/// 规则集通常来自外部数据，无法识别的操作符保留原文，评估时该条规则直接判定为不匹配。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOperator {
    Supported(Operator),
    Unsupported(String),
}

impl RuleOperator {
    pub fn supported(&self) -> Option<Operator> {
        match self {
            Self::Supported(op) => Some(*op),
            Self::Unsupported(_) => None,
        }
    }
}

impl From<Operator> for RuleOperator {
    fn from(op: Operator) -> Self {
        Self::Supported(op)
    }
}

impl From<&str> for RuleOperator {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(op) => Self::Supported(op),
            Err(UnknownOperator(raw)) => Self::Unsupported(raw),
        }
    }
}

impl fmt::Display for RuleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported(op) => write!(f, "{}", op),
            Self::Unsupported(raw) => write!(f, "{}", raw),
        }
    }
}
