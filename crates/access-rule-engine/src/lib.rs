//! 访问规则引擎
//!
//! 针对任意主体（通常是用户）评估声明式规则集，判断主体是否满足全部规则：
//! - 点号路径解析，支持零参数能力调用（如 "profile.isActive()"）
//! - 日期、数值、字符串、集合的类型感知比较
//! - 按顺序 AND 短路求值
//! - 按动作名称管理规则集

pub mod config;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod models;
pub mod observability;
pub mod operators;
pub mod policy;
pub mod resolver;
pub mod subject;
pub mod value;

pub use config::{EngineConfig, EngineSettings, LoggingConfig};
pub use error::{Result, RuleError};
pub use evaluator::{ConditionEvaluator, compare, parse_datetime};
pub use executor::{RuleExecutor, evaluate};
pub use models::{EvaluationReport, Rule, RuleOutcome, RuleSet};
pub use operators::{Operator, RuleOperator};
pub use policy::ActionCatalog;
pub use resolver::{Segment, resolve};
pub use subject::{CapabilityFn, CapabilityRegistry, Record, Subject};
pub use value::Value;
