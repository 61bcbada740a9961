//! 规则引擎错误类型
//!
//! 只有结构性错误会返回给调用方；单条规则内的异常（字段缺失、操作符不支持、
//! 路径无法解析等）一律按不匹配处理，不会出现在这里。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("无效的规则集: {0}")]
    InvalidRuleSet(String),

    #[error("动作不存在: {0}")]
    ActionNotFound(String),

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
