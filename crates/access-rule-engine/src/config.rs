//! 配置管理模块
//!
//! 支持配置文件加载和环境变量覆盖。

use crate::error::Result;
use crate::operators::Operator;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 评估引擎配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// 是否在评估报告中记录追踪
    pub trace_enabled: bool,
    /// `in` 操作符在嵌套集合中递归的最大层数，超出视为不匹配
    pub max_collection_depth: usize,
    /// 额外的日期时间格式（chrono 格式串）
    pub date_formats: Vec<String>,
    /// 规则未声明操作符时使用的操作符
    pub default_operator: Operator,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            trace_enabled: false,
            max_collection_depth: 32,
            date_formats: Vec::new(),
            default_operator: Operator::Eq,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// 是否输出 JSON 格式日志
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSettings,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. {CONFIG_DIR}/default.toml
    /// 2. {CONFIG_DIR}/{RULES_ENV}.toml
    /// 3. 环境变量（RULES_ 前缀，双下划线分隔层级，如 RULES_ENGINE__TRACE_ENABLED -> engine.trace_enabled）
    pub fn load() -> Result<Self> {
        let env = std::env::var("RULES_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(config_dir, &env)
    }

    /// 从指定目录加载，配置文件都是可选的
    pub fn load_from(config_dir: impl AsRef<Path>, environment: &str) -> Result<Self> {
        let config_dir = config_dir.as_ref();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            .add_source(
                Environment::with_prefix("RULES")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(";")
                    .with_list_parse_key("engine.date_formats")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.engine.trace_enabled);
        assert_eq!(config.engine.max_collection_depth, 32);
        assert_eq!(config.engine.default_operator, Operator::Eq);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let config = EngineConfig::load_from("definitely-not-a-config-dir", "test").unwrap();
        assert_eq!(config.engine.max_collection_depth, 32);
        assert!(config.engine.date_formats.is_empty());
    }

    #[test]
    fn test_environment_file_overrides_default() {
        let dir = std::env::temp_dir().join(format!("rule-engine-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("default.toml"),
            r#"
            [engine]
            trace_enabled = true
            max_collection_depth = 8
            date_formats = ["%d/%m/%Y"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        fs::write(
            dir.join("staging.toml"),
            r#"
            [engine]
            max_collection_depth = 4
            default_operator = "contains"
            "#,
        )
        .unwrap();

        let config = EngineConfig::load_from(&dir, "staging").unwrap();
        fs::remove_dir_all(&dir).ok();

        assert!(config.engine.trace_enabled);
        assert_eq!(config.engine.max_collection_depth, 4);
        assert_eq!(config.engine.date_formats, vec!["%d/%m/%Y".to_string()]);
        assert_eq!(config.engine.default_operator, Operator::Contains);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
    }
}
