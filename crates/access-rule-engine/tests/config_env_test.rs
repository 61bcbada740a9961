//! 环境变量覆盖配置
//!
//! 单独的测试二进制，避免与其他读取配置的测试并发修改进程环境。

use rule_engine::{EngineConfig, Operator};

const OVERRIDES: [(&str, &str); 4] = [
    ("RULES_ENGINE__TRACE_ENABLED", "true"),
    ("RULES_ENGINE__MAX_COLLECTION_DEPTH", "5"),
    ("RULES_ENGINE__DEFAULT_OPERATOR", "contains"),
    ("RULES_ENGINE__DATE_FORMATS", "%d.%m.%Y;%d/%m/%Y"),
];

#[test]
fn test_environment_overrides_engine_settings() {
    for (key, value) in OVERRIDES {
        // SAFETY: 本测试二进制中只有这一个测试访问进程环境
        unsafe { std::env::set_var(key, value) };
    }

    let config = EngineConfig::load_from("definitely-not-a-config-dir", "test");

    for (key, _) in OVERRIDES {
        unsafe { std::env::remove_var(key) };
    }

    let config = config.unwrap();
    assert!(config.engine.trace_enabled);
    assert_eq!(config.engine.max_collection_depth, 5);
    assert_eq!(config.engine.default_operator, Operator::Contains);
    assert_eq!(
        config.engine.date_formats,
        vec!["%d.%m.%Y".to_string(), "%d/%m/%Y".to_string()]
    );
    assert_eq!(config.logging.level, "info");
}
