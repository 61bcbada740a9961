//! 日志初始化
//!
//! 库内部只通过 tracing 宏输出日志，由宿主程序决定是否安装订阅者。

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// 安装全局 tracing 订阅者
///
/// 优先使用 `RUST_LOG`，否则使用配置中的日志级别。已安装过订阅者时直接返回成功。
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("无效的日志级别: {}", config.level))?,
    };

    let fmt_layer = if config.json {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .boxed()
    };

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing 订阅者已存在，跳过初始化");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init(&config).is_ok());
        assert!(init(&config).is_ok());
    }

    #[test]
    fn test_invalid_level_is_rejected_without_rust_log() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }

        let config = LoggingConfig {
            level: "rule_engine=loud".to_string(),
            json: false,
        };
        assert!(init(&config).is_err());
    }
}
