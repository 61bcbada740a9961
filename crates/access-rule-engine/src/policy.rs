//! 动作规则目录
//!
//! 按动作名称管理规则集（如 "submit_form"、"login"），并对主体判断能否执行某个动作。
//! 使用 DashMap 提供线程安全的内存缓存，不负责持久化。

use crate::error::{Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::RuleSet;
use crate::subject::Subject;
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 动作规则目录
#[derive(Clone)]
pub struct ActionCatalog {
    /// 动作名称（小写）到规则集的映射
    rule_sets: Arc<DashMap<String, Arc<RuleSet>>>,
    executor: Arc<RuleExecutor>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::with_executor(RuleExecutor::new())
    }

    pub fn with_executor(executor: RuleExecutor) -> Self {
        Self {
            rule_sets: Arc::new(DashMap::new()),
            executor: Arc::new(executor),
        }
    }

    /// 动作名称不区分大小写
    fn normalize(action: &str) -> String {
        action.trim().to_lowercase()
    }

    pub fn len(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.is_empty()
    }

    /// 注册动作的规则集，已存在时覆盖
    #[instrument(skip(self, rule_set), fields(rules = rule_set.len()))]
    pub fn register(&self, action: &str, rule_set: RuleSet) -> Result<()> {
        let key = Self::normalize(action);
        if key.is_empty() {
            return Err(RuleError::InvalidRuleSet("动作名称不能为空".to_string()));
        }
        rule_set.validate()?;

        let rule_set = RuleSet {
            action: Some(key.clone()),
            ..rule_set
        };
        if self.rule_sets.insert(key.clone(), Arc::new(rule_set)).is_some() {
            info!("动作规则已更新: {}", key);
        } else {
            info!("动作规则已加载: {}", key);
        }
        Ok(())
    }

    /// 从带 action 字段的 JSON 信封注册，返回规范化后的动作名称
    #[instrument(skip(self, raw))]
    pub fn register_json(&self, raw: &JsonValue) -> Result<String> {
        let rule_set = RuleSet::from_json(raw)?;
        let action = rule_set
            .action
            .clone()
            .ok_or_else(|| RuleError::InvalidRuleSet("规则集缺少 action 字段".to_string()))?;

        self.register(&action, rule_set)?;
        Ok(Self::normalize(&action))
    }

    /// 批量注册，单个失败不影响其他规则集
    #[instrument(skip(self, raws))]
    pub fn register_batch(&self, raws: &[JsonValue]) -> Vec<String> {
        let mut loaded = Vec::with_capacity(raws.len());
        let mut failed = 0usize;

        for (i, raw) in raws.iter().enumerate() {
            match self.register_json(raw) {
                Ok(action) => loaded.push(action),
                Err(e) => {
                    failed += 1;
                    warn!(index = i, error = %e, "动作规则加载失败");
                }
            }
        }

        info!("批量加载完成: {} 成功, {} 失败", loaded.len(), failed);
        loaded
    }

    pub fn get(&self, action: &str) -> Option<Arc<RuleSet>> {
        self.rule_sets
            .get(&Self::normalize(action))
            .map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, action: &str) -> bool {
        self.rule_sets.contains_key(&Self::normalize(action))
    }

    /// 删除动作
    #[instrument(skip(self))]
    pub fn remove(&self, action: &str) -> Result<()> {
        let key = Self::normalize(action);
        if self.rule_sets.remove(&key).is_some() {
            info!("动作规则已删除: {}", key);
            Ok(())
        } else {
            warn!("删除不存在的动作: {}", key);
            Err(RuleError::ActionNotFound(key))
        }
    }

    /// 所有动作名称（已排序）
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self.rule_sets.iter().map(|r| r.key().clone()).collect();
        actions.sort();
        actions
    }

    #[instrument(skip(self))]
    pub fn clear(&self) {
        let count = self.rule_sets.len();
        self.rule_sets.clear();
        info!("已清空 {} 个动作", count);
    }

    /// 判断主体能否执行动作
    ///
    /// 动作未注册时返回 `ActionNotFound`。
    #[instrument(skip(self, subject))]
    pub fn can_perform(&self, subject: &dyn Subject, action: &str) -> Result<bool> {
        let rule_set = self
            .get(action)
            .ok_or_else(|| RuleError::ActionNotFound(Self::normalize(action)))?;

        self.executor.evaluate(subject, &rule_set)
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::new()
    }
}
