//! 规则执行器
//!
//! 按顺序评估规则集中的每条规则，遇到第一条不匹配的规则立即返回（AND 短路）。
//! 执行器本身不持有可变状态，可在多个线程间共享。

use crate::config::EngineSettings;
use crate::error::Result;
use crate::evaluator::ConditionEvaluator;
use crate::models::{EvaluationReport, Rule, RuleOutcome, RuleSet};
use crate::operators::{Operator, RuleOperator};
use crate::resolver::resolve;
use crate::subject::Subject;
use crate::value::Value;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};

/// 单条规则的检查结果
struct RuleCheck {
    operator: Option<Operator>,
    actual: Option<Value>,
    matched: bool,
}

impl RuleCheck {
    fn rejected() -> Self {
        Self {
            operator: None,
            actual: None,
            matched: false,
        }
    }
}

/// 规则执行器
#[derive(Debug, Clone)]
pub struct RuleExecutor {
    evaluator: ConditionEvaluator,
    default_operator: Operator,
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self::from_settings(&EngineSettings::default())
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            evaluator: ConditionEvaluator::from_settings(settings),
            default_operator: settings.default_operator,
            trace_enabled: settings.trace_enabled,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 评估规则集
    ///
    /// 规则集为空时返回 `InvalidRuleSet`；单条规则的问题只会让该规则不匹配。
    #[instrument(skip_all, fields(action = rule_set.action.as_deref(), rules = rule_set.len()))]
    pub fn evaluate(&self, subject: &dyn Subject, rule_set: &RuleSet) -> Result<bool> {
        rule_set.validate()?;

        for (index, rule) in rule_set.iter().enumerate() {
            let check = self.check_rule(subject, index, rule);
            if !check.matched {
                debug!(index, field = %rule.field, "规则不匹配，短路返回");
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// 评估未经类型化的 JSON 规则集（规则数组或带 rules 字段的对象）
    pub fn evaluate_json(&self, subject: &dyn Subject, raw: &JsonValue) -> Result<bool> {
        let rule_set = RuleSet::from_json(raw)?;
        self.evaluate(subject, &rule_set)
    }

    /// 评估并返回每条规则的结果
    #[instrument(skip_all, fields(action = rule_set.action.as_deref(), rules = rule_set.len()))]
    pub fn explain(&self, subject: &dyn Subject, rule_set: &RuleSet) -> Result<EvaluationReport> {
        rule_set.validate()?;

        let mut report = EvaluationReport::new(rule_set.action.clone());

        for (index, rule) in rule_set.iter().enumerate() {
            let check = self.check_rule(subject, index, rule);
            let operator = match (&check.operator, &rule.operator) {
                (Some(op), _) => op.to_string(),
                (None, Some(declared)) => declared.to_string(),
                (None, None) => self.default_operator.to_string(),
            };

            if self.trace_enabled {
                report.evaluation_trace.push(format!(
                    "rules[{}]: {} {} {} => {}",
                    index,
                    rule.field,
                    operator,
                    rule.value,
                    if check.matched { "MATCHED" } else { "NOT_MATCHED" }
                ));
            }

            let matched = check.matched;
            report.outcomes.push(RuleOutcome {
                index,
                field: rule.field.clone(),
                operator,
                actual: check.actual,
                expected: rule.value.clone(),
                matched,
            });

            if !matched {
                if self.trace_enabled {
                    report
                        .evaluation_trace
                        .push(format!("AND 短路 - rules[{}] 不匹配", index));
                }
                return Ok(report);
            }
        }

        report.matched = true;
        Ok(report)
    }

    fn check_rule(&self, subject: &dyn Subject, index: usize, rule: &Rule) -> RuleCheck {
        if rule.field.is_empty() {
            warn!(index, "规则缺少 field，按不匹配处理");
            return RuleCheck::rejected();
        }

        let operator = match &rule.operator {
            None => self.default_operator,
            Some(RuleOperator::Supported(op)) => *op,
            Some(RuleOperator::Unsupported(raw)) => {
                warn!(index, field = %rule.field, operator = %raw, "不支持的操作符，按不匹配处理");
                return RuleCheck::rejected();
            }
        };

        let actual = resolve(subject, &rule.field).unwrap_or_default();
        let matched = self.evaluator.evaluate(&actual, operator, &rule.value);

        RuleCheck {
            operator: Some(operator),
            actual: Some(actual),
            matched,
        }
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// 使用默认设置评估规则集
pub fn evaluate(subject: &dyn Subject, rule_set: &RuleSet) -> Result<bool> {
    RuleExecutor::new().evaluate(subject, rule_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::subject::{MockSubject, Record};
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use serde_json::json;

    fn create_test_user() -> Record {
        Record::new()
            .with_attribute("role", "staff")
            .with_attribute("age", 21)
            .with_attribute("tags", vec!["alpha", "beta"])
            .with_attribute("email", "person@company.com")
            .with_attribute(
                "email_verified_at",
                Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            )
            .with_capability("isStaff", |r: &Record| {
                Value::from(r.get("role") == Some(&Value::from("staff")))
            })
    }

    fn rules(raw: serde_json::Value) -> RuleSet {
        RuleSet::from_json(&raw).unwrap()
    }

    #[test]
    fn test_single_rule_match() {
        let user = create_test_user();
        let rule_set = rules(json!([{"field": "role", "operator": "==", "value": "staff"}]));

        assert!(RuleExecutor::new().evaluate(&user, &rule_set).unwrap());
    }

    #[test]
    fn test_all_rules_must_match() {
        let user = create_test_user();
        let rule_set = rules(json!([
            {"field": "age", "operator": ">", "value": 18},
            {"field": "age", "operator": "<", "value": 30},
            {"field": "isStaff()", "operator": "==", "value": true}
        ]));
        assert!(evaluate(&user, &rule_set).unwrap());

        let rule_set = rules(json!([
            {"field": "age", "operator": ">", "value": 18},
            {"field": "age", "operator": "<", "value": 20}
        ]));
        assert!(!evaluate(&user, &rule_set).unwrap());
    }

    #[test]
    fn test_empty_rule_set_is_invalid() {
        let user = create_test_user();
        let result = evaluate(&user, &RuleSet::new(Vec::new()));
        assert!(matches!(result, Err(RuleError::InvalidRuleSet(_))));

        let result = RuleExecutor::new().evaluate_json(&user, &json!({"rules": []}));
        assert!(matches!(result, Err(RuleError::InvalidRuleSet(_))));
    }

    #[test]
    fn test_missing_field_fails_closed() {
        let user = create_test_user();
        let rule_set = rules(json!([{"operator": "==", "value": null}]));
        assert!(!evaluate(&user, &rule_set).unwrap());

        let rule_set = rules(json!([{"field": "", "operator": "!=", "value": "x"}]));
        assert!(!evaluate(&user, &rule_set).unwrap());
    }

    #[test]
    fn test_unsupported_operator_fails_closed() {
        let user = create_test_user();
        let rule_set = rules(json!([{"field": "age", "operator": ">=", "value": 18}]));
        assert!(!evaluate(&user, &rule_set).unwrap());
    }

    #[test]
    fn test_missing_operator_uses_default() {
        let user = create_test_user();
        let rule_set = rules(json!([{"field": "role", "value": "staff"}]));
        assert!(evaluate(&user, &rule_set).unwrap());

        let rule_set = rules(json!([{"field": "role", "operator": null, "value": "staff"}]));
        assert!(evaluate(&user, &rule_set).unwrap());

        let settings = EngineSettings {
            default_operator: Operator::Contains,
            ..Default::default()
        };
        let rule_set = rules(json!([{"field": "email", "value": "COMPANY"}]));
        assert!(RuleExecutor::from_settings(&settings).evaluate(&user, &rule_set).unwrap());
    }

    #[test]
    fn test_missing_value_is_null() {
        let user = create_test_user();
        let rule_set = rules(json!([{"field": "nickname", "operator": "=="}]));
        assert!(evaluate(&user, &rule_set).unwrap());
    }

    #[test]
    fn test_and_short_circuit_skips_later_rules() {
        let mut subject = MockSubject::new();
        subject
            .expect_lookup()
            .with(eq("role"))
            .times(1)
            .returning(|_| Some(Value::from("guest")));
        subject.expect_invoke().times(0);

        let rule_set = rules(json!([
            {"field": "role", "operator": "==", "value": "staff"},
            {"field": "isStaff()", "operator": "==", "value": true}
        ]));

        assert!(!evaluate(&subject, &rule_set).unwrap());
    }

    #[test]
    fn test_explain_records_outcomes_until_failure() {
        let user = create_test_user();
        let rule_set = RuleSet::for_action(
            "login",
            vec![
                Rule::new("role", Operator::Eq, "staff"),
                Rule::new("email", Operator::Contains, "@other.org"),
                Rule::new("age", Operator::Gt, 18),
            ],
        );

        let report = RuleExecutor::new()
            .with_trace()
            .explain(&user, &rule_set)
            .unwrap();

        assert!(!report.matched);
        assert_eq!(report.action.as_deref(), Some("login"));
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes[0].matched);

        let failed = report.failed_rule().unwrap();
        assert_eq!(failed.index, 1);
        assert_eq!(failed.operator, "contains");
        assert_eq!(failed.actual, Some(Value::from("person@company.com")));
        assert!(report.evaluation_trace.iter().any(|t| t.contains("短路")));
    }

    #[test]
    fn test_explain_matches_evaluate() {
        let user = create_test_user();
        let rule_set = rules(json!([
            {"field": "tags", "operator": "in", "value": "beta,gamma"},
            {"field": "email_verified_at", "operator": "==", "value": "2025-01-01 00:00:00"}
        ]));

        let executor = RuleExecutor::new();
        let report = executor.explain(&user, &rule_set).unwrap();

        assert!(report.matched);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.evaluation_trace.is_empty());
        assert_eq!(report.matched, executor.evaluate(&user, &rule_set).unwrap());
    }

    #[test]
    fn test_explain_unsupported_operator_keeps_declared_name() {
        let user = create_test_user();
        let rule_set = rules(json!([{"field": "age", "operator": "between", "value": [1, 2]}]));

        let report = RuleExecutor::new().explain(&user, &rule_set).unwrap();

        assert!(!report.matched);
        assert_eq!(report.outcomes[0].operator, "between");
        assert_eq!(report.outcomes[0].actual, None);
    }
}
