//! Pattern-based duplicate handling rules.
//!
//! A rule applies to every dataset whose path contains its pattern
//! (case-insensitively). Among applicable rules the lowest `priority` wins;
//! when none applies the configured default action is used with no labels
//! limit.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LabeldupError;

/// Priority given to rules that do not set one.
pub const DEFAULT_PRIORITY: i64 = 999;

/// What to do with the duplicates found in a dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Move duplicates under `<root>/duplicate/`.
    #[default]
    Move,
    /// Delete duplicates in place.
    Delete,
    /// Do not scan the dataset at all.
    Skip,
}

impl Action {
    /// Parse an action name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "move" => Some(Action::Move),
            "delete" => Some(Action::Delete),
            "skip" => Some(Action::Skip),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Move => "move",
            Action::Delete => "delete",
            Action::Skip => "skip",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured rule.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rule {
    pub pattern: String,
    /// `None` defers to the default action.
    pub action: Option<Action>,
    /// Compare only the first N labels (0 = all).
    pub labels_limit: usize,
    /// Lower values take precedence.
    pub priority: i64,
}

impl Rule {
    pub fn new(pattern: impl Into<String>, action: Action, labels_limit: usize, priority: i64) -> Self {
        Self {
            pattern: pattern.into(),
            action: Some(action),
            labels_limit,
            priority,
        }
    }

    fn applies_to(&self, path_lower: &str) -> bool {
        !self.pattern.is_empty() && path_lower.contains(&self.pattern.to_lowercase())
    }
}

/// The action and labels limit in force for one dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EffectiveRule {
    pub action: Action,
    pub labels_limit: usize,
    /// Pattern of the winning rule, `None` when the default applied.
    pub matched_pattern: Option<String>,
}

impl fmt::Display for EffectiveRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action={}, labels={}", self.action, self.labels_limit)?;
        if let Some(pattern) = &self.matched_pattern {
            write!(f, " (pattern '{pattern}')")?;
        }
        Ok(())
    }
}

/// Resolve the rule in force for `dataset_path`.
///
/// Ties on priority go to the rule listed first.
pub fn resolve_rule(dataset_path: &str, rules: &[Rule], default_action: Action) -> EffectiveRule {
    let path_lower = dataset_path.to_lowercase();

    let winner = rules
        .iter()
        .filter(|rule| rule.applies_to(&path_lower))
        .min_by_key(|rule| rule.priority);

    match winner {
        None => EffectiveRule {
            action: default_action,
            labels_limit: 0,
            matched_pattern: None,
        },
        Some(rule) => EffectiveRule {
            action: rule.action.unwrap_or(default_action),
            labels_limit: rule.labels_limit,
            matched_pattern: Some(rule.pattern.clone()),
        },
    }
}

/// Rule record as written in configuration. Every field is optional and
/// loosely typed; a value of the wrong type counts as missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuleRecord {
    pattern: Option<Value>,
    action: Option<Value>,
    labels: Option<Value>,
    priority: Option<Value>,
}

impl From<RuleRecord> for Rule {
    fn from(record: RuleRecord) -> Self {
        let pattern = match record.pattern {
            Some(Value::String(pattern)) => pattern,
            Some(other) => {
                tracing::warn!(pattern = %other, "rule pattern is not a string, ignoring rule");
                String::new()
            }
            None => String::new(),
        };

        let action = match record.action {
            Some(Value::String(name)) => Some(Action::from_name(&name).unwrap_or_else(|| {
                tracing::warn!(%pattern, action = %name, "unknown rule action, treating as move");
                Action::Move
            })),
            Some(other) => {
                tracing::warn!(%pattern, action = %other, "rule action is not a string, using default");
                None
            }
            None => None,
        };

        let labels = lenient_int(record.labels, &pattern, "labels").unwrap_or(0);
        let priority = lenient_int(record.priority, &pattern, "priority").unwrap_or(DEFAULT_PRIORITY);

        Rule {
            pattern,
            action,
            labels_limit: labels.max(0) as usize,
            priority,
        }
    }
}

/// Read an integer field, truncating floats. Other values count as missing.
fn lenient_int(value: Option<Value>, pattern: &str, field: &str) -> Option<i64> {
    let value = value?;
    let number = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|number| number.is_finite())
            .map(|number| number.trunc() as i64)
    });
    if number.is_none() && !value.is_null() {
        tracing::warn!(%pattern, field, value = %value, "rule field is not a number, using default");
    }
    number
}

/// Parse a JSON array of rule records.
///
/// Blank input yields no rules.
pub fn parse_rules_json(text: &str, origin: &str) -> Result<Vec<Rule>, LabeldupError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<RuleRecord> =
        serde_json::from_str(text).map_err(|source| LabeldupError::RulesParse {
            origin: origin.to_string(),
            message: source.to_string(),
        })?;
    Ok(records.into_iter().map(Rule::from).collect())
}

/// Parse a YAML sequence of rule records.
pub fn parse_rules_yaml(text: &str, origin: &str) -> Result<Vec<Rule>, LabeldupError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<RuleRecord> =
        serde_yaml::from_str(text).map_err(|source| LabeldupError::RulesParse {
            origin: origin.to_string(),
            message: source.to_string(),
        })?;
    Ok(records.into_iter().map(Rule::from).collect())
}

/// Load rules from a file: YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn load_rules_file(path: &Path) -> Result<Vec<Rule>, LabeldupError> {
    let text = fs::read_to_string(path)?;
    let origin = path.display().to_string();

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        parse_rules_yaml(&text, &origin)
    } else {
        parse_rules_json(&text, &origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rules() -> Vec<Rule> {
        vec![
            Rule::new("night", Action::Delete, 3, 5),
            Rule::new("Camera", Action::Skip, 0, 1),
            Rule::new("cam", Action::Move, 2, 1),
        ]
    }

    #[test]
    fn no_match_uses_default_with_no_limit() {
        let rule = resolve_rule("/data/day/set1", &sample_rules(), Action::Delete);
        assert_eq!(
            rule,
            EffectiveRule {
                action: Action::Delete,
                labels_limit: 0,
                matched_pattern: None,
            }
        );
    }

    #[test]
    fn lowest_priority_number_wins() {
        let rule = resolve_rule("/data/night/set1", &sample_rules(), Action::Move);
        assert_eq!(rule.action, Action::Delete);
        assert_eq!(rule.labels_limit, 3);

        let rule = resolve_rule("/data/night/camera1", &sample_rules(), Action::Move);
        assert_eq!(rule.action, Action::Skip);
    }

    #[test]
    fn priority_ties_go_to_first_listed() {
        let rule = resolve_rule("/data/CAMERA/x", &sample_rules(), Action::Move);
        assert_eq!(rule.action, Action::Skip);
        assert_eq!(rule.matched_pattern.as_deref(), Some("Camera"));
    }

    #[test]
    fn matching_ignores_case() {
        let rule = resolve_rule("/DATA/NIGHT", &sample_rules(), Action::Move);
        assert_eq!(rule.action, Action::Delete);
    }

    #[test]
    fn empty_pattern_never_matches() {
        let rules = vec![Rule::new("", Action::Skip, 0, 0)];
        let rule = resolve_rule("/anything", &rules, Action::Move);
        assert_eq!(rule.action, Action::Move);
        assert!(rule.matched_pattern.is_none());
    }

    #[test]
    fn json_records_fill_missing_fields() {
        let rules = parse_rules_json(
            r#"[{"pattern": "a"}, {"pattern": "b", "action": "delete", "labels": -4, "priority": 2}]"#,
            "test",
        )
        .expect("parse rules");

        assert_eq!(rules[0].action, None);
        assert_eq!(rules[0].labels_limit, 0);
        assert_eq!(rules[0].priority, DEFAULT_PRIORITY);
        assert_eq!(rules[1].action, Some(Action::Delete));
        assert_eq!(rules[1].labels_limit, 0);
        assert_eq!(rules[1].priority, 2);

        let rule = resolve_rule("/x/a", &rules, Action::Skip);
        assert_eq!(rule.action, Action::Skip);
    }

    #[test]
    fn float_priority_is_truncated() {
        let rules = parse_rules_json(
            r#"[{"pattern": "raw", "action": "skip", "priority": 1.5}, {"pattern": "burst", "action": "delete"}]"#,
            "test",
        )
        .expect("parse rules");

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].priority, 1);
        assert_eq!(rules[1].priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn badly_typed_fields_fall_back_to_defaults() {
        let rules = parse_rules_json(
            r#"[{"pattern": "raw", "action": "skip", "priority": "high", "labels": "two"},
                {"pattern": 7, "action": 3, "labels": 2.9, "priority": null}]"#,
            "test",
        )
        .expect("parse rules");

        assert_eq!(
            rules[0],
            Rule {
                pattern: "raw".to_string(),
                action: Some(Action::Skip),
                labels_limit: 0,
                priority: DEFAULT_PRIORITY,
            }
        );
        assert_eq!(rules[1].pattern, "");
        assert_eq!(rules[1].action, None);
        assert_eq!(rules[1].labels_limit, 2);
        assert_eq!(rules[1].priority, DEFAULT_PRIORITY);

        let rule = resolve_rule("/data/raw/set", &rules, Action::Move);
        assert_eq!(rule.action, Action::Skip);
    }

    #[test]
    fn yaml_float_priority_is_accepted() {
        let rules = parse_rules_yaml("- pattern: raw\n  priority: 2.5\n  labels: high\n", "test")
            .expect("parse rules");
        assert_eq!(rules[0].priority, 2);
        assert_eq!(rules[0].labels_limit, 0);
    }

    #[test]
    fn unknown_action_behaves_as_move() {
        let rules = parse_rules_json(r#"[{"pattern": "a", "action": "archive"}]"#, "test")
            .expect("parse rules");
        assert_eq!(rules[0].action, Some(Action::Move));
    }

    #[test]
    fn blank_json_is_no_rules() {
        assert!(parse_rules_json("  ", "test").expect("blank").is_empty());
    }

    #[test]
    fn non_array_json_is_rejected() {
        let err = parse_rules_json(r#"{"pattern": "a"}"#, "DUPLICATE_RULES").unwrap_err();
        assert!(matches!(err, LabeldupError::RulesParse { .. }));
        assert!(err.to_string().contains("DUPLICATE_RULES"));
    }

    #[test]
    fn yaml_file_is_loaded() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("rules.yaml");
        fs::write(
            &path,
            "- pattern: raw\n  action: skip\n- pattern: burst\n  action: delete\n  labels: 2\n  priority: 1\n",
        )
        .expect("write rules");

        let rules = load_rules_file(&path).expect("load rules");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1], Rule::new("burst", Action::Delete, 2, 1));
    }

    #[test]
    fn json_file_is_loaded() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("rules.json");
        fs::write(&path, r#"[{"pattern": "raw", "action": "skip", "priority": 0}]"#)
            .expect("write rules");

        let rules = load_rules_file(&path).expect("load rules");
        assert_eq!(rules, vec![Rule::new("raw", Action::Skip, 0, 0)]);
    }
}
