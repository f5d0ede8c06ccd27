//! Difference suppression between declared and observed values
//!
//! A declared value and an observed value can differ textually while still
//! denoting the same thing (a CRN with extra trailing segments, an optional
//! flag the backend always fills with its default). Each field of a resource
//! kind can register a [`ComparisonRule`] deciding whether such a pair counts
//! as a change. Fields without a registered rule compare exactly.

use crate::resource::FieldSet;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Delimiter between segments of a structured identifier (CRN)
pub const CRN_DELIMITER: char = ':';

/// Rule deciding whether a declared/observed pair is equal
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonRule {
    /// Values must be identical
    Exact,

    /// Compare only the first `n` delimiter-separated segments of two strings.
    /// Falls back to [`ComparisonRule::Exact`] when either side has fewer
    /// than `n` segments.
    StructuredIdentifierPrefix(usize),

    /// An unset or empty value on either side stands for this default
    DefaultValueEquivalent(Value),

    /// An unset declared value accepts whatever the backend computed
    ServerComputed,

    /// Only sent on creation; never a difference afterwards
    ApplyOnce,
}

static EXACT: ComparisonRule = ComparisonRule::Exact;

impl ComparisonRule {
    pub fn name(&self) -> &'static str {
        match self {
            ComparisonRule::Exact => "exact",
            ComparisonRule::StructuredIdentifierPrefix(_) => "structured-identifier-prefix",
            ComparisonRule::DefaultValueEquivalent(_) => "default-value-equivalent",
            ComparisonRule::ServerComputed => "server-computed",
            ComparisonRule::ApplyOnce => "apply-once",
        }
    }

    /// Returns true when the pair must not trigger an update.
    ///
    /// `None` means the field is unset on that side.
    pub fn compare(&self, declared: Option<&Value>, observed: Option<&Value>) -> bool {
        match self {
            ComparisonRule::Exact => exact(declared, observed),
            ComparisonRule::StructuredIdentifierPrefix(segments) => {
                prefix_equal(*segments, declared, observed)
            }
            ComparisonRule::DefaultValueEquivalent(default) => {
                let declared = if is_unset(declared) { Some(default) } else { declared };
                let observed = if is_unset(observed) { Some(default) } else { observed };
                exact(declared, observed)
            }
            ComparisonRule::ServerComputed => declared.is_none() || exact(declared, observed),
            ComparisonRule::ApplyOnce => true,
        }
    }
}

impl std::fmt::Display for ComparisonRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonRule::StructuredIdentifierPrefix(n) => write!(f, "{}({})", self.name(), n),
            ComparisonRule::DefaultValueEquivalent(default) => {
                write!(f, "{}({})", self.name(), default)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Compare a declared and an observed value under `rule`
pub fn compare(rule: &ComparisonRule, declared: Option<&Value>, observed: Option<&Value>) -> bool {
    rule.compare(declared, observed)
}

fn normalize(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn exact(declared: Option<&Value>, observed: Option<&Value>) -> bool {
    normalize(declared) == normalize(observed)
}

fn is_unset(value: Option<&Value>) -> bool {
    match normalize(value) {
        None => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

fn prefix_equal(segments: usize, declared: Option<&Value>, observed: Option<&Value>) -> bool {
    let (Some(declared_str), Some(observed_str)) = (
        normalize(declared).and_then(Value::as_str),
        normalize(observed).and_then(Value::as_str),
    ) else {
        return exact(declared, observed);
    };

    let declared_parts: Vec<&str> = declared_str.split(CRN_DELIMITER).collect();
    let observed_parts: Vec<&str> = observed_str.split(CRN_DELIMITER).collect();
    if declared_parts.len() < segments || observed_parts.len() < segments {
        return declared_str == observed_str;
    }

    declared_parts[..segments] == observed_parts[..segments]
}

/// A single field whose declared and observed values differ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub declared: Option<Value>,
    pub observed: Option<Value>,
    pub rule: &'static str,
}

impl std::fmt::Display for FieldChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |v: &Option<Value>| v.as_ref().map_or("(unset)".to_string(), Value::to_string);
        write!(
            f,
            "{}: {} -> {}",
            self.field,
            show(&self.observed),
            show(&self.declared)
        )
    }
}

/// Registry of comparison rules keyed by (resource kind, field path)
#[derive(Debug, Clone, Default)]
pub struct DiffSuppressor {
    rules: HashMap<(String, String), ComparisonRule>,
}

impl DiffSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        rule: ComparisonRule,
    ) -> &mut Self {
        self.rules.insert((kind.into(), field.into()), rule);
        self
    }

    pub fn with_rule(
        mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        rule: ComparisonRule,
    ) -> Self {
        self.register(kind, field, rule);
        self
    }

    /// Rule for a field, [`ComparisonRule::Exact`] when none is registered
    pub fn rule_for(&self, kind: &str, field: &str) -> &ComparisonRule {
        self.rules
            .get(&(kind.to_string(), field.to_string()))
            .unwrap_or(&EXACT)
    }

    /// Fields of `declared` and `observed` that differ under the registered rules.
    ///
    /// Every path present on either side is compared exactly once, in sorted
    /// order. Neither input is modified.
    pub fn diff(&self, kind: &str, declared: &FieldSet, observed: &FieldSet) -> Vec<FieldChange> {
        declared
            .union_paths(observed)
            .into_iter()
            .filter_map(|path| {
                let rule = self.rule_for(kind, path);
                let d = declared.get(path);
                let o = observed.get(path);
                if rule.compare(d, o) {
                    None
                } else {
                    Some(FieldChange {
                        field: path.to_string(),
                        declared: d.cloned(),
                        observed: o.cloned(),
                        rule: rule.name(),
                    })
                }
            })
            .collect()
    }
}
