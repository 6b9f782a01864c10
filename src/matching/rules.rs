//! Tie-break rules for variant selection.
//!
//! When several variants are feasible, rules are applied in sequence;
//! the next rule is consulted only on ties. After the last rule,
//! variants are ordered by id so the outcome never depends on input
//! order.
//!
//! # Score Convention
//! **Lower score = more preferred**, as with priority dispatching rules.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::sync::Arc;

use crate::models::ExecutionVariant;

/// Score returned by a variant rule. Lower = more preferred.
pub type RuleScore = f64;

/// A rule that ranks feasible variants.
pub trait VariantRule: Send + Sync + Debug {
    /// Rule name.
    fn name(&self) -> &'static str;

    /// Scores a variant; lower is preferred.
    fn evaluate(&self, variant: &ExecutionVariant) -> RuleScore;
}

/// Shortest duration first.
#[derive(Debug, Clone, Copy)]
pub struct FastestFirst;

impl VariantRule for FastestFirst {
    fn name(&self) -> &'static str {
        "FASTEST"
    }

    fn evaluate(&self, variant: &ExecutionVariant) -> RuleScore {
        f64::from(variant.duration_minutes)
    }
}

/// Primary variant before alternatives.
#[derive(Debug, Clone, Copy)]
pub struct PrimaryFirst;

impl VariantRule for PrimaryFirst {
    fn name(&self) -> &'static str {
        "PRIMARY"
    }

    fn evaluate(&self, variant: &ExecutionVariant) -> RuleScore {
        if variant.is_primary {
            0.0
        } else {
            1.0
        }
    }
}

/// Fewest operators first.
#[derive(Debug, Clone, Copy)]
pub struct LeanestCrew;

impl VariantRule for LeanestCrew {
    fn name(&self) -> &'static str {
        "LEANEST"
    }

    fn evaluate(&self, variant: &ExecutionVariant) -> RuleScore {
        f64::from(variant.headcount())
    }
}

/// Sequential rule chain with a final by-id tie-break.
#[derive(Clone)]
pub struct TieBreakPolicy {
    rules: Vec<Arc<dyn VariantRule>>,
    epsilon: f64,
}

impl TieBreakPolicy {
    /// Creates an empty chain (id order only).
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            epsilon: 1e-9,
        }
    }

    /// Default chain: optional speed, then primary, then id.
    pub fn standard(prioritize_speed: bool) -> Self {
        let policy = Self::new();
        let policy = if prioritize_speed {
            policy.with_rule(FastestFirst)
        } else {
            policy
        };
        policy.with_rule(PrimaryFirst)
    }

    /// Appends a rule.
    pub fn with_rule<R: VariantRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Names of the configured rules, in order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Total order over variants under this policy.
    pub fn compare(&self, a: &ExecutionVariant, b: &ExecutionVariant) -> Ordering {
        for rule in &self.rules {
            let score_a = rule.evaluate(a);
            let score_b = rule.evaluate(b);

            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }
        a.id.cmp(&b.id)
    }

    /// Most preferred variant, if any.
    pub fn select_best<'v>(&self, variants: &[&'v ExecutionVariant]) -> Option<&'v ExecutionVariant> {
        variants
            .iter()
            .copied()
            .min_by(|a, b| self.compare(a, b))
    }
}

impl Default for TieBreakPolicy {
    fn default() -> Self {
        Self::standard(false)
    }
}

impl Debug for TieBreakPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieBreakPolicy")
            .field("rules", &self.rule_names())
            .finish()
    }
}
