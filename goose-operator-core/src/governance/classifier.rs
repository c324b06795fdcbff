//! Ordered keyword classification of prompt text.

use crate::config::{Rule, RuleAction};

/// Reason used when a block rule does not carry one.
pub const DEFAULT_BLOCK_REASON: &str = "request matched a blocking rule";

/// Result of classifying one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No rule matched.
    NoPolicy,
    /// Append the policy with this id.
    ApplyPolicy(String),
    /// Refuse the prompt.
    Block { reason: String },
}

impl Outcome {
    /// Short label for audit logs.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::NoPolicy => "no_policy",
            Outcome::ApplyPolicy(_) => "apply_policy",
            Outcome::Block { .. } => "block",
        }
    }
}

/// A classification together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: Outcome,
    /// Index of the matching rule in the table.
    pub rule_index: Option<usize>,
    /// Keyword that matched (lowercased).
    pub matched: Option<String>,
}

#[derive(Debug, Clone)]
struct RuleEntry {
    keywords: Vec<String>,
    outcome: Outcome,
}

/// Pure, ordered rule table. First match wins; no fallthrough.
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    entries: Vec<RuleEntry>,
}

impl IntentClassifier {
    /// Build the table from configured rules.
    ///
    /// Rules are expected to have passed validation; a policy rule without a
    /// policy id is skipped.
    pub fn from_rules(rules: &[Rule]) -> Self {
        let entries = rules
            .iter()
            .filter_map(|rule| {
                let outcome = match rule.action {
                    RuleAction::Policy => Outcome::ApplyPolicy(rule.policy.clone()?),
                    RuleAction::Block => Outcome::Block {
                        reason: rule
                            .reason
                            .clone()
                            .unwrap_or_else(|| DEFAULT_BLOCK_REASON.to_string()),
                    },
                };
                Some(RuleEntry {
                    keywords: rule.keywords.iter().map(str::to_lowercase).collect(),
                    outcome,
                })
            })
            .collect();
        Self { entries }
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Classify prompt text.
    pub fn classify(&self, prompt_text: &str) -> Classification {
        let lowered = prompt_text.to_lowercase();
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(keyword) = entry.keywords.iter().find(|k| lowered.contains(k.as_str())) {
                return Classification {
                    outcome: entry.outcome.clone(),
                    rule_index: Some(index),
                    matched: Some(keyword.clone()),
                };
            }
        }
        Classification {
            outcome: Outcome::NoPolicy,
            rule_index: None,
            matched: None,
        }
    }
}
