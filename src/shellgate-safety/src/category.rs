//! Safety categories assigned to invocations and whole command lines.

use serde::{Deserialize, Serialize};

/// Safety category of a command, ordered from least to most restrictive.
///
/// Aggregation always keeps the maximum, so `Safe < Ambiguous < Risky`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCategory {
    /// May run unattended.
    Safe,
    /// Requires confirmation from the operator.
    Ambiguous,
    /// Must be refused.
    Risky,
}

impl SafetyCategory {
    /// Returns true if the category allows execution (possibly after confirmation).
    pub fn allows_execution(&self) -> bool {
        matches!(self, SafetyCategory::Safe | SafetyCategory::Ambiguous)
    }

    /// Returns true if the category requires operator interaction.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, SafetyCategory::Ambiguous)
    }

    /// Returns true if the category blocks execution.
    pub fn is_blocked(&self) -> bool {
        matches!(self, SafetyCategory::Risky)
    }

    /// Combine two categories, keeping the most restrictive.
    pub fn combine(self, other: SafetyCategory) -> SafetyCategory {
        self.max(other)
    }

    /// Lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCategory::Safe => "safe",
            SafetyCategory::Ambiguous => "ambiguous",
            SafetyCategory::Risky => "risky",
        }
    }
}

impl std::fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyCategory::Safe => write!(f, "SAFE"),
            SafetyCategory::Ambiguous => write!(f, "AMBIGUOUS"),
            SafetyCategory::Risky => write!(f, "RISKY"),
        }
    }
}
