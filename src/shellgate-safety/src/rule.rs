//! Classification rules and the verdicts they produce.

use serde::{Deserialize, Serialize};

use crate::category::SafetyCategory;
use crate::invocation::ParseResult;

/// The heuristic tier that decided an invocation's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Command name missing or produced by expansion.
    UnparsableName,
    /// Command on the deny list.
    DeniedCommand,
    /// Command combined with a denied argument.
    DeniedArgument,
    /// Environment assignment that changes what a program loads or runs.
    DeniedEnvironment,
    /// Argument or output redirection touches a sensitive location.
    SensitivePath,
    /// Argument is an absolute path outside the allowed roots.
    AbsolutePath,
    /// Argument climbs above the working directory.
    PathTraversal,
    /// Command on the known-safe list.
    Allowlisted,
    /// Nothing matched.
    Unrecognized,
}

impl Rule {
    /// Position in the decision order, starting at 1.
    pub fn tier(&self) -> u8 {
        match self {
            Self::UnparsableName => 1,
            Self::DeniedCommand => 2,
            Self::DeniedArgument | Self::DeniedEnvironment => 3,
            Self::SensitivePath => 4,
            Self::AbsolutePath | Self::PathTraversal => 5,
            Self::Allowlisted => 6,
            Self::Unrecognized => 7,
        }
    }

    /// Category assigned when this rule decides.
    pub fn category(&self) -> SafetyCategory {
        match self {
            Self::Allowlisted => SafetyCategory::Safe,
            Self::Unrecognized => SafetyCategory::Ambiguous,
            _ => SafetyCategory::Risky,
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnparsableName => write!(f, "unparsable command name"),
            Self::DeniedCommand => write!(f, "denied command"),
            Self::DeniedArgument => write!(f, "denied argument"),
            Self::DeniedEnvironment => write!(f, "denied environment variable"),
            Self::SensitivePath => write!(f, "sensitive path"),
            Self::AbsolutePath => write!(f, "absolute path"),
            Self::PathTraversal => write!(f, "path traversal"),
            Self::Allowlisted => write!(f, "known-safe command"),
            Self::Unrecognized => write!(f, "unrecognized command"),
        }
    }
}

/// Classification of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationVerdict {
    pub category: SafetyCategory,
    pub rule: Rule,
    /// The token that triggered the rule, if a single one did.
    pub token: Option<String>,
    /// Human-readable explanation.
    pub reason: String,
}

impl InvocationVerdict {
    pub(crate) fn new(rule: Rule, token: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            category: rule.category(),
            rule,
            token: token.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// Classification of a whole command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLineVerdict {
    /// The most restrictive category across all invocations.
    pub category: SafetyCategory,
    pub parse: ParseResult,
    /// One verdict per parsed invocation, in the same order.
    pub invocations: Vec<InvocationVerdict>,
    /// Reason of the deciding invocation, or of the parse failure.
    pub reason: String,
}

impl CommandLineVerdict {
    /// The first invocation verdict carrying the overall category.
    pub fn deciding(&self) -> Option<&InvocationVerdict> {
        self.invocations
            .iter()
            .find(|verdict| verdict.category == self.category)
    }
}
