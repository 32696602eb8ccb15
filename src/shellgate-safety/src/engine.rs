//! The command-line aggregator.

use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::audit::{AuditRecord, AuditSink, TracingAuditSink};
use crate::category::SafetyCategory;
use crate::config::PolicyConfig;
use crate::error::PolicyError;
use crate::heuristics::Heuristics;
use crate::invocation::{ParseResult, ParsedInvocation};
use crate::parser;
use crate::rule::{CommandLineVerdict, InvocationVerdict};

static DEFAULT_ENGINE: Lazy<CommandSafetyEngine> = Lazy::new(CommandSafetyEngine::new);

/// Process-wide engine with the default configuration.
pub fn default_engine() -> &'static CommandSafetyEngine {
    &DEFAULT_ENGINE
}

/// Classifies command lines against a validated policy.
///
/// The engine is immutable once built and can be shared across threads.
pub struct CommandSafetyEngine {
    config: PolicyConfig,
    heuristics: Heuristics,
    sink: Arc<dyn AuditSink>,
}

impl CommandSafetyEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        let config = PolicyConfig::default();
        Self {
            heuristics: Heuristics::new(&config),
            config,
            sink: Arc::new(TracingAuditSink),
        }
    }

    /// Creates an engine with a custom configuration.
    pub fn with_config(config: PolicyConfig) -> Result<Self, PolicyError> {
        config.validate()?;
        Ok(Self {
            heuristics: Heuristics::new(&config),
            config,
            sink: Arc::new(TracingAuditSink),
        })
    }

    /// Replaces the audit sink.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Parses a command line with this engine's size limit.
    pub fn parse(&self, raw: &str) -> ParseResult {
        parser::parse_with_limit(raw, self.config.max_input_bytes)
    }

    /// Classifies a single invocation.
    pub fn classify_invocation(&self, invocation: &ParsedInvocation) -> SafetyCategory {
        self.evaluate_invocation(invocation).category
    }

    /// Classifies a single invocation with the deciding rule and reason.
    pub fn evaluate_invocation(&self, invocation: &ParsedInvocation) -> InvocationVerdict {
        self.heuristics.evaluate(invocation)
    }

    /// Classifies a full command line.
    pub fn classify_command_line(&self, raw: &str) -> (SafetyCategory, ParseResult) {
        let verdict = self.evaluate(raw);
        (verdict.category, verdict.parse)
    }

    /// Classifies a full command line with per-invocation details.
    pub fn evaluate(&self, raw: &str) -> CommandLineVerdict {
        let parse = self.parse(raw);

        let (category, invocations, reason) = match &parse {
            ParseResult::Unparsed { reason, .. } => (
                self.config.unparsed_category,
                Vec::new(),
                format!("command line could not be parsed: {reason}"),
            ),
            ParseResult::Parsed { invocations } if invocations.is_empty() => (
                SafetyCategory::Safe,
                Vec::new(),
                "empty command line".to_string(),
            ),
            ParseResult::Parsed { invocations } => {
                let verdicts: Vec<InvocationVerdict> = invocations
                    .iter()
                    .map(|invocation| self.evaluate_invocation(invocation))
                    .collect();
                let category = verdicts
                    .iter()
                    .map(|verdict| verdict.category)
                    .fold(SafetyCategory::Safe, SafetyCategory::combine);
                let deciding = verdicts
                    .iter()
                    .find(|verdict| verdict.category == category)
                    .expect("maximum category comes from one of the verdicts");
                let reason = deciding.reason.clone();
                (category, verdicts, reason)
            }
        };

        let verdict = CommandLineVerdict {
            category,
            parse,
            invocations,
            reason,
        };
        self.sink.record(&AuditRecord::from_verdict(raw, &verdict));
        verdict
    }
}

impl Default for CommandSafetyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandSafetyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSafetyEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
