#![allow(
    clippy::missing_errors_doc,
    clippy::uninlined_format_args,
    clippy::doc_markdown
)]
//! Shellgate Safety - command-safety classification for agent-proposed shell commands.
//!
//! This crate decides how a command line proposed by an autonomous agent may
//! be handled before it reaches a real shell:
//! - `Safe` - run without confirmation
//! - `Ambiguous` - ask the operator
//! - `Risky` - refuse
//!
//! # Features
//! - Real shell grammar parsing (tree-sitter bash), not string matching
//! - Every leaf command found, including substitutions and compound statements
//! - Layered, ordered heuristics with a reason for every verdict
//! - Fail closed: unparsable input is never `Safe`
//! - Configurable tables and unparsed-input category
//! - Audit record for every classification
//!
//! # Decision Flow
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              Command line                  │
//! └────────────────────┬───────────────────────┘
//!                      │
//!                      ▼
//! ┌────────────────────────────────────────────┐
//! │      Parses under the bash grammar?        │
//! └────────────────────┬───────────────────────┘
//!                      │
//!        ┌─────────────┴─────────────┐
//!        ▼                           ▼
//!      [No]                        [Yes]
//!        │                           │
//!        ▼                           ▼
//!   ┌───────────┐         ┌──────────────────────┐
//!   │ AMBIGUOUS │         │ For each invocation: │
//!   │(configur- │         │ name, deny lists,    │
//!   │   able)   │         │ paths, allow list    │
//!   └───────────┘         └──────────┬───────────┘
//!                                    │
//!                                    ▼
//!                         ┌──────────────────────┐
//!                         │  Most restrictive    │
//!                         │  category wins       │
//!                         └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use shellgate_safety::{SafetyCategory, classify_command_line};
//!
//! let (category, _) = classify_command_line("ls src && git status");
//! assert_eq!(category, SafetyCategory::Safe);
//!
//! let (category, _) = classify_command_line("cat notes.txt | sudo tee /etc/hosts");
//! assert_eq!(category, SafetyCategory::Risky);
//! ```

#[cfg(test)]
mod tests;

mod ast;
mod audit;
mod category;
mod config;
mod engine;
mod error;
mod heuristics;
mod invocation;
mod parser;
mod path;
mod rule;
mod tables;

// Re-export all public types
pub use audit::{AuditInvocation, AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use category::SafetyCategory;
pub use config::PolicyConfig;
pub use engine::{CommandSafetyEngine, default_engine};
pub use error::PolicyError;
pub use invocation::{ParseFailure, ParseResult, ParsedInvocation, Redirection, RedirectionKind};
pub use parser::DEFAULT_MAX_INPUT_BYTES;
pub use path::PathSignal;
pub use rule::{CommandLineVerdict, InvocationVerdict, Rule};

// ============================================================================
// Convenience Functions
// ============================================================================

/// Parse a command line into its invocations with the default size limit.
pub fn parse(raw: &str) -> ParseResult {
    parser::parse(raw)
}

/// Classify a single invocation with the default policy.
pub fn classify_invocation(invocation: &ParsedInvocation) -> SafetyCategory {
    default_engine().classify_invocation(invocation)
}

/// Classify a full command line with the default policy.
pub fn classify_command_line(raw: &str) -> (SafetyCategory, ParseResult) {
    default_engine().classify_command_line(raw)
}

/// Classify a full command line with the default policy, with details.
pub fn evaluate_command_line(raw: &str) -> CommandLineVerdict {
    default_engine().evaluate(raw)
}
