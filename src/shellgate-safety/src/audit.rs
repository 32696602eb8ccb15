//! Audit records for classification decisions.
//!
//! Every call to [`crate::CommandSafetyEngine::evaluate`] produces one
//! [`AuditRecord`] and hands it to the engine's [`AuditSink`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::category::SafetyCategory;
use crate::rule::{CommandLineVerdict, Rule};

/// One classification decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    /// The raw command line.
    pub input: String,
    pub category: SafetyCategory,
    pub parsed: bool,
    /// Parse failure reason, for unparsed input.
    pub parse_failure: Option<String>,
    pub invocations: Vec<AuditInvocation>,
}

/// Per-invocation part of an [`AuditRecord`].
#[derive(Debug, Clone, Serialize)]
pub struct AuditInvocation {
    pub command: String,
    pub category: SafetyCategory,
    pub rule: Rule,
    pub tier: u8,
    pub token: Option<String>,
}

impl AuditRecord {
    /// Build a record for a verdict on `input`.
    pub fn from_verdict(input: &str, verdict: &CommandLineVerdict) -> Self {
        let invocations = verdict
            .parse
            .invocations()
            .iter()
            .zip(&verdict.invocations)
            .map(|(invocation, outcome)| AuditInvocation {
                command: invocation.command_name.clone(),
                category: outcome.category,
                rule: outcome.rule,
                tier: outcome.rule.tier(),
                token: outcome.token.clone(),
            })
            .collect();

        Self {
            timestamp: Utc::now(),
            input: input.to_string(),
            category: verdict.category,
            parsed: verdict.parse.is_parsed(),
            parse_failure: verdict.parse.failure().map(ToString::to_string),
            invocations,
        }
    }
}

/// Receives one record per classified command line.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Emits records as `tracing` events on the `shellgate::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        let rules: Vec<String> = record
            .invocations
            .iter()
            .map(|inv| format!("{}:tier{}", inv.command, inv.tier))
            .collect();
        info!(
            target: "shellgate::audit",
            input = %record.input,
            category = record.category.as_str(),
            parsed = record.parsed,
            parse_failure = record.parse_failure.as_deref().unwrap_or_default(),
            rules = %rules.join(","),
            "command line classified"
        );
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    /// Records whose category blocks execution.
    pub fn blocked(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.category.is_blocked())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// All records as JSON lines.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let records = self.records.lock();
        let mut out = String::new();
        for record in records.iter() {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &AuditRecord) {
        self.records.lock().push(record.clone());
    }
}
