//! Parsed invocations and the parser's result type.

use serde::Serialize;
use thiserror::Error;

/// One command within a compound command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedInvocation {
    /// The executable token, quotes removed. Empty if it could not be parsed.
    pub command_name: String,

    /// Argument tokens in source order, quotes removed.
    pub arguments: Vec<String>,

    /// Original source text of the command, for diagnostics.
    pub raw_text: String,

    /// Redirections attached to the command. Never part of `arguments`.
    pub redirections: Vec<Redirection>,

    /// `NAME=value` assignments written before the command, quotes removed.
    /// An invocation with assignments and no name is a bare assignment
    /// statement (`PATH=/opt/bin`).
    pub assignments: Vec<String>,
}

impl ParsedInvocation {
    /// Build an invocation from a name and arguments, without redirections.
    pub fn new(command_name: impl Into<String>, arguments: Vec<String>) -> Self {
        let command_name = command_name.into();
        let raw_text = std::iter::once(command_name.as_str())
            .chain(arguments.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            command_name,
            arguments,
            raw_text,
            redirections: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Add leading `NAME=value` assignments.
    pub fn with_assignments(mut self, assignments: Vec<String>) -> Self {
        self.assignments = assignments;
        self
    }

    /// Returns true for a bare assignment statement with no command.
    pub fn is_assignment_only(&self) -> bool {
        self.command_name.trim().is_empty() && !self.assignments.is_empty()
    }

    /// The command name without any leading directories.
    pub fn basename(&self) -> &str {
        basename(&self.command_name)
    }

    /// Check if an argument is present (exact match).
    pub fn has_arg(&self, arg: &str) -> bool {
        self.arguments.iter().any(|a| a == arg)
    }

    /// Check if a flag is present (handles -x, --xxx, --xxx=v, -xyz formats).
    pub fn has_flag(&self, short: Option<char>, long: Option<&str>) -> bool {
        self.arguments.iter().any(|arg| {
            if let Some(l) = long
                && let Some(rest) = arg.strip_prefix("--")
                && (rest == l || rest.strip_prefix(l).is_some_and(|v| v.starts_with('=')))
            {
                return true;
            }
            short.is_some_and(|s| short_flag_cluster(arg).is_some_and(|cluster| cluster.contains(s)))
        })
    }

    /// Arguments that do not look like flags.
    pub fn positional_args(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .map(String::as_str)
            .filter(|a| !a.starts_with('-') || *a == "-")
            .collect()
    }

    /// Returns true if any redirection writes to a file.
    pub fn writes_output(&self) -> bool {
        self.redirections.iter().any(Redirection::writes)
    }
}

/// The letters of a `-xyz` style argument, or `None` for anything else.
pub(crate) fn short_flag_cluster(arg: &str) -> Option<&str> {
    let cluster = arg.strip_prefix('-')?;
    if cluster.is_empty()
        || cluster.starts_with('-')
        || !cluster.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(cluster)
}

pub(crate) fn basename(program: &str) -> &str {
    program
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(program)
}

/// What a redirection does with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectionKind {
    /// Reads a file (`<`).
    Input,
    /// Writes or appends to a file (`>`, `>>`, `&>`, `>|`).
    Output,
    /// Duplicates or closes a descriptor (`2>&1`, `<&-`).
    Duplicate,
    /// Here-document (`<<EOF`). The target is the delimiter.
    HereDoc,
    /// Here-string (`<<< text`). The target is the text.
    HereString,
}

/// A redirection recognised on a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirection {
    /// Explicit file descriptor (`2` in `2>`), if any.
    pub descriptor: Option<String>,
    /// Operator token as written.
    pub operator: String,
    /// Target text, quotes removed.
    pub target: String,
    pub kind: RedirectionKind,
}

impl Redirection {
    /// Returns true if the redirection writes to a file.
    pub fn writes(&self) -> bool {
        self.kind == RedirectionKind::Output
    }

    /// Returns true if the redirection reads a file.
    pub fn reads(&self) -> bool {
        self.kind == RedirectionKind::Input
    }
}

/// Result of parsing a raw command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseResult {
    /// Every leaf command, in left-to-right order. Empty only for blank input.
    Parsed { invocations: Vec<ParsedInvocation> },
    /// The grammar rejected the input. Carries the input unchanged.
    Unparsed { input: String, reason: ParseFailure },
}

impl ParseResult {
    /// Returns true if the input was understood by the grammar.
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseResult::Parsed { .. })
    }

    /// Parsed invocations; empty for unparsed input.
    pub fn invocations(&self) -> &[ParsedInvocation] {
        match self {
            ParseResult::Parsed { invocations } => invocations,
            ParseResult::Unparsed { .. } => &[],
        }
    }

    /// Failure reason for unparsed input.
    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            ParseResult::Parsed { .. } => None,
            ParseResult::Unparsed { reason, .. } => Some(reason),
        }
    }
}

/// Why a command line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseFailure {
    /// The grammar found an unexpected token.
    #[error("syntax error at line {line}, column {column} near `{snippet}`")]
    Syntax {
        line: usize,
        column: usize,
        snippet: String,
    },

    /// The input ended before a construct was closed.
    #[error("missing `{token}` at line {line}, column {column}")]
    Missing {
        token: String,
        line: usize,
        column: usize,
    },

    /// Input exceeds the configured size limit.
    #[error("input is {len} bytes, limit is {limit}")]
    TooLong { len: usize, limit: usize },

    /// Grouping is nested deeper than the parser follows.
    #[error("nesting deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// The grammar produced no tree at all.
    #[error("parser produced no syntax tree")]
    NoTree,
}
