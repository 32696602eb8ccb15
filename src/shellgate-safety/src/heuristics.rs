//! Per-invocation heuristics.
//!
//! Tiers run in a fixed order and the first one that matches decides:
//!
//! 1. unparsable or computed command name → risky
//! 2. denied command → risky
//! 3. denied command + argument combination, or a denied environment
//!    variable → risky
//! 4. sensitive location in an argument, assignment or file redirection → risky
//! 5. absolute path or traversal in an argument → risky
//! 6. known-safe command → safe
//! 7. anything else → ambiguous

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use crate::config::PolicyConfig;
use crate::invocation::{ParsedInvocation, basename};
use crate::path::{PathSignal, file_name, is_within, normalize, path_candidates};
use crate::rule::{InvocationVerdict, Rule};
use crate::tables::{
    ArgumentRule, DECLARATION_COMMANDS, DENIED_ARGUMENTS, DENIED_COMMAND_PREFIXES,
    DENIED_COMMANDS, DENIED_ENV_PREFIXES, DENIED_ENV_VARS, HARMLESS_SINK_PREFIX, HARMLESS_SINKS,
    MAX_WRAPPER_DEPTH, SAFE_COMMANDS, SENSITIVE_FILE_NAMES, SENSITIVE_PATHS, SafeCommand,
    Wrapper, find_wrapper,
};

/// The command that actually runs once wrappers are peeled off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EffectiveCommand<'a> {
    /// Program token as written.
    pub program: &'a str,
    /// Basename of the program, without a `.exe` suffix.
    pub name: &'a str,
    pub args: &'a [String],
    /// Index of `program` in the invocation's arguments, if it came from a wrapper.
    pub program_index: Option<usize>,
    /// Wrappers peeled off, outermost first.
    pub wrappers: Vec<&'a str>,
    /// Variables set for the command: prefix assignments, `env` settings and
    /// declaration arguments.
    pub environment: Vec<&'a str>,
}

impl<'a> EffectiveCommand<'a> {
    pub(crate) fn resolve(invocation: &'a ParsedInvocation) -> Self {
        let mut effective = Self {
            program: &invocation.command_name,
            name: command_key(&invocation.command_name),
            args: &invocation.arguments,
            program_index: None,
            wrappers: Vec::new(),
            environment: invocation.assignments.iter().map(String::as_str).collect(),
        };

        let mut offset = 0;
        for _ in 0..MAX_WRAPPER_DEPTH {
            let Some(wrapper) = find_wrapper(effective.name) else {
                break;
            };
            let Some(skip) = wrapped_command_index(wrapper, effective.args) else {
                break;
            };
            if wrapper.assignments {
                let settings: &'a [String] = &effective.args[..skip];
                effective
                    .environment
                    .extend(settings.iter().map(String::as_str).filter(|arg| is_assignment(arg)));
            }
            let index = offset + skip;
            effective.wrappers.push(effective.name);
            effective.program = &invocation.arguments[index];
            effective.name = command_key(effective.program);
            effective.args = &invocation.arguments[index + 1..];
            effective.program_index = Some(index);
            offset = index + 1;
        }

        if DECLARATION_COMMANDS.contains(&effective.name) {
            let declared: &'a [String] = effective.args;
            effective
                .environment
                .extend(declared.iter().map(String::as_str).filter(|arg| is_assignment(arg)));
        }

        effective
    }
}

fn command_key(program: &str) -> &str {
    let name = basename(program);
    name.strip_suffix(".exe").unwrap_or(name)
}

/// Position of the wrapped command within the wrapper's arguments.
fn wrapped_command_index(wrapper: &Wrapper, args: &[String]) -> Option<usize> {
    let mut positional = wrapper.positional;
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            i += 1;
            break;
        }
        if arg.starts_with('-') && arg.len() > 1 {
            i += if wrapper.value_flags.contains(&arg) { 2 } else { 1 };
            continue;
        }
        if wrapper.assignments && arg.split_once('=').is_some_and(|(key, _)| !key.is_empty()) {
            i += 1;
            continue;
        }
        if positional > 0 {
            positional -= 1;
            i += 1;
            continue;
        }
        break;
    }
    (i < args.len()).then_some(i)
}

/// `NAME=value`, `NAME+=value` or `NAME[i]=value`.
fn is_assignment(arg: &str) -> bool {
    arg.contains('=') && is_variable_name(variable_name(arg))
}

fn variable_name(assignment: &str) -> &str {
    let end = assignment.find(['=', '+', '[']).unwrap_or(assignment.len());
    &assignment[..end]
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_denied_variable(name: &str) -> bool {
    DENIED_ENV_VARS.contains(&name)
        || DENIED_ENV_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

/// Token the shell rewrites before the command sees it (`$VAR`, `$(cmd)`, backticks).
fn has_expansion(token: &str) -> bool {
    if token.contains('`') {
        return true;
    }
    token.match_indices('$').any(|(index, _)| {
        token[index + 1..].chars().next().is_some_and(|next| {
            next.is_ascii_alphanumeric()
                || matches!(next, '_' | '{' | '(' | '@' | '*' | '#' | '?' | '!' | '$' | '-')
        })
    })
}

/// Names whose value is only known once the shell expands them.
fn is_computed_name(program: &str) -> bool {
    program.contains(['$', '`', '*', '?'])
}

fn is_harmless_sink(target: &str) -> bool {
    let normalized = normalize(target);
    HARMLESS_SINKS.contains(&normalized.as_str()) || normalized.starts_with(HARMLESS_SINK_PREFIX)
}

/// Compiled tables plus the tier logic.
#[derive(Debug)]
pub(crate) struct Heuristics {
    denied_commands: HashSet<String>,
    argument_rules: HashMap<&'static str, Vec<&'static ArgumentRule>>,
    safe_commands: HashMap<&'static str, Vec<&'static SafeCommand>>,
    custom_safe_commands: HashSet<String>,
    sensitive_paths: Vec<String>,
    allowed_paths: Vec<String>,
    flag_computed_names: bool,
}

impl Heuristics {
    pub(crate) fn new(config: &PolicyConfig) -> Self {
        let denied_commands = DENIED_COMMANDS
            .iter()
            .map(|name| (*name).to_string())
            .chain(config.denied_commands.iter().map(|name| name.trim().to_string()))
            .collect();

        let mut argument_rules: HashMap<&'static str, Vec<&'static ArgumentRule>> = HashMap::new();
        for family in DENIED_ARGUMENTS {
            for command in family.commands {
                argument_rules
                    .entry(*command)
                    .or_default()
                    .extend(family.rules.iter());
            }
        }

        let mut safe_commands: HashMap<&'static str, Vec<&'static SafeCommand>> = HashMap::new();
        for entry in SAFE_COMMANDS {
            safe_commands.entry(entry.name).or_default().push(entry);
        }

        let sensitive_paths = SENSITIVE_PATHS
            .iter()
            .copied()
            .chain(config.sensitive_paths.iter().map(String::as_str))
            .map(normalize)
            .collect();

        Self {
            denied_commands,
            argument_rules,
            safe_commands,
            custom_safe_commands: config
                .safe_commands
                .iter()
                .map(|name| name.trim().to_string())
                .collect(),
            sensitive_paths,
            allowed_paths: config.allowed_paths.iter().map(|p| normalize(p)).collect(),
            flag_computed_names: config.flag_dynamic_command_names,
        }
    }

    /// Classify one invocation.
    pub(crate) fn evaluate(&self, invocation: &ParsedInvocation) -> InvocationVerdict {
        let assignment_only = invocation.is_assignment_only();
        if invocation.command_name.trim().is_empty() && !assignment_only {
            return self.fire(
                invocation,
                Rule::UnparsableName,
                None,
                "command name could not be determined".to_string(),
            );
        }

        let effective = EffectiveCommand::resolve(invocation);
        if effective.name.trim().is_empty() && !assignment_only {
            return self.fire(
                invocation,
                Rule::UnparsableName,
                Some(effective.program),
                "wrapped command name could not be determined".to_string(),
            );
        }
        if self.flag_computed_names && is_computed_name(effective.program) {
            return self.fire(
                invocation,
                Rule::UnparsableName,
                Some(effective.program),
                format!("command name `{}` is computed at run time", effective.program),
            );
        }

        assert!(
            assignment_only || !effective.name.is_empty(),
            "tiers after the first require a resolved command name"
        );

        self.check_denied_command(invocation, &effective)
            .or_else(|| self.check_denied_arguments(invocation, &effective))
            .or_else(|| self.check_environment(invocation, &effective))
            .or_else(|| self.check_sensitive_paths(invocation, &effective))
            .or_else(|| self.check_path_shape(invocation, &effective))
            .or_else(|| self.check_allowlist(invocation, &effective))
            .unwrap_or_else(|| {
                let reason = if assignment_only {
                    "assignment changes the shell environment".to_string()
                } else {
                    format!("`{}` is not a known read-only command", effective.name)
                };
                InvocationVerdict::new(Rule::Unrecognized, None, reason)
            })
    }

    fn fire(
        &self,
        invocation: &ParsedInvocation,
        rule: Rule,
        token: Option<&str>,
        reason: String,
    ) -> InvocationVerdict {
        warn!(
            target: "shellgate::heuristics",
            rule = %rule,
            tier = rule.tier(),
            token = token.unwrap_or_default(),
            invocation = %invocation.raw_text,
            "{}",
            reason
        );
        InvocationVerdict::new(rule, token, reason)
    }

    // ========================================================================
    // Tier 2
    // ========================================================================

    fn check_denied_command(
        &self,
        invocation: &ParsedInvocation,
        effective: &EffectiveCommand<'_>,
    ) -> Option<InvocationVerdict> {
        let name = effective.name;
        let denied = self.denied_commands.contains(name)
            || DENIED_COMMAND_PREFIXES
                .iter()
                .any(|prefix| name.starts_with(prefix));
        if !denied {
            return None;
        }

        let reason = if effective.wrappers.is_empty() {
            format!("`{name}` is on the command deny list")
        } else {
            format!(
                "`{name}` (wrapped by {}) is on the command deny list",
                effective.wrappers.join(", ")
            )
        };
        Some(self.fire(invocation, Rule::DeniedCommand, Some(name), reason))
    }

    // ========================================================================
    // Tier 3
    // ========================================================================

    fn check_denied_arguments(
        &self,
        invocation: &ParsedInvocation,
        effective: &EffectiveCommand<'_>,
    ) -> Option<InvocationVerdict> {
        let rules = self.argument_rules.get(effective.name)?;
        rules.iter().find_map(|rule| {
            let tokens: Option<Vec<&str>> = rule
                .patterns
                .iter()
                .map(|pattern| pattern.find(effective.args))
                .collect();
            let tokens = tokens?;
            let token = tokens.last().copied();
            Some(self.fire(
                invocation,
                Rule::DeniedArgument,
                token,
                format!("{} ({} {})", rule.label, effective.name, tokens.join(" ")),
            ))
        })
    }

    fn check_environment(
        &self,
        invocation: &ParsedInvocation,
        effective: &EffectiveCommand<'_>,
    ) -> Option<InvocationVerdict> {
        let setting = effective
            .environment
            .iter()
            .copied()
            .find(|setting| is_denied_variable(variable_name(setting)))?;
        Some(self.fire(
            invocation,
            Rule::DeniedEnvironment,
            Some(setting),
            format!(
                "`{}` changes what the command loads or runs",
                variable_name(setting)
            ),
        ))
    }

    // ========================================================================
    // Tier 4
    // ========================================================================

    fn is_sensitive(&self, candidate: &str) -> bool {
        let normalized = normalize(candidate);
        if SENSITIVE_FILE_NAMES.contains(&file_name(&normalized)) {
            return true;
        }
        PathSignal::analyze(candidate).is_path_like
            && self
                .sensitive_paths
                .iter()
                .any(|location| is_within(&normalized, location))
    }

    fn check_sensitive_paths(
        &self,
        invocation: &ParsedInvocation,
        effective: &EffectiveCommand<'_>,
    ) -> Option<InvocationVerdict> {
        for arg in path_arguments(invocation, effective) {
            if let Some(candidate) = path_candidates(arg)
                .into_iter()
                .find(|candidate| self.is_sensitive(candidate))
            {
                return Some(self.fire(
                    invocation,
                    Rule::SensitivePath,
                    Some(arg),
                    format!("`{candidate}` is a sensitive location"),
                ));
            }
        }

        let redirection = invocation.redirections.iter().find(|redirection| {
            (redirection.writes() || redirection.reads())
                && !is_harmless_sink(&redirection.target)
                && self.is_sensitive(&redirection.target)
        })?;
        let action = if redirection.reads() {
            "reads from"
        } else {
            "writes to"
        };
        Some(self.fire(
            invocation,
            Rule::SensitivePath,
            Some(redirection.target.as_str()),
            format!(
                "redirection `{}{}` {action} a sensitive location",
                redirection.operator, redirection.target
            ),
        ))
    }

    // ========================================================================
    // Tier 5
    // ========================================================================

    fn is_allowed(&self, candidate: &str) -> bool {
        let normalized = normalize(candidate);
        self.allowed_paths
            .iter()
            .any(|root| is_within(&normalized, root))
    }

    fn check_path_shape(
        &self,
        invocation: &ParsedInvocation,
        effective: &EffectiveCommand<'_>,
    ) -> Option<InvocationVerdict> {
        for arg in path_arguments(invocation, effective) {
            for candidate in path_candidates(arg) {
                let signal = PathSignal::analyze(candidate);
                if signal.is_path_like && signal.is_absolute && !self.is_allowed(candidate) {
                    return Some(self.fire(
                        invocation,
                        Rule::AbsolutePath,
                        Some(arg),
                        format!("`{candidate}` is an absolute path"),
                    ));
                }
                if signal.has_traversal {
                    return Some(self.fire(
                        invocation,
                        Rule::PathTraversal,
                        Some(arg),
                        format!("`{candidate}` climbs above the working directory"),
                    ));
                }
            }
        }
        None
    }

    // ========================================================================
    // Tier 6
    // ========================================================================

    fn check_allowlist(
        &self,
        invocation: &ParsedInvocation,
        effective: &EffectiveCommand<'_>,
    ) -> Option<InvocationVerdict> {
        let name = effective.name;
        if let Some(redirection) = invocation
            .redirections
            .iter()
            .find(|redirection| redirection.writes() && !is_harmless_sink(&redirection.target))
        {
            trace!(
                command = name,
                target = %redirection.target,
                "known-safe command writes through a redirection"
            );
            return None;
        }
        if !effective.environment.is_empty() {
            trace!(command = name, "command runs with a modified environment");
            return None;
        }
        if let Some(arg) = path_arguments(invocation, effective).find(|arg| has_expansion(arg)) {
            trace!(command = name, argument = arg, "argument is expanded by the shell");
            return None;
        }

        let allowed = self.custom_safe_commands.contains(name)
            || self
                .safe_commands
                .get(name)
                .is_some_and(|entries| entries.iter().any(|entry| permits(entry, effective.args)));
        allowed.then(|| {
            InvocationVerdict::new(
                Rule::Allowlisted,
                None,
                format!("`{name}` is a known read-only command"),
            )
        })
    }
}

/// Tokens subject to path checks: prefix assignments and every argument
/// except the wrapped program token.
fn path_arguments<'a>(
    invocation: &'a ParsedInvocation,
    effective: &EffectiveCommand<'_>,
) -> impl Iterator<Item = &'a str> {
    let skip = effective.program_index;
    let arguments = invocation
        .arguments
        .iter()
        .enumerate()
        .filter(move |(index, _)| Some(*index) != skip)
        .map(|(_, arg)| arg.as_str());
    invocation
        .assignments
        .iter()
        .map(String::as_str)
        .chain(arguments)
}

fn permits(entry: &SafeCommand, args: &[String]) -> bool {
    if !entry.subcommands.is_empty()
        && !subcommand(entry, args).is_some_and(|sub| entry.subcommands.contains(&sub))
    {
        return false;
    }
    if entry
        .forbidden
        .iter()
        .any(|pattern| pattern.find(args).is_some())
    {
        return false;
    }
    if entry.validator.is_some_and(|validate| !validate(args)) {
        return false;
    }
    entry.required.is_empty()
        || entry
            .required
            .iter()
            .any(|pattern| pattern.find(args).is_some())
}

/// First argument that is neither an option nor an option's value.
fn subcommand<'a>(entry: &SafeCommand, args: &'a [String]) -> Option<&'a str> {
    let mut iter = args.iter().map(String::as_str);
    while let Some(arg) = iter.next() {
        if entry.value_flags.contains(&arg) {
            iter.next();
            continue;
        }
        if arg.starts_with('-') && !entry.subcommands.contains(&arg) {
            continue;
        }
        return Some(arg);
    }
    None
}
