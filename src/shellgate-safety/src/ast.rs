//! Shell syntax tree produced by the parser, and its flattening into invocations.
//!
//! The tree keeps only what classification needs: leaf commands and the way
//! they are composed. Flattening walks it depth-first, left to right, so the
//! resulting invocations appear in source order.

use crate::invocation::{ParsedInvocation, Redirection};

/// Conditional chain operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChainOperator {
    /// `&&`
    And,
    /// `||`
    Or,
}

/// Kind of grouping construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupKind {
    /// `( ... )`
    Subshell,
    /// `{ ...; }`
    Brace,
    /// `$( ... )` or backticks
    CommandSubstitution,
    /// `<( ... )` or `>( ... )`
    ProcessSubstitution,
}

/// A leaf command with everything nested inside its words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandNode {
    pub name: String,
    pub arguments: Vec<String>,
    pub raw_text: String,
    pub redirections: Vec<Redirection>,
    /// Leading `NAME=value` words.
    pub assignments: Vec<String>,
    /// Commands found in substitutions within the name, arguments,
    /// assignments or redirect targets.
    pub nested: Vec<ShellNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShellNode {
    Command(CommandNode),
    /// `a | b | c`
    Pipeline(Vec<ShellNode>),
    /// `a; b`, `a & b`, newlines, and compound statement bodies.
    Sequence(Vec<ShellNode>),
    /// `a && b || c`, kept flat: the first operand, then each operator
    /// with the operand that follows it.
    Conditional {
        first: Box<ShellNode>,
        rest: Vec<(ChainOperator, ShellNode)>,
    },
    Subshell {
        kind: GroupKind,
        body: Box<ShellNode>,
    },
    /// A compound statement with redirections applied to all of it.
    Redirected {
        body: Box<ShellNode>,
        redirections: Vec<Redirection>,
    },
}

impl ShellNode {
    /// Collapse a list of nodes: nothing, the single node, or a sequence.
    pub(crate) fn sequence(mut nodes: Vec<ShellNode>) -> Option<ShellNode> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(ShellNode::Sequence(nodes)),
        }
    }

    /// Compact rendering of the tree structure, used in trace logs.
    ///
    /// Commands are reduced to their names; redirections show operator and
    /// target.
    pub(crate) fn shape(&self) -> String {
        match self {
            ShellNode::Command(command) => {
                let head = if !command.name.is_empty() {
                    command.name.clone()
                } else if !command.assignments.is_empty() {
                    command.assignments.join(" ")
                } else {
                    "?".to_string()
                };
                let mut parts = vec![head];
                parts.extend(command.nested.iter().map(ShellNode::shape));
                parts.extend(
                    command
                        .redirections
                        .iter()
                        .map(|r| format!("{}{}", r.operator, r.target)),
                );
                parts.join(" ")
            }
            ShellNode::Pipeline(nodes) => join_shapes(nodes, " | "),
            ShellNode::Sequence(nodes) => join_shapes(nodes, "; "),
            ShellNode::Conditional { first, rest } => {
                let mut shape = first.shape();
                for (operator, node) in rest {
                    let op = match operator {
                        ChainOperator::And => "&&",
                        ChainOperator::Or => "||",
                    };
                    shape.push_str(&format!(" {op} {}", node.shape()));
                }
                shape
            }
            ShellNode::Subshell { kind, body } => match kind {
                GroupKind::Subshell => format!("({})", body.shape()),
                GroupKind::Brace => format!("{{ {}; }}", body.shape()),
                GroupKind::CommandSubstitution => format!("$({})", body.shape()),
                GroupKind::ProcessSubstitution => format!("<({})", body.shape()),
            },
            ShellNode::Redirected { body, redirections } => {
                let targets: Vec<String> = redirections
                    .iter()
                    .map(|r| format!("{}{}", r.operator, r.target))
                    .collect();
                format!("{} {}", body.shape(), targets.join(" "))
            }
        }
    }

    /// Flatten into invocations, depth-first and left to right.
    pub(crate) fn flatten(self) -> Vec<ParsedInvocation> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<ParsedInvocation>) {
        match self {
            ShellNode::Command(mut command) => {
                let nested = std::mem::take(&mut command.nested);
                out.push(command.into());
                for node in nested {
                    node.flatten_into(out);
                }
            }
            ShellNode::Pipeline(nodes) | ShellNode::Sequence(nodes) => {
                for node in nodes {
                    node.flatten_into(out);
                }
            }
            ShellNode::Conditional { first, rest } => {
                first.flatten_into(out);
                for (_, node) in rest {
                    node.flatten_into(out);
                }
            }
            ShellNode::Subshell { body, .. } => body.flatten_into(out),
            ShellNode::Redirected { body, redirections } => {
                let start = out.len();
                body.flatten_into(out);
                for invocation in &mut out[start..] {
                    invocation.redirections.extend(redirections.iter().cloned());
                }
            }
        }
    }
}

fn join_shapes(nodes: &[ShellNode], separator: &str) -> String {
    nodes
        .iter()
        .map(ShellNode::shape)
        .collect::<Vec<_>>()
        .join(separator)
}

impl From<CommandNode> for ParsedInvocation {
    fn from(command: CommandNode) -> Self {
        ParsedInvocation {
            command_name: command.name,
            arguments: command.arguments,
            raw_text: command.raw_text,
            redirections: command.redirections,
            assignments: command.assignments,
        }
    }
}
