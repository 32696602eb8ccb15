//! Shell grammar parser.
//!
//! Parses a raw command line with the tree-sitter bash grammar, lowers the
//! concrete syntax tree into a [`ShellNode`] tree and flattens it into
//! [`ParsedInvocation`]s. Any grammar error yields [`ParseResult::Unparsed`];
//! the parser never panics on user input.
//!
//! ```text
//! Input:  "cd src && cat $(ls *.rs) | wc -l > count.txt"
//! Output: [cd src] [cat $(ls *.rs)] [ls *.rs] [wc -l  (> count.txt)]
//! ```

use std::cell::RefCell;

use tracing::{debug, trace};
use tree_sitter::{Node, Parser};

use crate::ast::{ChainOperator, CommandNode, GroupKind, ShellNode};
use crate::invocation::{ParseFailure, ParseResult, Redirection, RedirectionKind};

/// Default limit on the size of a command line handed to the grammar.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 64 * 1024;

/// Deepest syntax nesting the lowering pass follows.
pub(crate) const MAX_NESTING_DEPTH: usize = 256;

const SNIPPET_CHARS: usize = 32;

thread_local! {
    static BASH_PARSER: RefCell<Parser> = RefCell::new(new_bash_parser());
}

fn new_bash_parser() -> Parser {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_bash::LANGUAGE.into();
    parser
        .set_language(&language)
        .expect("bundled bash grammar must be compatible with tree-sitter");
    parser
}

/// Parse a raw command line with the default size limit.
pub fn parse(raw: &str) -> ParseResult {
    parse_with_limit(raw, DEFAULT_MAX_INPUT_BYTES)
}

/// Parse a raw command line, refusing input longer than `max_input_bytes`.
pub fn parse_with_limit(raw: &str, max_input_bytes: usize) -> ParseResult {
    match parse_tree(raw, max_input_bytes) {
        Ok(tree) => ParseResult::Parsed {
            invocations: tree.map(ShellNode::flatten).unwrap_or_default(),
        },
        Err(reason) => {
            debug!(input = %raw, %reason, "command line could not be parsed");
            ParseResult::Unparsed {
                input: raw.to_string(),
                reason,
            }
        }
    }
}

/// Parse into the syntax tree. `Ok(None)` means blank or comment-only input.
pub(crate) fn parse_tree(
    raw: &str,
    max_input_bytes: usize,
) -> Result<Option<ShellNode>, ParseFailure> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    if raw.len() > max_input_bytes {
        return Err(ParseFailure::TooLong {
            len: raw.len(),
            limit: max_input_bytes,
        });
    }

    let tree = BASH_PARSER
        .with(|parser| parser.borrow_mut().parse(raw, None))
        .ok_or(ParseFailure::NoTree)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(first_error(root, raw));
    }

    let lowered = Lowering { source: raw }.lower(root, 0)?;
    if let Some(node) = &lowered {
        trace!(shape = %node.shape(), "lowered command line");
    }
    Ok(lowered)
}

/// Locate the first error or missing node in source order.
fn first_error(root: Node<'_>, source: &str) -> ParseFailure {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let position = node.start_position();
        if node.is_missing() {
            return ParseFailure::Missing {
                token: node.kind().to_string(),
                line: position.row + 1,
                column: position.column + 1,
            };
        }
        if node.is_error() {
            return ParseFailure::Syntax {
                line: position.row + 1,
                column: position.column + 1,
                snippet: snippet(node.utf8_text(source.as_bytes()).unwrap_or(source)),
            };
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    ParseFailure::Syntax {
        line: 1,
        column: 1,
        snippet: snippet(source),
    }
}

fn snippet(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > SNIPPET_CHARS {
        let cut: String = line.chars().take(SNIPPET_CHARS).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

/// Remove shell quoting from a single word.
///
/// Words that do not split into exactly one token (substitutions containing
/// spaces, for example) keep their source text.
pub(crate) fn dequote(text: &str) -> String {
    match shlex::split(text) {
        Some(mut words) if words.len() == 1 => words.remove(0),
        _ => text.to_string(),
    }
}

/// Lowers tree-sitter nodes into [`ShellNode`]s.
struct Lowering<'s> {
    source: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn word(&self, node: Node<'_>) -> String {
        dequote(self.text(node))
    }

    fn lower(&self, node: Node<'_>, depth: usize) -> Result<Option<ShellNode>, ParseFailure> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ParseFailure::TooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }

        match node.kind() {
            "comment" => Ok(None),
            "list" => self.lower_list(node, depth),
            "pipeline" => self.lower_pipeline(node, depth),
            "subshell" => self.lower_group(node, GroupKind::Subshell, depth),
            "compound_statement" => self.lower_group(node, GroupKind::Brace, depth),
            "command_substitution" => {
                self.lower_group(node, GroupKind::CommandSubstitution, depth)
            }
            "process_substitution" => {
                self.lower_group(node, GroupKind::ProcessSubstitution, depth)
            }
            "redirected_statement" => self.lower_redirected(node, depth),
            "command" => Ok(Some(ShellNode::Command(self.lower_command(node, depth)?))),
            "declaration_command" | "unset_command" => Ok(Some(ShellNode::Command(
                self.lower_keyword_command(node, depth)?,
            ))),
            "test_command" => Ok(Some(ShellNode::Command(
                self.lower_test_command(node, depth)?,
            ))),
            "variable_assignment" | "variable_assignments" => Ok(Some(ShellNode::Command(
                self.lower_assignment_statement(node, depth)?,
            ))),
            // program, if/while/for/case, function definitions, negation,
            // assignments and words: keep whatever commands they contain.
            _ => Ok(ShellNode::sequence(self.lower_children(node, depth)?)),
        }
    }

    fn lower_children(&self, node: Node<'_>, depth: usize) -> Result<Vec<ShellNode>, ParseFailure> {
        let mut nodes = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(lowered) = self.lower(child, depth + 1)? {
                nodes.push(lowered);
            }
        }
        Ok(nodes)
    }

    /// `&&` / `||` chains. The grammar nests them to the left; the chain is
    /// walked iteratively so its length does not count as nesting.
    fn lower_list(&self, node: Node<'_>, depth: usize) -> Result<Option<ShellNode>, ParseFailure> {
        let mut links = Vec::new();
        let mut head = node;
        while head.kind() == "list" {
            let Some((operator, left, right)) = chain_link(head) else {
                break;
            };
            links.push((operator, right));
            head = left;
        }
        if links.is_empty() {
            return Ok(ShellNode::sequence(self.lower_children(node, depth)?));
        }

        let mut first = if head.kind() == "list" {
            ShellNode::sequence(self.lower_children(head, depth)?)
        } else {
            self.lower(head, depth + 1)?
        };
        let mut rest = Vec::with_capacity(links.len());
        for (operator, operand) in links.into_iter().rev() {
            let Some(lowered) = self.lower(operand, depth + 1)? else {
                continue;
            };
            if first.is_none() {
                first = Some(lowered);
            } else {
                rest.push((operator, lowered));
            }
        }

        Ok(first.map(|first| {
            if rest.is_empty() {
                first
            } else {
                ShellNode::Conditional {
                    first: Box::new(first),
                    rest,
                }
            }
        }))
    }

    fn lower_pipeline(&self, node: Node<'_>, depth: usize) -> Result<Option<ShellNode>, ParseFailure> {
        let mut stages = self.lower_children(node, depth)?;
        Ok(match stages.len() {
            0 => None,
            1 => stages.pop(),
            _ => Some(ShellNode::Pipeline(stages)),
        })
    }

    fn lower_group(
        &self,
        node: Node<'_>,
        kind: GroupKind,
        depth: usize,
    ) -> Result<Option<ShellNode>, ParseFailure> {
        Ok(ShellNode::sequence(self.lower_children(node, depth)?).map(|body| {
            ShellNode::Subshell {
                kind,
                body: Box::new(body),
            }
        }))
    }

    fn lower_redirected(&self, node: Node<'_>, depth: usize) -> Result<Option<ShellNode>, ParseFailure> {
        let body = node.child_by_field_name("body");
        let mut redirections = Vec::new();
        let mut trailing = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if Some(child) == body {
                continue;
            }
            if is_redirect(child.kind()) {
                redirections.push(self.redirection(child));
            }
            if let Some(lowered) = self.lower(child, depth + 1)? {
                trailing.push(lowered);
            }
        }

        let lowered_body = match body {
            Some(body) => self.lower(body, depth + 1)?,
            None => None,
        };
        let head = match lowered_body {
            // A bare command absorbs its redirections directly.
            Some(ShellNode::Command(mut command)) => {
                command.raw_text = self.text(node).to_string();
                command.redirections.extend(redirections);
                ShellNode::Command(command)
            }
            Some(body) => ShellNode::Redirected {
                body: Box::new(body),
                redirections,
            },
            // Redirections with nothing to run still open files.
            None => ShellNode::Command(CommandNode {
                name: String::new(),
                arguments: Vec::new(),
                raw_text: self.text(node).to_string(),
                redirections,
                assignments: Vec::new(),
                nested: Vec::new(),
            }),
        };

        if trailing.is_empty() {
            Ok(Some(head))
        } else {
            trailing.insert(0, head);
            Ok(Some(ShellNode::Sequence(trailing)))
        }
    }

    fn lower_command(&self, node: Node<'_>, depth: usize) -> Result<CommandNode, ParseFailure> {
        let mut command = CommandNode {
            name: String::new(),
            arguments: Vec::new(),
            raw_text: self.text(node).to_string(),
            redirections: Vec::new(),
            assignments: Vec::new(),
            nested: Vec::new(),
        };

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "comment" => continue,
                "command_name" => command.name = self.word(child),
                "variable_assignment" => {
                    command.assignments.push(self.word(child));
                    command.nested.extend(self.lower_children(child, depth)?);
                    continue;
                }
                "heredoc_body" | "heredoc_start" | "heredoc_end" => {}
                kind if is_redirect(kind) => command.redirections.push(self.redirection(child)),
                _ => command.arguments.push(self.word(child)),
            }
            if let Some(nested) = self.lower(child, depth + 1)? {
                command.nested.push(nested);
            }
        }

        Ok(command)
    }

    /// `export`, `local`, `declare`, `readonly`, `typeset` and `unset`.
    fn lower_keyword_command(&self, node: Node<'_>, depth: usize) -> Result<CommandNode, ParseFailure> {
        let mut command = CommandNode {
            name: String::new(),
            arguments: Vec::new(),
            raw_text: self.text(node).to_string(),
            redirections: Vec::new(),
            assignments: Vec::new(),
            nested: Vec::new(),
        };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if !child.is_named() {
                if command.name.is_empty() {
                    command.name = self.text(child).to_string();
                }
                continue;
            }
            if child.kind() == "comment" {
                continue;
            }
            command.arguments.push(self.word(child));
            if child.kind() == "variable_assignment" {
                command.nested.extend(self.lower_children(child, depth)?);
            } else if let Some(nested) = self.lower(child, depth + 1)? {
                command.nested.push(nested);
            }
        }

        Ok(command)
    }

    /// `NAME=value` with no command: an invocation without a name.
    fn lower_assignment_statement(
        &self,
        node: Node<'_>,
        depth: usize,
    ) -> Result<CommandNode, ParseFailure> {
        let mut command = CommandNode {
            name: String::new(),
            arguments: Vec::new(),
            raw_text: self.text(node).to_string(),
            redirections: Vec::new(),
            assignments: Vec::new(),
            nested: Vec::new(),
        };

        let assignments: Vec<Node<'_>> = if node.kind() == "variable_assignments" {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|child| child.kind() == "variable_assignment")
                .collect()
        } else {
            vec![node]
        };
        for assignment in assignments {
            command.assignments.push(self.word(assignment));
            command.nested.extend(self.lower_children(assignment, depth)?);
        }

        Ok(command)
    }

    /// `[ ... ]` and `[[ ... ]]`, named `test`.
    fn lower_test_command(&self, node: Node<'_>, depth: usize) -> Result<CommandNode, ParseFailure> {
        let mut arguments = Vec::new();
        let mut cursor = node.walk();
        let mut stack: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.reverse();
        while let Some(current) = stack.pop() {
            if is_test_operand(current) {
                arguments.push(self.word(current));
                continue;
            }
            let mut cursor = current.walk();
            let children: Vec<Node<'_>> = current.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        Ok(CommandNode {
            name: "test".to_string(),
            arguments,
            raw_text: self.text(node).to_string(),
            redirections: Vec::new(),
            assignments: Vec::new(),
            nested: self.lower_children(node, depth)?,
        })
    }

    fn redirection(&self, node: Node<'_>) -> Redirection {
        let node_kind = node.kind();
        let mut descriptor = None;
        let mut operator = String::new();
        let mut target = Vec::new();

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "file_descriptor" => descriptor = Some(self.text(child).to_string()),
                "heredoc_start" => target.push(self.word(child)),
                _ if !child.is_named() => {
                    if operator.is_empty() {
                        operator = self.text(child).to_string();
                    }
                }
                _ if node_kind == "heredoc_redirect" => {}
                _ => target.push(self.word(child)),
            }
        }

        let target = target.join(" ");
        let kind = match node_kind {
            "heredoc_redirect" => RedirectionKind::HereDoc,
            "herestring_redirect" => RedirectionKind::HereString,
            _ if operator.ends_with('-')
                || (matches!(operator.as_str(), ">&" | "<&")
                    && (target == "-" || target.chars().all(|c| c.is_ascii_digit()))) =>
            {
                RedirectionKind::Duplicate
            }
            _ if operator.contains('>') => RedirectionKind::Output,
            _ => RedirectionKind::Input,
        };

        Redirection {
            descriptor,
            operator,
            target,
            kind,
        }
    }
}

/// Operator and operands of one binary `&&` / `||` list node.
fn chain_link(node: Node<'_>) -> Option<(ChainOperator, Node<'_>, Node<'_>)> {
    let mut operator = None;
    let mut operands = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.is_named() {
            if child.kind() != "comment" {
                operands.push(child);
            }
            continue;
        }
        match child.kind() {
            "&&" => operator = Some(ChainOperator::And),
            "||" => operator = Some(ChainOperator::Or),
            _ => {}
        }
    }
    match (operator, operands.as_slice()) {
        (Some(operator), [left, right]) => Some((operator, *left, *right)),
        _ => None,
    }
}

fn is_redirect(kind: &str) -> bool {
    matches!(kind, "file_redirect" | "heredoc_redirect" | "herestring_redirect")
}

/// Leaf operands inside a test bracket.
fn is_test_operand(node: Node<'_>) -> bool {
    if !node.is_named() {
        // Anonymous operators such as `=`, `!=`, `-eq` or `&&`.
        return !matches!(node.kind(), "[" | "]" | "[[" | "]]" | "(" | ")");
    }
    matches!(
        node.kind(),
        "word"
            | "string"
            | "raw_string"
            | "ansi_c_string"
            | "translated_string"
            | "number"
            | "concatenation"
            | "simple_expansion"
            | "expansion"
            | "command_substitution"
            | "test_operator"
            | "regex"
            | "extglob_pattern"
    ) || node.named_child_count() == 0
}
