//! Path-shape analysis of argument tokens.
//!
//! Purely lexical: nothing here touches the filesystem.

use serde::Serialize;

/// How an argument looks as a filesystem reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathSignal {
    /// Not a flag, and shaped like a path or file name.
    pub is_path_like: bool,
    /// Rooted at `/`, `~`, `$HOME`, a drive letter or a UNC share.
    pub is_absolute: bool,
    /// Contains `..` segments that climb above the starting directory.
    pub has_traversal: bool,
}

impl PathSignal {
    /// Classify a single token.
    pub fn analyze(token: &str) -> Self {
        if token.is_empty() || token.starts_with('-') || is_url(token) {
            return Self::default();
        }

        let is_path_like = token.contains(['/', '\\'])
            || token == "."
            || token == ".."
            || token.starts_with('~')
            || looks_like_file_name(token);
        if !is_path_like {
            return Self::default();
        }

        Self {
            is_path_like,
            is_absolute: is_absolute(token),
            has_traversal: escapes_base(token),
        }
    }

    /// Path-like and either absolute or escaping the working directory.
    pub fn is_risky(&self) -> bool {
        self.is_path_like && (self.is_absolute || self.has_traversal)
    }
}

/// Tokens of an argument worth analysing as paths.
///
/// The argument itself unless it is a flag, plus the value of `--flag=value`
/// and `key=value` forms.
pub(crate) fn path_candidates(arg: &str) -> Vec<&str> {
    let mut candidates = Vec::with_capacity(2);
    if !arg.starts_with('-') {
        candidates.push(arg);
    }
    if !is_url(arg)
        && let Some((key, value)) = arg.split_once('=')
        && !key.is_empty()
        && !value.is_empty()
    {
        candidates.push(value);
    }
    candidates
}

fn is_url(token: &str) -> bool {
    token.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// `name.ext` with a short alphanumeric extension.
fn looks_like_file_name(token: &str) -> bool {
    if token.contains(char::is_whitespace) {
        return false;
    }
    match token.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && (1..=8).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

fn is_absolute(token: &str) -> bool {
    token.starts_with(['/', '\\', '~'])
        || token.starts_with("$HOME")
        || token.starts_with("${HOME}")
        || has_drive_prefix(token)
}

fn has_drive_prefix(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// True if walking the segments ever climbs above the starting point.
fn escapes_base(token: &str) -> bool {
    let mut depth: usize = 0;
    for segment in token.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => match depth.checked_sub(1) {
                Some(parent) => depth = parent,
                None => return true,
            },
            _ => depth += 1,
        }
    }
    false
}

/// Canonical lexical form used for location matching.
///
/// Backslashes become `/`, `$HOME` and `${HOME}` fold to `~`, empty and `.`
/// segments are dropped and `..` is collapsed. A rooted path never climbs
/// above its root; a relative one keeps its leading `..` segments. Drive
/// paths are lowercased.
pub(crate) fn normalize(token: &str) -> String {
    let unified = token.replace('\\', "/");
    let folded = match unified
        .strip_prefix("${HOME}")
        .or_else(|| unified.strip_prefix("$HOME"))
    {
        Some(rest) => format!("~{rest}"),
        None => unified,
    };

    let (anchor, rest) = if let Some(rest) = folded.strip_prefix('/') {
        ("/", rest)
    } else if folded == "~" || folded.starts_with("~/") {
        ("~/", folded.get(1..).unwrap_or_default())
    } else {
        ("", folded.as_str())
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if anchor.is_empty() {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    let normalized = match (anchor, joined.is_empty()) {
        ("", true) => ".".to_string(),
        ("~/", true) => "~".to_string(),
        (anchor, _) => format!("{anchor}{joined}"),
    };
    if has_drive_prefix(&normalized) {
        normalized.to_ascii_lowercase()
    } else {
        normalized
    }
}

/// True if `path` is `location` or nested under it. Both must be normalised.
pub(crate) fn is_within(path: &str, location: &str) -> bool {
    if path == location {
        return true;
    }
    if location == "/" || location == "." {
        return false;
    }
    path.strip_prefix(location)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Final segment of a normalised path.
pub(crate) fn file_name(normalized: &str) -> &str {
    normalized.rsplit('/').next().unwrap_or(normalized)
}
