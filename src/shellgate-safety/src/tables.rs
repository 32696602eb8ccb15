//! Built-in command, argument and path tables.
//!
//! Names are matched against the basename of the effective command, after
//! wrappers such as `env` or `timeout` are peeled off.

use crate::invocation::short_flag_cluster;

// ============================================================================
// Argument patterns
// ============================================================================

/// A pattern matched against a single argument token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgPattern {
    /// The whole token.
    Exact(&'static str),
    /// Token starts with the text (`--force-with-lease=...`).
    Prefix(&'static str),
    /// Letter inside a short flag cluster (`-rf` carries `r` and `f`).
    ShortFlag(char),
    /// Option given before the first positional argument (`git -c x=y log`).
    /// The listed options consume the token after them.
    Leading(&'static str, &'static [&'static str]),
}

impl ArgPattern {
    pub(crate) fn matches(&self, arg: &str) -> bool {
        match self {
            ArgPattern::Exact(token) => arg == *token,
            ArgPattern::Prefix(prefix) => arg.starts_with(prefix),
            ArgPattern::ShortFlag(letter) => {
                short_flag_cluster(arg).is_some_and(|cluster| cluster.contains(*letter))
            }
            ArgPattern::Leading(option, _) => arg == *option,
        }
    }

    /// First argument matching the pattern.
    pub(crate) fn find<'a>(&self, args: &'a [String]) -> Option<&'a str> {
        if let ArgPattern::Leading(option, value_options) = self {
            return leading_option(args, option, value_options);
        }
        args.iter().map(String::as_str).find(|arg| self.matches(arg))
    }
}

fn leading_option<'a>(
    args: &'a [String],
    option: &str,
    value_options: &[&str],
) -> Option<&'a str> {
    let mut iter = args.iter().map(String::as_str);
    while let Some(arg) = iter.next() {
        if arg == option {
            return Some(arg);
        }
        if !arg.starts_with('-') || arg == "--" {
            return None;
        }
        if value_options.contains(&arg) {
            iter.next();
        }
    }
    None
}

/// Patterns that must all be present among the arguments.
#[derive(Debug)]
pub(crate) struct ArgumentRule {
    pub patterns: &'static [ArgPattern],
    pub label: &'static str,
}

/// Argument rules shared by a family of commands.
#[derive(Debug)]
pub(crate) struct CommandArgumentRules {
    pub commands: &'static [&'static str],
    pub rules: &'static [ArgumentRule],
}

use ArgPattern::{Exact, Leading, Prefix, ShortFlag};

const fn rule(patterns: &'static [ArgPattern], label: &'static str) -> ArgumentRule {
    ArgumentRule { patterns, label }
}

// ============================================================================
// Tier 2: denied commands
// ============================================================================

/// Commands refused regardless of arguments.
pub(crate) const DENIED_COMMANDS: &[&str] = &[
    // Privilege escalation
    "sudo", "su", "doas", "pkexec", "runuser", "setpriv", "gksudo", "kdesudo", "chroot",
    "setcap", "visudo",
    // Disk and filesystem destruction
    "dd", "mkfs", "mke2fs", "mkswap", "fdisk", "sfdisk", "gdisk", "cfdisk", "parted", "wipefs",
    "shred", "blkdiscard", "hdparm", "mount", "umount", "losetup", "cryptsetup", "mdadm",
    "lvremove", "vgremove", "pvremove", "diskutil", "diskpart", "format",
    // Raw network access
    "nc", "ncat", "netcat", "socat", "telnet", "nmap", "tcpdump", "iptables", "ip6tables",
    "nft", "ufw",
    // Arbitrary code execution
    "bash", "sh", "zsh", "dash", "ksh", "mksh", "fish", "csh", "tcsh", "ash", "busybox", "eval",
    "exec", "source", ".", "osascript", "powershell", "pwsh", "cmd",
    // Process, service and system control
    "kill", "killall", "pkill", "systemctl", "service", "launchctl", "shutdown", "reboot",
    "halt", "poweroff", "init", "telinit", "crontab", "at", "insmod", "rmmod", "modprobe",
    "sysctl",
    // Account management
    "useradd", "userdel", "usermod", "groupadd", "groupdel", "passwd", "chpasswd",
];

/// Command families refused by name prefix (`mkfs.ext4`).
pub(crate) const DENIED_COMMAND_PREFIXES: &[&str] = &["mkfs.", "mkfs_", "fsck."];

// ============================================================================
// Tier 3: denied command + argument combinations
// ============================================================================

/// Global git options that take a value before the sub-command.
const GIT_GLOBAL_VALUE_FLAGS: &[&str] = &["-C", "-c", "--git-dir", "--work-tree", "--namespace"];

pub(crate) const DENIED_ARGUMENTS: &[CommandArgumentRules] = &[
    CommandArgumentRules {
        commands: &["git"],
        rules: &[
            rule(&[Exact("push"), Exact("--force")], "force push"),
            rule(&[Exact("push"), Prefix("--force-with-lease")], "force push"),
            rule(&[Exact("push"), ShortFlag('f')], "force push"),
            rule(&[Exact("push"), Exact("--mirror")], "mirror push"),
            rule(&[Exact("push"), Exact("--delete")], "remote branch deletion"),
            rule(&[Exact("push"), ShortFlag('d')], "remote branch deletion"),
            rule(&[Exact("reset"), Exact("--hard")], "hard reset"),
            rule(&[Exact("clean"), ShortFlag('f')], "forced clean"),
            rule(&[Exact("clean"), Exact("--force")], "forced clean"),
            rule(&[Exact("checkout"), Exact("--force")], "forced checkout"),
            rule(&[Exact("branch"), ShortFlag('D')], "forced branch deletion"),
            rule(&[Exact("filter-branch")], "history rewrite"),
            rule(&[Exact("filter-repo")], "history rewrite"),
            rule(&[Exact("stash"), Exact("clear")], "stash removal"),
            rule(&[Exact("stash"), Exact("drop")], "stash removal"),
            rule(&[Exact("reflog"), Exact("expire")], "reflog expiry"),
            rule(&[Exact("update-ref"), ShortFlag('d')], "ref deletion"),
            rule(&[Leading("-c", GIT_GLOBAL_VALUE_FLAGS)], "config override"),
        ],
    },
    CommandArgumentRules {
        commands: &["npm", "pnpm", "bun"],
        rules: &[
            rule(&[Exact("publish")], "package publish"),
            rule(&[Exact("unpublish")], "package unpublish"),
            rule(&[Exact("deprecate")], "package deprecation"),
            rule(&[Exact("uninstall"), Exact("-g")], "global uninstall"),
            rule(&[Exact("uninstall"), Exact("--global")], "global uninstall"),
            rule(&[Exact("remove"), Exact("-g")], "global uninstall"),
            rule(&[Exact("rm"), Exact("-g")], "global uninstall"),
            rule(&[Exact("install"), Exact("-g")], "global install"),
            rule(&[Exact("install"), Exact("--global")], "global install"),
            rule(&[Exact("i"), Exact("-g")], "global install"),
            rule(&[Exact("add"), Exact("-g")], "global install"),
        ],
    },
    CommandArgumentRules {
        commands: &["yarn"],
        rules: &[
            rule(&[Exact("publish")], "package publish"),
            rule(&[Exact("global"), Exact("add")], "global install"),
            rule(&[Exact("global"), Exact("remove")], "global uninstall"),
        ],
    },
    CommandArgumentRules {
        commands: &["pip", "pip3", "pipx"],
        rules: &[
            rule(&[Exact("uninstall"), ShortFlag('y')], "unattended uninstall"),
            rule(&[Exact("uninstall"), Exact("--yes")], "unattended uninstall"),
            rule(&[Exact("--break-system-packages")], "system package override"),
        ],
    },
    CommandArgumentRules {
        commands: &["cargo"],
        rules: &[
            rule(&[Exact("publish")], "crate publish"),
            rule(&[Exact("yank")], "crate yank"),
            rule(&[Exact("owner")], "crate ownership change"),
        ],
    },
    CommandArgumentRules {
        commands: &["gem"],
        rules: &[
            rule(&[Exact("push")], "gem publish"),
            rule(&[Exact("uninstall")], "gem removal"),
        ],
    },
    CommandArgumentRules {
        commands: &["brew"],
        rules: &[
            rule(&[Exact("uninstall")], "package removal"),
            rule(&[Exact("remove")], "package removal"),
            rule(&[Exact("untap")], "tap removal"),
        ],
    },
    CommandArgumentRules {
        commands: &["apt", "apt-get", "yum", "dnf", "zypper", "apk"],
        rules: &[
            rule(&[Exact("remove")], "package removal"),
            rule(&[Exact("purge")], "package removal"),
            rule(&[Exact("autoremove")], "package removal"),
            rule(&[Exact("erase")], "package removal"),
            rule(&[Exact("del")], "package removal"),
        ],
    },
    CommandArgumentRules {
        commands: &["pacman"],
        rules: &[rule(&[ShortFlag('R')], "package removal")],
    },
    CommandArgumentRules {
        commands: &["rm"],
        rules: &[
            rule(&[ShortFlag('r')], "recursive delete"),
            rule(&[ShortFlag('R')], "recursive delete"),
            rule(&[Exact("--recursive")], "recursive delete"),
            rule(&[Exact("--no-preserve-root")], "root deletion"),
        ],
    },
    CommandArgumentRules {
        commands: &["chmod"],
        rules: &[
            rule(&[ShortFlag('R')], "recursive permission change"),
            rule(&[Exact("--recursive")], "recursive permission change"),
            rule(&[Exact("777")], "world-writable permissions"),
            rule(&[Exact("666")], "world-writable permissions"),
            rule(&[Exact("a+w")], "world-writable permissions"),
            rule(&[Exact("o+w")], "world-writable permissions"),
            rule(&[Exact("+s")], "setuid bit"),
            rule(&[Exact("u+s")], "setuid bit"),
            rule(&[Exact("g+s")], "setgid bit"),
        ],
    },
    CommandArgumentRules {
        commands: &["chown", "chgrp"],
        rules: &[
            rule(&[ShortFlag('R')], "recursive ownership change"),
            rule(&[Exact("--recursive")], "recursive ownership change"),
        ],
    },
    CommandArgumentRules {
        commands: &["find"],
        rules: &[
            rule(&[Exact("-delete")], "find deletion"),
            rule(&[Exact("-exec")], "find command execution"),
            rule(&[Exact("-execdir")], "find command execution"),
            rule(&[Exact("-ok")], "find command execution"),
            rule(&[Exact("-okdir")], "find command execution"),
        ],
    },
    CommandArgumentRules {
        commands: &["python", "python2", "python3", "pypy", "pypy3"],
        rules: &[rule(&[ShortFlag('c')], "inline code execution")],
    },
    CommandArgumentRules {
        commands: &["node", "nodejs", "deno", "bun"],
        rules: &[
            rule(&[Exact("-e")], "inline code execution"),
            rule(&[Exact("--eval")], "inline code execution"),
            rule(&[Exact("-p")], "inline code execution"),
            rule(&[Exact("--print")], "inline code execution"),
            rule(&[Exact("eval")], "inline code execution"),
        ],
    },
    CommandArgumentRules {
        commands: &["perl"],
        rules: &[
            rule(&[ShortFlag('e')], "inline code execution"),
            rule(&[ShortFlag('E')], "inline code execution"),
        ],
    },
    CommandArgumentRules {
        commands: &["ruby", "lua", "luajit"],
        rules: &[rule(&[Exact("-e")], "inline code execution")],
    },
    CommandArgumentRules {
        commands: &["php"],
        rules: &[rule(&[Exact("-r")], "inline code execution")],
    },
    CommandArgumentRules {
        commands: &["curl"],
        rules: &[
            rule(&[Exact("-T")], "file upload"),
            rule(&[Exact("--upload-file")], "file upload"),
            rule(&[Exact("-F")], "form upload"),
            rule(&[Exact("--form")], "form upload"),
            rule(&[Exact("-d"), Prefix("@")], "file upload"),
            rule(&[Exact("--data"), Prefix("@")], "file upload"),
            rule(&[Exact("--data-binary"), Prefix("@")], "file upload"),
        ],
    },
    CommandArgumentRules {
        commands: &["wget"],
        rules: &[rule(&[Prefix("--post-file")], "file upload")],
    },
    CommandArgumentRules {
        commands: &["tar"],
        rules: &[
            rule(&[Prefix("--checkpoint-action")], "command execution"),
            rule(&[Prefix("--to-command")], "command execution"),
            rule(&[Prefix("--use-compress-program")], "command execution"),
        ],
    },
    CommandArgumentRules {
        commands: &["rsync"],
        rules: &[
            rule(&[Prefix("--delete")], "destination deletion"),
            rule(&[Exact("-e")], "remote shell override"),
            rule(&[Prefix("--rsh")], "remote shell override"),
        ],
    },
    CommandArgumentRules {
        commands: &["docker", "podman"],
        rules: &[
            rule(&[Exact("--privileged")], "privileged container"),
            rule(&[Prefix("--pid=host")], "host namespace"),
            rule(&[Prefix("--cap-add")], "added capabilities"),
            rule(&[Exact("system"), Exact("prune")], "data pruning"),
            rule(&[Exact("volume"), Exact("prune")], "data pruning"),
            rule(&[Exact("volume"), Exact("rm")], "volume removal"),
        ],
    },
    CommandArgumentRules {
        commands: &["kubectl"],
        rules: &[
            rule(&[Exact("delete")], "resource deletion"),
            rule(&[Exact("drain")], "node drain"),
            rule(&[Exact("replace"), Exact("--force")], "forced replacement"),
        ],
    },
    CommandArgumentRules {
        commands: &["helm"],
        rules: &[
            rule(&[Exact("uninstall")], "release removal"),
            rule(&[Exact("delete")], "release removal"),
        ],
    },
    CommandArgumentRules {
        commands: &["terraform", "tofu"],
        rules: &[
            rule(&[Exact("destroy")], "infrastructure destruction"),
            rule(&[Exact("apply"), Prefix("-auto-approve")], "unattended apply"),
            rule(&[Exact("state"), Exact("rm")], "state removal"),
        ],
    },
    CommandArgumentRules {
        commands: &["aws"],
        rules: &[
            rule(&[Exact("s3"), Exact("rm")], "object deletion"),
            rule(&[Exact("s3"), Exact("rb")], "bucket deletion"),
            rule(&[Prefix("delete-")], "resource deletion"),
            rule(&[Prefix("terminate-")], "resource termination"),
        ],
    },
    CommandArgumentRules {
        commands: &["gcloud", "az"],
        rules: &[rule(&[Exact("delete")], "resource deletion")],
    },
    CommandArgumentRules {
        commands: &["truncate"],
        rules: &[
            rule(&[Exact("-s"), Exact("0")], "file truncation"),
            rule(&[Exact("--size=0")], "file truncation"),
        ],
    },
];

/// Environment variables that inject code into whatever the command runs.
pub(crate) const DENIED_ENV_VARS: &[&str] = &[
    "PATH",
    "BASH_ENV",
    "ENV",
    "PROMPT_COMMAND",
    "SHELLOPTS",
    "IFS",
    "GIT_EXTERNAL_DIFF",
    "GIT_SSH",
    "GIT_SSH_COMMAND",
    "GIT_PAGER",
    "GIT_EDITOR",
    "GIT_ASKPASS",
    "GIT_EXEC_PATH",
    "GIT_DIR",
    "GIT_WORK_TREE",
    "PAGER",
    "MANPAGER",
    "EDITOR",
    "VISUAL",
    "PERL5OPT",
    "PERL5LIB",
    "PYTHONSTARTUP",
    "PYTHONPATH",
    "NODE_OPTIONS",
    "RUBYOPT",
    "RUSTC_WRAPPER",
];

/// Builtins whose `NAME=value` arguments set shell variables.
pub(crate) const DECLARATION_COMMANDS: &[&str] =
    &["export", "declare", "typeset", "local", "readonly"];

/// Variable name prefixes with the same effect (`LD_PRELOAD`, `GIT_CONFIG_COUNT`).
pub(crate) const DENIED_ENV_PREFIXES: &[&str] = &["LD_", "DYLD_", "GIT_CONFIG_"];

// ============================================================================
// Tier 4: sensitive locations
// ============================================================================

/// Locations whose contents must not be read or written.
pub(crate) const SENSITIVE_PATHS: &[&str] = &[
    // System configuration, devices, package and system directories
    "/", "/etc", "/dev", "/proc", "/sys", "/boot", "/root", "/var", "/usr", "/bin", "/sbin",
    "/lib", "/lib32", "/lib64", "/opt", "/srv", "/snap",
    // macOS
    "/System", "/Library", "/private/etc", "/private/var", "~/Library/Keychains",
    // Credential stores
    "~/.ssh", "~/.gnupg", "~/.aws", "~/.azure", "~/.kube", "~/.docker", "~/.config/gcloud",
    "~/.config/gh", "~/.netrc", "~/.npmrc", "~/.pypirc", "~/.git-credentials",
    "~/.cargo/credentials", "~/.cargo/credentials.toml",
    // Shell startup files and history
    "~/.bashrc", "~/.bash_profile", "~/.profile", "~/.zshrc", "~/.zprofile", "~/.bash_history",
    "~/.zsh_history",
    // Windows
    "C:/Windows", "C:/Program Files", "C:/Program Files (x86)", "C:/ProgramData",
];

/// File names that hold credentials wherever they live.
pub(crate) const SENSITIVE_FILE_NAMES: &[&str] = &[
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    ".netrc",
    ".git-credentials",
    ".pgpass",
    ".htpasswd",
];

/// Output redirection targets that never count as sensitive.
pub(crate) const HARMLESS_SINKS: &[&str] = &["/dev/null", "/dev/stdout", "/dev/stderr", "/dev/tty"];

/// Prefix of per-descriptor device paths (`/dev/fd/2`).
pub(crate) const HARMLESS_SINK_PREFIX: &str = "/dev/fd/";

// ============================================================================
// Tier 6: known-safe commands
// ============================================================================

/// A read-only command, optionally limited to some sub-commands or flags.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SafeCommand {
    pub name: &'static str,
    /// Allowed sub-commands; empty allows any.
    pub subcommands: &'static [&'static str],
    /// Options taking a value that may precede the sub-command.
    pub value_flags: &'static [&'static str],
    /// Arguments that make the command write.
    pub forbidden: &'static [ArgPattern],
    /// At least one of these must be present; empty requires nothing.
    pub required: &'static [ArgPattern],
    /// Whole-argument check for commands whose scripts can write or execute.
    pub validator: Option<fn(&[String]) -> bool>,
}

const fn safe(name: &'static str) -> SafeCommand {
    SafeCommand {
        name,
        subcommands: &[],
        value_flags: &[],
        forbidden: &[],
        required: &[],
        validator: None,
    }
}

/// `sed -n 10p` / `sed -n 1,20p file`: quiet mode with a line-range print
/// script. Any other script may carry `w` or `e` commands.
fn is_print_only_sed(args: &[String]) -> bool {
    let mut quiet = false;
    let mut script = None;
    for arg in args {
        match arg.as_str() {
            "-n" | "--quiet" | "--silent" => quiet = true,
            "-E" | "-r" | "--regexp-extended" => {}
            flag if flag.starts_with('-') => return false,
            operand if script.is_none() => script = Some(operand),
            _ => {}
        }
    }
    quiet && script.is_some_and(is_line_range_print)
}

fn is_line_range_print(script: &str) -> bool {
    let Some(range) = script.strip_suffix('p') else {
        return false;
    };
    let is_number = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match range.split_once(',') {
        Some((start, end)) => is_number(start) && is_number(end),
        None => is_number(range),
    }
}

const fn safe_without(name: &'static str, forbidden: &'static [ArgPattern]) -> SafeCommand {
    SafeCommand {
        forbidden,
        ..safe(name)
    }
}

const fn safe_with(name: &'static str, required: &'static [ArgPattern]) -> SafeCommand {
    SafeCommand {
        required,
        ..safe(name)
    }
}

const fn safe_subcommands(name: &'static str, subcommands: &'static [&'static str]) -> SafeCommand {
    SafeCommand {
        subcommands,
        ..safe(name)
    }
}

pub(crate) const SAFE_COMMANDS: &[SafeCommand] = &[
    // Listing and inspection
    safe("ls"),
    safe("dir"),
    safe("tree"),
    safe("exa"),
    safe("eza"),
    safe("pwd"),
    safe("stat"),
    safe("file"),
    safe("du"),
    safe("df"),
    safe("wc"),
    safe("which"),
    safe("whereis"),
    safe("type"),
    safe("whoami"),
    safe("id"),
    safe("groups"),
    safe("hostname"),
    safe("uname"),
    safe("date"),
    safe("cal"),
    safe("uptime"),
    safe("basename"),
    safe("dirname"),
    safe("realpath"),
    safe("readlink"),
    safe("true"),
    safe("false"),
    safe("test"),
    safe("echo"),
    safe("printf"),
    // Reading
    safe("cat"),
    safe("bat"),
    safe("head"),
    safe("tail"),
    safe("less"),
    safe("more"),
    safe("nl"),
    safe("xxd"),
    safe("od"),
    safe("hexdump"),
    safe("strings"),
    safe("md5sum"),
    safe("sha1sum"),
    safe("sha256sum"),
    safe("shasum"),
    safe("cksum"),
    // Searching and text processing
    safe("grep"),
    safe("egrep"),
    safe("fgrep"),
    safe_without(
        "rg",
        &[
            Prefix("--pre"),
            Prefix("--hostname-bin"),
            Exact("--search-zip"),
            ShortFlag('z'),
        ],
    ),
    safe("ag"),
    safe("ack"),
    safe("diff"),
    safe("cmp"),
    safe("comm"),
    safe("cut"),
    safe("tr"),
    safe("uniq"),
    safe("fold"),
    safe("column"),
    safe("rev"),
    safe("paste"),
    safe("jq"),
    safe_without("sort", &[Prefix("-o"), Prefix("--output")]),
    SafeCommand {
        validator: Some(is_print_only_sed),
        ..safe("sed")
    },
    safe_without(
        "find",
        &[
            Exact("-delete"),
            Exact("-exec"),
            Exact("-execdir"),
            Exact("-ok"),
            Exact("-okdir"),
            Prefix("-fprint"),
            Exact("-fls"),
        ],
    ),
    // Version control, read-only sub-commands
    SafeCommand {
        name: "git",
        subcommands: &[
            "status",
            "log",
            "diff",
            "show",
            "blame",
            "rev-parse",
            "ls-files",
            "ls-tree",
            "describe",
            "shortlog",
            "grep",
            "cat-file",
            "version",
            "--version",
        ],
        value_flags: &["-C", "--git-dir", "--work-tree", "--namespace"],
        forbidden: &[
            Prefix("--output"),
            Exact("--ext-diff"),
            Prefix("--open-files-in-pager"),
            Prefix("-O"),
        ],
        required: &[],
        validator: None,
    },
    // Package managers, query sub-commands
    safe_subcommands("npm", &["ls", "list", "outdated", "view", "--version"]),
    safe_subcommands("pip", &["list", "show", "freeze", "--version"]),
    safe_subcommands("pip3", &["list", "show", "freeze", "--version"]),
    safe_subcommands("cargo", &["tree", "metadata", "version", "--version"]),
    SafeCommand {
        required: &[Exact("--check")],
        ..safe_subcommands("cargo", &["fmt"])
    },
    // Formatters and linters in check mode
    safe_with("rustfmt", &[Exact("--check")]),
    safe_with("black", &[Exact("--check"), Exact("--diff")]),
    safe_with(
        "prettier",
        &[Exact("--check"), Exact("-c"), Exact("--list-different"), Exact("-l")],
    ),
    safe_without("gofmt", &[ShortFlag('w')]),
    safe_without("eslint", &[Prefix("--fix")]),
    SafeCommand {
        forbidden: &[Prefix("--fix")],
        ..safe_subcommands("ruff", &["check"])
    },
    SafeCommand {
        required: &[Exact("--check"), Exact("--diff")],
        ..safe_subcommands("ruff", &["format"])
    },
];

// ============================================================================
// Wrappers
// ============================================================================

/// A command that runs another command given in its arguments.
#[derive(Debug)]
pub(crate) struct Wrapper {
    pub name: &'static str,
    /// Options that consume the following argument.
    pub value_flags: &'static [&'static str],
    /// Positional parameters before the wrapped command (`timeout 30`).
    pub positional: usize,
    /// Leading `NAME=value` arguments are environment settings.
    pub assignments: bool,
}

const fn wrapper(name: &'static str, value_flags: &'static [&'static str]) -> Wrapper {
    Wrapper {
        name,
        value_flags,
        positional: 0,
        assignments: false,
    }
}

pub(crate) const WRAPPERS: &[Wrapper] = &[
    wrapper("time", &[]),
    wrapper("nohup", &[]),
    wrapper("command", &[]),
    wrapper("builtin", &[]),
    wrapper("nice", &["-n", "--adjustment"]),
    wrapper(
        "stdbuf",
        &["-i", "-o", "-e", "--input", "--output", "--error"],
    ),
    Wrapper {
        positional: 1,
        ..wrapper("timeout", &["-s", "--signal", "-k", "--kill-after"])
    },
    Wrapper {
        assignments: true,
        ..wrapper("env", &["-u", "--unset", "-C", "--chdir", "-S", "--split-string"])
    },
    wrapper(
        "xargs",
        &[
            "-n", "-L", "-P", "-s", "-d", "-E", "-I", "-a", "--max-args", "--max-lines",
            "--max-procs", "--max-chars", "--delimiter", "--eof", "--replace", "--arg-file",
        ],
    ),
];

/// Deepest chain of wrappers peeled off one invocation.
pub(crate) const MAX_WRAPPER_DEPTH: usize = 8;

pub(crate) fn find_wrapper(name: &str) -> Option<&'static Wrapper> {
    WRAPPERS.iter().find(|w| w.name == name)
}
