//! Shellgate - classify shell command lines before an agent runs them.
//!
//! Exit status mirrors the verdict: 0 safe, 1 ambiguous, 2 risky, 3 error.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use shellgate_safety::{CommandLineVerdict, CommandSafetyEngine, PolicyConfig, SafetyCategory};

const EXIT_ERROR: u8 = 3;

/// Shellgate command-safety classifier
#[derive(Parser)]
#[command(name = "shellgate")]
#[command(about = "Classify shell command lines as SAFE, AMBIGUOUS or RISKY")]
#[command(version)]
struct Cli {
    /// Policy file (TOML)
    #[arg(short, long, global = true, env = "SHELLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a command line, or each line of stdin with `-`
    Classify {
        /// Print the full verdict as JSON
        #[arg(long)]
        json: bool,

        /// Command line words, joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Show every invocation with the rule that decided it
    Explain {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Print the effective policy as TOML
    Config,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn load_engine(path: Option<&Path>) -> Result<CommandSafetyEngine> {
    let Some(path) = path else {
        return Ok(CommandSafetyEngine::new());
    };
    let config = PolicyConfig::from_file(path)
        .with_context(|| format!("failed to load policy from {}", path.display()))?;
    debug!(path = %path.display(), "loaded policy");
    CommandSafetyEngine::with_config(config).context("invalid policy")
}

fn exit_code(category: SafetyCategory) -> ExitCode {
    match category {
        SafetyCategory::Safe => ExitCode::SUCCESS,
        SafetyCategory::Ambiguous => ExitCode::from(1),
        SafetyCategory::Risky => ExitCode::from(2),
    }
}

fn is_stdin(words: &[String]) -> bool {
    matches!(words, [only] if only == "-")
}

fn print_verdict(verdict: &CommandLineVerdict, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(verdict)?);
    } else if verdict.category == SafetyCategory::Safe {
        println!("{}", verdict.category);
    } else {
        println!("{}: {}", verdict.category, verdict.reason);
    }
    Ok(())
}

fn classify(engine: &CommandSafetyEngine, words: &[String], json: bool) -> Result<SafetyCategory> {
    if !is_stdin(words) {
        let verdict = engine.evaluate(&words.join(" "));
        print_verdict(&verdict, json)?;
        return Ok(verdict.category);
    }

    let mut overall = SafetyCategory::Safe;
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let verdict = engine.evaluate(&line);
        print_verdict(&verdict, json)?;
        overall = overall.combine(verdict.category);
    }
    Ok(overall)
}

fn explain(engine: &CommandSafetyEngine, words: &[String]) -> SafetyCategory {
    let raw = words.join(" ");
    let verdict = engine.evaluate(&raw);
    println!("{}  {}", verdict.category, raw);

    if let Some(failure) = verdict.parse.failure() {
        println!("  not parsed: {failure}");
        return verdict.category;
    }

    for (invocation, outcome) in verdict.parse.invocations().iter().zip(&verdict.invocations) {
        println!(
            "  {:<9} tier {} {:<22} {}",
            outcome.category.to_string(),
            outcome.rule.tier(),
            outcome.rule.to_string(),
            invocation.raw_text
        );
        println!("            {}", outcome.reason);
    }
    verdict.category
}

fn run(cli: Cli) -> Result<ExitCode> {
    let engine = load_engine(cli.config.as_deref())?;

    match cli.command {
        Command::Classify { json, words } => Ok(exit_code(classify(&engine, &words, json)?)),
        Command::Explain { words } => Ok(exit_code(explain(&engine, &words))),
        Command::Config => {
            let rendered =
                toml::to_string(engine.config()).context("failed to render policy as TOML")?;
            print!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    setup_logging(&cli.log_level, cli.json_logs);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
