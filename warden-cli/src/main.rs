//! Warden CLI - Inspect tool calls against the configured security policy

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use warden_core::config::WardenConfig;
use warden_core::context::ExecutionContext;
use warden_core::error::ErrorDetail;
use warden_core::protocol::{ToolCall, parse_tool_calls, parse_tool_calls_lenient};
use warden_core::security::SecurityPolicy;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden tool runtime CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check tool-call blocks in text against the security policy
    Scan {
        /// File to read (stdin when omitted)
        file: Option<PathBuf>,

        /// Fail on the first malformed block instead of skipping it
        #[arg(long, env = "WARDEN_SCAN_STRICT")]
        strict: bool,

        /// Print verdicts as JSON
        #[arg(long)]
        json: bool,

        /// Configuration file (default: warden.toml and WARDEN_* variables)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Version information
    Version,
}

/// Policy decision for one parsed call
struct Verdict {
    call: ToolCall,
    blocked: Option<warden_core::ToolError>,
}

impl Verdict {
    fn to_json(&self, index: usize) -> serde_json::Value {
        let mut value = serde_json::json!({
            "index": index,
            "name": self.call.name,
            "allowed": self.blocked.is_none(),
        });
        if let Some(reason) = &self.call.reason {
            value["reason"] = reason.clone().into();
        }
        if let Some(err) = &self.blocked {
            value["error"] = err.to_string().into();
            if let ErrorDetail::SecurityViolation {
                pattern, path, ..
            } = err.detail()
            {
                if let Some(pattern) = pattern {
                    value["pattern"] = pattern.clone().into();
                }
                if let Some(path) = path {
                    value["path"] = path.clone().into();
                }
            }
        }
        value
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("warden {}", env!("CARGO_PKG_VERSION"));
            println!("warden-core {}", warden_core::VERSION);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scan {
            file,
            strict,
            json,
            config,
        } => scan(file, strict, json, config).await,
    }
}

async fn scan(
    file: Option<PathBuf>,
    strict: bool,
    json: bool,
    config: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = match &config {
        Some(path) => WardenConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => WardenConfig::load().context("Failed to load configuration")?,
    };
    let policy = config.security.build_policy();

    let text = match &file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let calls = if strict {
        parse_tool_calls(&text)?
    } else {
        parse_tool_calls_lenient(&text)
    };
    tracing::debug!(calls = calls.len(), policies = policy.len(), "Scanning tool calls");

    let ctx = ExecutionContext::new();
    let mut verdicts = Vec::with_capacity(calls.len());
    for call in calls {
        let blocked = policy.validate(&ctx, &call.name, &call.args).await.err();
        verdicts.push(Verdict { call, blocked });
    }

    if json {
        let rendered: Vec<_> = verdicts
            .iter()
            .enumerate()
            .map(|(index, verdict)| verdict.to_json(index))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else if verdicts.is_empty() {
        println!("No tool calls found");
    } else {
        for verdict in &verdicts {
            match &verdict.blocked {
                None => println!("allowed  {}", verdict.call.name),
                Some(err) => println!("blocked  {}: {}", verdict.call.name, err),
            }
        }
    }

    let blocked = verdicts.iter().filter(|v| v.blocked.is_some()).count();
    Ok(if blocked > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}
