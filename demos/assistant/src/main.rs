//! Function-calling demo.
//!
//! Prints the descriptors of the registered functions, then reads function
//! calls from stdin (one `{"name": .., "arguments": ".."}` object per line)
//! and answers each with one JSON line on stdout.

mod functions;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fncall::config;
use fncall::telemetry;
use fncall::tools::{DispatchOutcome, Dispatcher, FunctionCall, FunctionDescriptor};
use serde_json::{Value, json};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "assistant", about = "Serve function calls read from stdin")]
struct Cli {
    /// Settings file; defaults apply when it does not exist.
    #[arg(long, default_value = "fncall.toml")]
    config: PathBuf,

    /// Additionally allow this function (repeatable).
    #[arg(long = "allow", value_name = "NAME")]
    allow: Vec<String>,

    /// Print the function descriptors and exit.
    #[arg(long)]
    describe: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = config::load(&cli.config)?;
    settings.dispatch.allow.extend(cli.allow);
    settings.validate()?;
    telemetry::init(&settings.logging.filter)?;

    let registry = Arc::new(functions::registry().context("failed to register functions")?);
    let descriptors: Vec<Value> = registry
        .descriptors()
        .iter()
        .map(FunctionDescriptor::to_json)
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", serde_json::to_string_pretty(&descriptors)?)?;
    if cli.describe {
        return Ok(());
    }

    let dispatcher = Dispatcher::new(registry, settings.dispatch.allow_list()?);
    info!(
        allowed = dispatcher.allow_list().names().count(),
        "waiting for function calls"
    );

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<FunctionCall>(&line) {
            Ok(call) => respond(&dispatcher, &call),
            Err(err) => json!({ "error": format!("malformed function call: {err}") }),
        };
        writeln!(out, "{reply}")?;
        out.flush()?;
    }

    Ok(())
}

fn respond(dispatcher: &Dispatcher, call: &FunctionCall) -> Value {
    match dispatcher.dispatch(call) {
        Ok(DispatchOutcome::Completed(content)) => json!({ "name": call.name(), "content": content }),
        Ok(DispatchOutcome::Rejected { reason, .. }) => {
            json!({ "name": call.name(), "rejected": reason })
        }
        Err(err) => {
            error!(function = call.name(), error = %err, "function call failed");
            json!({ "name": call.name(), "error": err.to_string() })
        }
    }
}
