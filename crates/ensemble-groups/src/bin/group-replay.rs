//! Replay a scripted group edit session and print what happened
//!
//! ```text
//! group-replay scenario.json --pretty --log-level debug
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ensemble_groups::{Scenario, replay};
use ensemble_logging::{EnsembleSubscriberBuilder, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "group-replay", about = "Replay a group edit scenario")]
struct Args {
    /// Scenario file (JSON)
    scenario: PathBuf,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Human-readable logs instead of JSONL
    #[arg(long)]
    pretty: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    indent: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = if args.pretty {
        LogConfig::development()
    } else {
        LogConfig::replay()
    };
    let _guard = EnsembleSubscriberBuilder::new()
        .with_config(config)
        .with_level(args.log_level)
        .init();

    let scenario = match Scenario::load(&args.scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let report = match replay(scenario).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let rendered = if args.indent {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
