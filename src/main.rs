//! tool-wizard - rewrite a multi-tool G-code file in place with heater
//! preheat/idle commands and fan guards around tool changes.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tool_wizard::core::error::Result;
use tool_wizard::core::WizardConfig;
use tool_wizard::wizard::process_file;
use tracing_subscriber::EnvFilter;

/// Preheat and fan-guard post-processor for multi-tool G-code
#[derive(Parser, Debug)]
#[command(name = "tool-wizard")]
#[command(about = "Insert look-ahead heater and fan commands into a G-code file, in place")]
struct Args {
    /// G-code file to rewrite
    file: PathBuf,

    /// TOML file overriding preheat_horizon, idle_offset, annotation
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every command with its derived facts to stdout
    #[arg(long)]
    dump_facts: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so --dump-facts output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tool_wizard=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => WizardConfig::load(path)?,
        None => WizardConfig::default(),
    };

    let (sequence, _report) = process_file(&args.file, &config).map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    if args.dump_facts {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        sequence.debug_dump(&mut out)?;
        out.flush()?;
    }

    Ok(())
}
