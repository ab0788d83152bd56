//! End-to-end processing of a G-code buffer or file

use std::path::Path;

use crate::core::config::WizardConfig;
use crate::core::error::Result;
use crate::gcode::Sequence;
use crate::passes::{run_pipeline, PipelineReport};

/// Run the pipeline on `text` and return the rewritten G-code
pub fn process_str(text: &str, config: &WizardConfig) -> Result<String> {
    let mut sequence = Sequence::parse(text);
    run_pipeline(&mut sequence, config)?;
    Ok(sequence.render(&config.annotation))
}

/// Rewrite the file at `path` in place
///
/// Nothing is written unless every pass succeeds. The processed sequence is
/// returned so callers can inspect or dump its facts.
pub fn process_file(path: &Path, config: &WizardConfig) -> Result<(Sequence, PipelineReport)> {
    let mut sequence = Sequence::load(path)?;
    let report = run_pipeline(&mut sequence, config)?;
    sequence.write_in_place(path, &config.annotation)?;
    tracing::info!(
        ?path,
        commands = report.commands,
        tool_changes = report.tool_changes,
        inserted = report.inserted,
        estimated_seconds = report.estimated_seconds,
        "Processed G-code"
    );
    Ok((sequence, report))
}
