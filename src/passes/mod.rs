//! Propagation passes
//!
//! Each pass sweeps the whole sequence once, forward or backward, and writes
//! its own facts onto every command. A pass sees only the current command and
//! the facts of the command visited just before it: the predecessor on a
//! forward sweep, the successor on a backward one.
//!
//! kinematics -> timing -> tooling -> schedule (backward) -> preheat -> fan

pub mod fan;
pub mod kinematics;
pub mod preheat;
pub mod schedule;
pub mod timing;
pub mod tooling;

pub use fan::FanPass;
pub use kinematics::KinematicsPass;
pub use preheat::{HeaterAction, HeaterPlan, PreheatPass};
pub use schedule::SchedulePass;
pub use timing::TimingPass;
pub use tooling::ToolingPass;

use crate::core::config::WizardConfig;
use crate::core::error::Result;
use crate::facts::Facts;
use crate::gcode::{Command, CommandKind, Sequence};

/// Sweep direction of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Indices of a `len`-long sequence in visiting order
    pub fn visit_order(self, len: usize) -> Box<dyn Iterator<Item = usize>> {
        match self {
            Direction::Forward => Box::new(0..len),
            Direction::Backward => Box::new((0..len).rev()),
        }
    }
}

/// One sweep over the sequence
pub trait Pass {
    fn name(&self) -> &'static str;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    /// Derive this pass's facts for `command` from `prev`, the facts of the
    /// last visited command (all pending for the first one)
    fn apply(&self, command: &mut Command, prev: &Facts) -> Result<()>;
}

/// Borrow the current command mutably and the last visited one's facts
fn split_visit(
    commands: &mut [Command],
    current: usize,
    previous: Option<usize>,
) -> (&mut Command, Option<&Facts>) {
    match previous {
        None => (&mut commands[current], None),
        Some(prev) if prev < current => {
            let (head, tail) = commands.split_at_mut(current);
            (&mut tail[0], Some(&head[prev].facts))
        }
        Some(prev) => {
            let (head, tail) = commands.split_at_mut(prev);
            (&mut head[current], Some(&tail[0].facts))
        }
    }
}

/// Run `pass` over every command exactly once in its direction
///
/// Facts are write-once, so callers outside [`run_pipeline`] must start from
/// a freshly reset sequence.
pub(crate) fn propagate<P: Pass + ?Sized>(commands: &mut [Command], pass: &P) -> Result<()> {
    let empty = Facts::new();
    let mut previous = None;

    for current in pass.direction().visit_order(commands.len()) {
        let (command, prev) = split_visit(commands, current, previous);
        pass.apply(command, prev.unwrap_or(&empty))?;
        previous = Some(current);
    }

    Ok(())
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub commands: usize,
    pub passthrough: usize,
    pub tool_changes: usize,
    pub inserted: usize,
    /// Estimated time at the last command, in seconds
    pub estimated_seconds: f64,
}

/// Derive all facts and insertions for `sequence` from scratch
pub fn run_pipeline(sequence: &mut Sequence, config: &WizardConfig) -> Result<PipelineReport> {
    sequence.reset();

    let preheat = PreheatPass::new(config);
    let passes: [&dyn Pass; 6] = [
        &KinematicsPass,
        &TimingPass,
        &ToolingPass,
        &SchedulePass,
        &preheat,
        &FanPass,
    ];

    for pass in passes {
        propagate(&mut sequence.commands, pass)?;
        tracing::debug!(pass = pass.name(), direction = ?pass.direction(), "Pass complete");
    }

    let report = PipelineReport {
        commands: sequence.len(),
        passthrough: sequence
            .iter()
            .filter(|c| c.kind() == CommandKind::Passthrough)
            .count(),
        tool_changes: sequence
            .iter()
            .filter(|c| c.kind() == CommandKind::ToolSelect)
            .count(),
        inserted: sequence.inserted_count(),
        estimated_seconds: sequence
            .commands
            .last()
            .map_or(0.0, |c| c.facts.time_or_zero()),
    };
    Ok(report)
}

/// Number as written into synthesized G-code (`200`, `127.5`)
pub(crate) fn gcode_number(value: f64) -> String {
    // Avoid printing "-0"
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records the order it was visited in and what it saw as previous
    struct Recorder {
        direction: Direction,
        seen: RefCell<Vec<(usize, Option<f64>)>>,
    }

    impl Pass for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn direction(&self) -> Direction {
            self.direction
        }

        fn apply(&self, command: &mut Command, prev: &Facts) -> Result<()> {
            self.seen
                .borrow_mut()
                .push((command.line, prev.time.known().copied()));
            command.facts.time.set(command.line as f64);
            Ok(())
        }
    }

    #[test]
    fn test_forward_sees_predecessor() {
        let mut seq = Sequence::parse("G28\nT0\nT1\n");
        let pass = Recorder {
            direction: Direction::Forward,
            seen: RefCell::new(Vec::new()),
        };
        propagate(&mut seq.commands, &pass).unwrap();
        assert_eq!(
            *pass.seen.borrow(),
            vec![(1, None), (2, Some(1.0)), (3, Some(2.0))]
        );
    }

    #[test]
    fn test_backward_sees_successor() {
        let mut seq = Sequence::parse("G28\nT0\nT1\n");
        let pass = Recorder {
            direction: Direction::Backward,
            seen: RefCell::new(Vec::new()),
        };
        propagate(&mut seq.commands, &pass).unwrap();
        assert_eq!(
            *pass.seen.borrow(),
            vec![(3, None), (2, Some(3.0)), (1, Some(2.0))]
        );
    }

    #[test]
    fn test_empty_sequence_is_fine() {
        let mut seq = Sequence::parse("");
        let report = run_pipeline(&mut seq, &WizardConfig::default()).unwrap();
        assert_eq!(report, PipelineReport::default());
    }

    #[test]
    fn test_pipeline_rerun_on_same_sequence() {
        let mut seq = Sequence::parse("G1 X0 Y0 F60\nT0\nM104 T1 S200\nG1 X5 Y0\nT1\n");
        let config = WizardConfig::default();
        let first = run_pipeline(&mut seq, &config).unwrap();
        let output = seq.render(&config.annotation);

        let second = run_pipeline(&mut seq, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(seq.render(&config.annotation), output);
    }

    #[test]
    fn test_gcode_number_formatting() {
        assert_eq!(gcode_number(200.0), "200");
        assert_eq!(gcode_number(127.5), "127.5");
        assert_eq!(gcode_number(-0.0), "0");
    }

    #[test]
    fn test_pass_failure_stops_pipeline() {
        let mut seq = Sequence::parse("T0\nM104 S200\n");
        let err = run_pipeline(&mut seq, &WizardConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }
}
