//! When and how hot each tool is next needed
//!
//! Runs backward, so the facts handed in belong to the following command and
//! already describe everything after it. Each command copies them and then
//! records its own tool change or heater request on top.

use crate::core::error::Result;
use crate::facts::Facts;
use crate::gcode::{Command, CommandKind};

use super::tooling::TEMP_LETTER;
use super::{Direction, Pass};

pub struct SchedulePass;

impl Pass for SchedulePass {
    fn name(&self) -> &'static str {
        "schedule"
    }

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn apply(&self, command: &mut Command, next: &Facts) -> Result<()> {
        let mut needed = next.time_next_needed.known().cloned().unwrap_or_default();
        let mut temps = next.next_temp.known().cloned().unwrap_or_default();

        match command.kind() {
            CommandKind::ToolSelect => {
                debug_assert!(!command.facts.time.is_pending(), "timing must run first");
                needed.insert(command.tool()?, command.facts.time_or_zero());
            }
            CommandKind::HeaterSet => {
                temps.insert(command.tool()?, command.require(TEMP_LETTER)?);
            }
            _ => {}
        }

        command.facts.time_next_needed.set(needed);
        command.facts.next_temp.set(temps);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::Sequence;
    use crate::passes::{propagate, KinematicsPass, TimingPass};

    fn scheduled(text: &str) -> Sequence {
        let mut seq = Sequence::parse(text);
        propagate(&mut seq.commands, &KinematicsPass).unwrap();
        propagate(&mut seq.commands, &TimingPass).unwrap();
        propagate(&mut seq.commands, &SchedulePass).unwrap();
        seq
    }

    #[test]
    fn test_next_use_looks_forward() {
        let seq = scheduled(
            "G1 X0 Y0 F60\nT0\nG1 X10 Y0\nM104 T1 S200\nG1 X20 Y0\nT1\nG1 X30 Y0\nT0\n",
        );

        let first = seq.commands[0].facts.time_next_needed.known().unwrap();
        assert_eq!(first.get(&0), Some(&0.0));
        assert_eq!(first.get(&1), Some(&20.0));

        // After the first T0, the next T0 is the one at the end
        let after = seq.commands[2].facts.time_next_needed.known().unwrap();
        assert_eq!(after.get(&0), Some(&30.0));

        // Past the last T1 it is no longer needed
        let tail = seq.commands[6].facts.time_next_needed.known().unwrap();
        assert_eq!(tail.get(&1), None);
    }

    #[test]
    fn test_next_temp_is_the_closest_upcoming_request() {
        let seq = scheduled("M104 T1 S180\nG28\nM104 T1 S200\nG28\nM104 T1 S220\n");
        let temps: Vec<_> = seq
            .iter()
            .map(|c| c.facts.next_temp.known().unwrap().get(&1).copied())
            .collect();
        assert_eq!(
            temps,
            vec![Some(180.0), Some(200.0), Some(200.0), Some(220.0), Some(220.0)]
        );
    }
}
