//! Active tool and the temperatures requested so far

use crate::core::error::Result;
use crate::facts::Facts;
use crate::gcode::{Command, CommandKind};

use super::Pass;

/// Parameter letter carrying a heater target temperature
pub const TEMP_LETTER: char = 'S';

pub struct ToolingPass;

impl Pass for ToolingPass {
    fn name(&self) -> &'static str {
        "tooling"
    }

    fn apply(&self, command: &mut Command, prev: &Facts) -> Result<()> {
        let mut active = prev.active_tool();
        let mut requested = prev.requested_temp.known().cloned().unwrap_or_default();

        match command.kind() {
            CommandKind::ToolSelect => active = Some(command.tool()?),
            CommandKind::HeaterSet => {
                requested.insert(command.tool()?, command.require(TEMP_LETTER)?);
            }
            _ => {}
        }

        command.facts.active_tool.set(active);
        command.facts.requested_temp.set(requested);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::Sequence;
    use crate::passes::propagate;

    #[test]
    fn test_active_tool_follows_tool_changes() {
        let mut seq = Sequence::parse("G28\nT0\nG1 X1\nT3\nbogus line\n");
        propagate(&mut seq.commands, &ToolingPass).unwrap();
        let active: Vec<_> = seq.iter().map(|c| c.facts.active_tool()).collect();
        assert_eq!(active, vec![None, Some(0), Some(0), Some(3), Some(3)]);
    }

    #[test]
    fn test_latest_request_wins() {
        let mut seq = Sequence::parse("M104 T1 S200\nM109 T1 S215\nM104 T0 S190\n");
        propagate(&mut seq.commands, &ToolingPass).unwrap();
        let last = seq.commands[2].facts.requested_temp.known().unwrap();
        assert_eq!(last.get(&1), Some(&215.0));
        assert_eq!(last.get(&0), Some(&190.0));
    }

    #[test]
    fn test_heater_set_without_temperature_fails() {
        let mut seq = Sequence::parse("M104 T1\n");
        assert!(propagate(&mut seq.commands, &ToolingPass).is_err());
    }
}
