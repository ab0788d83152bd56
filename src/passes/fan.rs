//! Part-cooling fan speed, and fan guarding around tool changes

use crate::core::error::Result;
use crate::facts::Facts;
use crate::gcode::{Command, CommandKind};

use super::{gcode_number, Pass};

/// Fan off before a tool change, back to `restore` after it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanGuard {
    pub restore: f64,
}

impl FanGuard {
    pub fn before(&self) -> String {
        "M106 S0".to_string()
    }

    pub fn after(&self) -> String {
        format!("M106 S{}", gcode_number(self.restore))
    }
}

/// Fan decision for one command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanUpdate {
    pub speed: f64,
    pub guard: Option<FanGuard>,
}

pub struct FanPass;

impl FanPass {
    pub fn decide(command: &Command, prev: &Facts) -> Result<FanUpdate> {
        let previous = prev.fan_speed.known().copied().unwrap_or(0.0);
        let update = match command.kind() {
            CommandKind::FanSet => FanUpdate {
                speed: command.require('S')?,
                guard: None,
            },
            CommandKind::FanOff => FanUpdate {
                speed: 0.0,
                guard: None,
            },
            CommandKind::ToolSelect => FanUpdate {
                speed: previous,
                guard: Some(FanGuard { restore: previous }),
            },
            _ => FanUpdate {
                speed: previous,
                guard: None,
            },
        };
        Ok(update)
    }
}

impl Pass for FanPass {
    fn name(&self) -> &'static str {
        "fan"
    }

    fn apply(&self, command: &mut Command, prev: &Facts) -> Result<()> {
        let update = Self::decide(command, prev)?;
        if let Some(guard) = update.guard {
            command.pre.push(guard.before());
            command.post.push(guard.after());
        }
        command.facts.fan_speed.set(update.speed);
        Ok(())
    }
}
