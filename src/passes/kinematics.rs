//! XY position and feed rate, carried forward through non-motion lines

use crate::core::error::Result;
use crate::facts::{Fact, Facts};
use crate::gcode::{Command, CommandKind};

use super::Pass;

pub struct KinematicsPass;

impl KinematicsPass {
    fn carry(command: &Command, letter: char, previous: &Fact<Option<f64>>) -> Option<f64> {
        if command.kind() == CommandKind::Motion {
            if let Some(value) = command.param(letter) {
                return Some(value);
            }
        }
        previous.value().copied()
    }
}

impl Pass for KinematicsPass {
    fn name(&self) -> &'static str {
        "kinematics"
    }

    fn apply(&self, command: &mut Command, prev: &Facts) -> Result<()> {
        let x = Self::carry(command, 'X', &prev.x);
        let y = Self::carry(command, 'Y', &prev.y);
        let feed = Self::carry(command, 'F', &prev.feed);

        command.facts.x.set(x);
        command.facts.y.set(y);
        command.facts.feed.set(feed);
        Ok(())
    }
}
