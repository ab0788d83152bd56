//! Rough print-time estimate
//!
//! Planar, constant-velocity: each XY move costs `distance / feed * 60`
//! seconds with feed in mm/min. No acceleration, no Z, no extrusion-only moves.

use crate::core::error::Result;
use crate::facts::Facts;
use crate::gcode::Command;

use super::Pass;

pub struct TimingPass;

impl TimingPass {
    /// Seconds spent moving from `prev` to `current`, if both ends are known
    pub fn move_seconds(prev: &Facts, current: &Facts) -> f64 {
        let (Some(px), Some(py)) = (prev.x.value(), prev.y.value()) else {
            return 0.0;
        };
        let (Some(x), Some(y), Some(feed)) =
            (current.x.value(), current.y.value(), current.feed.value())
        else {
            return 0.0;
        };

        let distance = (x - px).hypot(y - py);
        if distance > 0.0 && *feed > 0.0 {
            distance / feed * 60.0
        } else {
            0.0
        }
    }
}

impl Pass for TimingPass {
    fn name(&self) -> &'static str {
        "timing"
    }

    fn apply(&self, command: &mut Command, prev: &Facts) -> Result<()> {
        let time = prev.time_or_zero() + Self::move_seconds(prev, &command.facts);
        command.facts.time.set(time);
        Ok(())
    }
}
