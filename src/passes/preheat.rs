//! Preheat scheduling
//!
//! Tracks which tools are hot and, looking at when each tool is next
//! selected, decides where to bring a heater up, drop it to idle, or switch
//! it off for good. The decision for one command is a [`HeaterPlan`]; turning
//! that into G-code is a separate, mechanical step.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::WizardConfig;
use crate::core::error::Result;
use crate::facts::{Facts, ToolId};
use crate::gcode::Command;

use super::{gcode_number, Pass};

/// A heater command to synthesize after the current line
#[derive(Debug, Clone, PartialEq)]
pub enum HeaterAction {
    /// Heat to the temperature the tool will be used at
    Preheat { tool: ToolId, temp: f64 },
    /// Hold below target until the tool comes back into the horizon
    Idle { tool: ToolId, temp: f64 },
    /// Not needed again in this file
    Off { tool: ToolId },
}

impl HeaterAction {
    pub fn tool(&self) -> ToolId {
        match *self {
            HeaterAction::Preheat { tool, .. }
            | HeaterAction::Idle { tool, .. }
            | HeaterAction::Off { tool } => tool,
        }
    }

    pub fn to_gcode(&self) -> String {
        let temp = match *self {
            HeaterAction::Preheat { temp, .. } | HeaterAction::Idle { temp, .. } => temp,
            HeaterAction::Off { .. } => 0.0,
        };
        format!("M104 T{} S{}", self.tool(), gcode_number(temp))
    }
}

/// Heater decisions for one command
#[derive(Debug, Clone, PartialEq)]
pub struct HeaterPlan {
    /// Tools considered hot after this command
    pub heating: BTreeSet<ToolId>,
    /// In ascending tool order within each phase
    pub actions: Vec<HeaterAction>,
}

pub struct PreheatPass {
    horizon: f64,
    idle_offset: f64,
}

impl PreheatPass {
    pub fn new(config: &WizardConfig) -> Self {
        Self {
            horizon: config.preheat_horizon,
            idle_offset: config.idle_offset,
        }
    }

    /// Decide heater changes for a command whose earlier facts are complete
    ///
    /// Returns `None` while the active tool is still unknown.
    pub fn plan(&self, facts: &Facts, prev: &Facts) -> Option<HeaterPlan> {
        let active = facts.active_tool()?;
        // Only the active tool is assumed hot at the start
        let mut heating = prev
            .heating
            .known()
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([active]));

        let none = BTreeMap::new();
        let needed = facts.time_next_needed.known().unwrap_or(&none);
        let next_temp = facts.next_temp.known().unwrap_or(&none);
        let requested = facts.requested_temp.known().unwrap_or(&none);
        let now = facts.time_or_zero();

        let mut actions = Vec::new();
        for (&tool, &needed_at) in needed {
            if tool == active {
                continue;
            }

            let Some(&target) = next_temp.get(&tool).or_else(|| requested.get(&tool)) else {
                tracing::debug!(tool, "No temperature known for tool yet, leaving heater alone");
                continue;
            };

            let until = needed_at - now;
            if !heating.contains(&tool) && until <= self.horizon {
                heating.insert(tool);
                actions.push(HeaterAction::Preheat { tool, temp: target });
            } else if heating.contains(&tool) && until > self.horizon {
                heating.remove(&tool);
                actions.push(HeaterAction::Idle {
                    tool,
                    temp: (target - self.idle_offset).max(0.0),
                });
            }
        }

        let finished: Vec<ToolId> = heating
            .iter()
            .copied()
            .filter(|tool| *tool != active && !needed.contains_key(tool))
            .collect();
        for tool in finished {
            heating.remove(&tool);
            actions.push(HeaterAction::Off { tool });
        }

        Some(HeaterPlan { heating, actions })
    }
}

impl Pass for PreheatPass {
    fn name(&self) -> &'static str {
        "preheat"
    }

    fn apply(&self, command: &mut Command, prev: &Facts) -> Result<()> {
        let Some(plan) = self.plan(&command.facts, prev) else {
            return Ok(());
        };

        for action in &plan.actions {
            tracing::debug!(line = command.line, ?action, "Heater change");
            command.post.push(action.to_gcode());
        }
        command.facts.heating.set(plan.heating);
        Ok(())
    }
}
