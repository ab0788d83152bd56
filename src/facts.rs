//! Derived per-command facts
//!
//! Every fact starts out `Pending` and is written once by the pass that owns
//! it. `Fact::Known(None)` means the pass ran and found no value, which is
//! different from the pass not having run yet.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

/// Tool number as given by a `T` word
pub type ToolId = i64;

/// A single derived value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Fact<T> {
    #[default]
    Pending,
    Known(T),
}

impl<T> Fact<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Fact::Known(value) => Some(value),
            Fact::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Fact::Pending)
    }

    /// Write the fact. Facts are write-once within a run.
    pub fn set(&mut self, value: T) {
        debug_assert!(self.is_pending(), "fact written twice in one run");
        *self = Fact::Known(value);
    }
}

impl<T> Fact<Option<T>> {
    /// Flatten a possibly-absent optional fact
    pub fn value(&self) -> Option<&T> {
        self.known().and_then(Option::as_ref)
    }
}

impl<T: Serialize> Serialize for Fact<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Fact::Known(value) => value.serialize(serializer),
            Fact::Pending => serializer.serialize_none(),
        }
    }
}

/// The closed set of facts the pipeline derives for one command
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facts {
    #[serde(rename = "X", skip_serializing_if = "Fact::is_pending")]
    pub x: Fact<Option<f64>>,
    #[serde(rename = "Y", skip_serializing_if = "Fact::is_pending")]
    pub y: Fact<Option<f64>>,
    #[serde(rename = "F", skip_serializing_if = "Fact::is_pending")]
    pub feed: Fact<Option<f64>>,
    #[serde(skip_serializing_if = "Fact::is_pending")]
    pub time: Fact<f64>,
    #[serde(skip_serializing_if = "Fact::is_pending")]
    pub active_tool: Fact<Option<ToolId>>,
    /// Latest heater-set temperature per tool seen so far
    #[serde(skip_serializing_if = "Fact::is_pending")]
    pub requested_temp: Fact<BTreeMap<ToolId, f64>>,
    /// Time each tool is next selected, looking forward
    #[serde(skip_serializing_if = "Fact::is_pending")]
    pub time_next_needed: Fact<BTreeMap<ToolId, f64>>,
    /// Next heater-set temperature per tool, looking forward
    #[serde(skip_serializing_if = "Fact::is_pending")]
    pub next_temp: Fact<BTreeMap<ToolId, f64>>,
    #[serde(skip_serializing_if = "Fact::is_pending")]
    pub heating: Fact<BTreeSet<ToolId>>,
    #[serde(skip_serializing_if = "Fact::is_pending")]
    pub fan_speed: Fact<f64>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time estimate, 0 when not yet known
    pub fn time_or_zero(&self) -> f64 {
        self.time.known().copied().unwrap_or(0.0)
    }

    pub fn active_tool(&self) -> Option<ToolId> {
        self.active_tool.value().copied()
    }
}
