//! Tool Wizard - look-ahead heater and fan management for multi-tool G-code

pub mod core;
pub mod facts;
pub mod gcode;
pub mod passes;
pub mod wizard;
