//! G-code lines and files
//!
//! Only the handful of verbs the passes inspect are classified; everything
//! else is carried through untouched.

pub mod command;
pub mod sequence;

pub use command::{Command, CommandKind, ParamValue};
pub use sequence::Sequence;
