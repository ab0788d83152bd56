pub mod config;
pub mod error;

pub use config::WizardConfig;
pub use error::{Result, WizardError};
