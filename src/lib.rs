pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod position_log;
pub mod presenter;
pub mod sensor;
pub mod types;

pub use controller::{ModeController, SkipReason, TickOutcome};
pub use error::{PipelineError, SensorError, TickError};
pub use types::DisplayMode;
