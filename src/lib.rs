pub mod config;
pub mod daioe;
pub mod error;
pub mod export;
pub mod inspect;
pub mod merge;
pub mod pipeline;
pub mod scb;
pub mod source;
pub mod statistics;
pub mod view;

pub use error::{PipelineError, Result};
pub use view::{PlanStep, View};
