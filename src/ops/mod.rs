pub mod adjustments;
pub mod command;
pub mod filters;
pub mod parse;
pub mod transform;

pub use command::Command;
pub use parse::{EditStep, parse_step, parse_steps};
