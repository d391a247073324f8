//! PhotoFE: a photo editor core with bounded linear undo/redo.
//!
//! Every edit is a [`ops::Command`] executed against the current image and
//! recorded by [`components::Controller`]. The CLI and the interactive shell
//! drive a [`project::Project`] on top of that.

#[macro_use]
pub mod logger;

pub mod cli;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;
pub mod shell;
pub mod upload;
