//! Curation task resolution and invocation.
//!
//! - `task`: the two task shapes, declarative policy, and the `ResolvedTask` wrapper
//! - `curator`: session resource table, object context, status codes, and the driver
//! - `record`: recorder trait and built-in sinks
//! - `plugin`: singleton implementations by category
//! - `descriptor`: YAML task descriptors
//! - `tasks`: built-in tasks

pub mod error;
pub mod task;
pub mod curator;
pub mod record;
pub mod plugin;
pub mod descriptor;
pub mod tasks;

pub use error::{CurateError, Result};
