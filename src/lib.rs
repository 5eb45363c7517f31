//! Aurora Genesis Engine.
//!
//! A persona runtime that rehydrates persona blueprints into live
//! instances, routes conversation turns through a fallback chain of model
//! backends, and runs controlled burns: a multi-phase reflection cycle whose
//! structured output is scored against checkpoints and persisted as a run
//! record plus a markdown summary.

pub mod artifacts;
pub mod burn;
pub mod config;
pub mod errors;
pub mod logging;
pub mod model;
pub mod persona;
pub mod reflection;
pub mod registry;
pub mod server;
pub mod services;
pub mod util;
