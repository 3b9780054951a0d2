//! Configuration module for polynotes
//!
//! This module handles the renderer and auto-pair preferences, including
//! serialization to/from JSON and persistent storage in the platform config
//! directory.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
