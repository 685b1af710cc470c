//! Configuration module for twinmark
//!
//! A read-only settings snapshot, deserialized from JSON in the platform
//! config directory.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
