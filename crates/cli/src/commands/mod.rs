//! Subcommand implementations

pub mod health;
pub mod predict;
pub mod stats;
