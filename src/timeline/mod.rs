//! The timeline aggregate and its configuration.

pub mod engine;
pub mod settings;
