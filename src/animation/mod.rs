//! Time-varying scalar values.

pub mod curve;
