//! Mapping between the timeline clock and clip-local frames and samples.

pub mod reconcile;
