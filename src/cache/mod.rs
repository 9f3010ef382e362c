//! Output frame caching.

pub mod frame_cache;
