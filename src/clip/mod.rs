//! Clips as the timeline sees them: the source capability, the ordered registry and the
//! decode-handle lifecycle.

pub mod lifecycle;
pub mod registry;
pub mod source;
