pub(crate) mod color;
pub(crate) mod still;

use std::sync::RwLock;

/// Movable `(position, layer)` pair shared by the built-in sources.
#[derive(Debug)]
pub(crate) struct Placement {
    inner: RwLock<(f64, i32)>,
}

impl Placement {
    pub(crate) fn new(position: f64, layer: i32) -> Self {
        Self {
            inner: RwLock::new((position, layer)),
        }
    }

    pub(crate) fn position(&self) -> f64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).0
    }

    pub(crate) fn layer(&self) -> i32 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).1
    }

    pub(crate) fn set_position(&self, position: f64) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).0 = position;
    }

    pub(crate) fn set_layer(&self, layer: i32) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).1 = layer;
    }
}
