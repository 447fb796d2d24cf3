//! One-time shared construction of the router.

use crate::router::Router;
use std::sync::{Arc, OnceLock};

/// Holds the process's single [`Router`] instance.
///
/// Replaces a hidden global singleton with an explicit cell the application
/// owns (typically a `static`). Concurrent first callers race safely:
/// exactly one initializer runs, and every caller receives the same `Arc`.
///
/// ```
/// use bc_router::RouterCell;
///
/// static ANALYTICS: RouterCell = RouterCell::new();
/// ```
#[derive(Default)]
pub struct RouterCell {
    inner: OnceLock<Arc<Router>>,
}

impl RouterCell {
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Installs the router built by `init`, or returns the already-installed
    /// instance. `init` runs at most once per cell, even under a race.
    pub fn install<F>(&self, init: F) -> Arc<Router>
    where
        F: FnOnce() -> Router,
    {
        self.inner.get_or_init(|| Arc::new(init())).clone()
    }

    /// The installed router, if any.
    pub fn get(&self) -> Option<Arc<Router>> {
        self.inner.get().cloned()
    }
}
