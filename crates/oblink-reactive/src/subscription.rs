#![forbid(unsafe_code)]

//! RAII guard keeping a subscriber callback alive.

use std::any::Any;

/// RAII guard for a subscriber callback.
///
/// The container holds the callback as a `Weak` reference; this guard holds
/// the matching strong reference. Dropping the guard makes the callback
/// unreachable, so the `Weak` entry fails to upgrade on the next
/// notification cycle and is pruned.
pub struct Subscription {
    /// Type-erased strong reference keeping the callback alive.
    _guard: Box<dyn Any>,
}

impl Subscription {
    /// Wrap an arbitrary strong reference in a guard.
    ///
    /// Used by containers (and by source-system implementations that follow
    /// the same weak-listener pattern) to tie a callback's lifetime to a
    /// value the caller can drop.
    #[must_use]
    pub fn hold(guard: impl Any) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
