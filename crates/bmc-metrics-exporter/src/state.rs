//! Exporter lifecycle state.

use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle gate of an exporter: active until the first shutdown, shut down afterwards.
/// There is no transition back to the active state.
#[derive(Debug, Default)]
pub(crate) struct ExportState {
    is_shut_down: AtomicBool,
}

impl ExportState {
    pub(crate) fn is_shut_down(&self) -> bool {
        self.is_shut_down.load(Ordering::SeqCst)
    }

    /// Returns `true` if this call has performed the transition.
    pub(crate) fn shut_down(&self) -> bool {
        !self.is_shut_down.swap(true, Ordering::SeqCst)
    }
}
