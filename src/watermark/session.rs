//! Latest-wins arbitration for live previews.
//!
//! Interactive callers start a new composition on every control change. Runs
//! may finish out of order, so each one is tagged with a monotonically
//! increasing [`RequestId`] and a result is only shown if nothing newer has
//! been shown already.

use super::result::CompositionResult;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Identifier of one preview run. Later runs compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct Shown {
    id: Option<RequestId>,
    result: Option<CompositionResult>,
}

#[derive(Debug, Default)]
pub struct PreviewSession {
    next_id: AtomicU64,
    shown: Mutex<Shown>,
}

impl PreviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a new run.
    pub fn begin(&self) -> RequestId {
        RequestId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Offer a finished run's result. Returns `false` if it was discarded
    /// because a newer run was already shown.
    pub fn complete(&self, id: RequestId, result: CompositionResult) -> bool {
        let mut shown = self.shown.lock();
        if shown.id.is_some_and(|current| current > id) {
            debug!(
                request = id.value(),
                shown = shown.id.map(|current| current.value()),
                "discarding stale preview"
            );
            return false;
        }
        shown.id = Some(id);
        shown.result = Some(result);
        true
    }

    pub fn latest(&self) -> Option<CompositionResult> {
        self.shown.lock().result.clone()
    }

    pub fn latest_id(&self) -> Option<RequestId> {
        self.shown.lock().id
    }
}
