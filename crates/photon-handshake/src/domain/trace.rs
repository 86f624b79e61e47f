//! Per-handshake diagnostic trace.

use parking_lot::Mutex;
use std::sync::Arc;

/// Append-only diagnostic sink for one handshake attempt.
///
/// Handshakers and the manager log chain transitions here. The buffer is
/// ephemeral: if the handshake succeeds nobody commits it and the events
/// vanish when the last handle drops. Failure paths call
/// [`TraceNode::commit`], which latches the node and emits the buffered
/// events through `tracing`, so the record of what went wrong survives for
/// higher layers to inspect.
///
/// Handles are cheap clones sharing one buffer; the manager and the
/// traveling handshake state each hold one.
#[derive(Debug, Clone, Default)]
pub struct TraceNode {
    inner: Arc<Mutex<TraceInner>>,
}

#[derive(Debug, Default)]
struct TraceInner {
    events: Vec<String>,
    committed: bool,
}

impl TraceNode {
    /// Create an empty, uncommitted trace node.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic event.
    ///
    /// Events recorded after the node was committed are still retained;
    /// late arrivals from an in-flight handshaker belong to the same
    /// failure record.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.inner.lock();
        tracing::debug!(committed = inner.committed, "handshake trace: {message}");
        inner.events.push(message);
    }

    /// Latch the node as persistent. Idempotent.
    pub fn commit(&self) {
        let mut inner = self.inner.lock();
        if inner.committed {
            return;
        }
        inner.committed = true;
        for event in &inner.events {
            tracing::debug!("handshake trace (committed): {event}");
        }
    }

    /// Whether [`TraceNode::commit`] has been called.
    pub fn is_committed(&self) -> bool {
        self.inner.lock().committed
    }

    /// Snapshot of the buffered events.
    pub fn events(&self) -> Vec<String> {
        self.inner.lock().events.clone()
    }
}
