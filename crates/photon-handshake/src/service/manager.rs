//! Handshake chain manager.

use crate::domain::{Acceptor, ChannelArgs, HandshakeError, TraceNode};
use crate::ports::handshaker::{
    DoneCallback, HandshakeStatus, Handshaker, HandshakerArgs, OnHandshakeDone,
};
use crate::ports::{Endpoint, TaskHandle, TaskScheduler};
use bytes::BytesMut;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::debug;

/// Drives one endpoint through an ordered chain of handshakers.
///
/// A manager is built, loaded with handshakers via [`HandshakeManager::add`]
/// in the order they should run, and started exactly once with
/// [`HandshakeManager::do_handshake`]. It arms the deadline timer, hands the
/// handshake state to each handshaker in turn, and delivers exactly one
/// terminal callback - on the scheduler, never inline - carrying either the
/// finished state or the first error.
///
/// All state transitions are serialized on one internal mutex. The manager
/// is reference-counted; every outstanding closure (deadline timer, step
/// continuation, terminal dispatch) holds a strong reference, so the
/// manager lives until the last in-flight hop has run.
pub struct HandshakeManager {
    scheduler: Arc<dyn TaskScheduler>,
    self_ref: Weak<Self>,
    state: Mutex<ManagerState>,
}

struct ManagerState {
    /// Ordered chain. Append-only before the handshake starts, immutable
    /// after.
    handshakers: Vec<Arc<dyn Handshaker>>,
    /// Cursor: handshakers `[0..index)` have completed, `index` has not
    /// been invoked. Only ever increments.
    index: usize,
    /// Monotonic latch; once set no further handshaker is invoked.
    is_shutdown: bool,
    /// Latch for the one-shot `do_handshake` precondition.
    started: bool,
    on_done: Option<OnHandshakeDone>,
    deadline_handle: Option<TaskHandle>,
    trace: TraceNode,
}

impl HandshakeManager {
    /// Create a manager running on `scheduler`.
    #[must_use]
    pub fn new(scheduler: Arc<dyn TaskScheduler>) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            scheduler,
            self_ref: self_ref.clone(),
            state: Mutex::new(ManagerState {
                handshakers: Vec::new(),
                index: 0,
                is_shutdown: false,
                started: false,
                on_done: None,
                deadline_handle: None,
                trace: TraceNode::new(),
            }),
        })
    }

    /// Strong handle for closures that must keep the manager alive across
    /// an asynchronous hop.
    fn self_arc(&self) -> Arc<Self> {
        // A live &self implies a live Arc.
        self.self_ref.upgrade().expect("manager still referenced")
    }

    /// Append a handshaker to the chain.
    ///
    /// Must not be called once [`HandshakeManager::do_handshake`] has
    /// started the chain.
    pub fn add(&self, handshaker: Arc<dyn Handshaker>) {
        let mut state = self.state.lock();
        debug_assert!(!state.started, "add called after do_handshake");
        debug!(
            handshaker = handshaker.name(),
            index = state.handshakers.len(),
            "adding handshaker"
        );
        state.handshakers.push(handshaker);
    }

    /// Start the chain. Must be called at most once per manager.
    ///
    /// Takes ownership of the endpoint, steals any pre-read bytes from an
    /// external acceptor into the read buffer, arms the deadline timer and
    /// invokes the first handshaker. Returns immediately; the outcome
    /// arrives through `on_done`, exactly once, on the scheduler.
    pub fn do_handshake(
        &self,
        endpoint: Box<dyn Endpoint>,
        channel_args: ChannelArgs,
        deadline: Instant,
        acceptor: Option<Acceptor>,
        on_done: OnHandshakeDone,
    ) {
        // Local strong ref: scheduling on_done may consume the caller's
        // last reference before this call returns.
        let this = self.self_arc();
        let mut state = self.state.lock();
        debug_assert!(!state.started, "do_handshake called twice");
        state.started = true;
        state.on_done = Some(on_done);

        let mut args = HandshakerArgs {
            endpoint: Some(endpoint),
            channel_args,
            read_buffer: BytesMut::new(),
            deadline,
            acceptor: None,
            exit_early: false,
            trace: state.trace.clone(),
            scheduler: Arc::clone(&self.scheduler),
        };
        if let Some(mut acceptor) = acceptor {
            if acceptor.external_connection {
                if let Some(pending) = acceptor.pending_data.take() {
                    // Zero-copy steal of the acceptor's pre-read bytes.
                    args.read_buffer = pending;
                }
            }
            args.acceptor = Some(acceptor);
        }

        let timer_self = Arc::clone(&this);
        let delay = deadline.saturating_duration_since(Instant::now());
        state.deadline_handle = Some(self.scheduler.run_after(
            delay,
            Box::new(move || {
                timer_self.shutdown(HandshakeError::TimedOut);
            }),
        ));

        self.advance_locked(&mut state, args, Ok(()));
    }

    /// Request cancellation of the handshake.
    ///
    /// Idempotent. Does not deliver the terminal callback itself: the
    /// in-progress handshaker is asked to cancel, and its completion path
    /// observes the shutdown latch and takes the failure branch. A
    /// handshaker error racing this call wins over `error`.
    pub fn shutdown(&self, error: HandshakeError) {
        let mut state = self.state.lock();
        if state.is_shutdown {
            return;
        }
        state.is_shutdown = true;
        state.trace.log(format!("shutdown requested: {error}"));
        state.trace.commit();
        // Cancel the handshaker currently in progress, if any. Its `done`
        // arrives through the scheduler and finishes the chain.
        if state.index > 0 {
            let current = Arc::clone(&state.handshakers[state.index - 1]);
            debug!(
                handshaker = current.name(),
                index = state.index - 1,
                "shutting down in-progress handshaker"
            );
            current.shutdown(error);
        }
    }

    /// Advance the chain by one step. Runs with the state mutex held.
    ///
    /// Every completion funnels here: the initial start (ok status), each
    /// handshaker's continuation, and - indirectly - shutdown and deadline,
    /// which latch `is_shutdown` and let the active handshaker's completion
    /// carry the chain into the terminal branch.
    fn advance_locked(
        &self,
        state: &mut ManagerState,
        mut args: HandshakerArgs,
        mut status: HandshakeStatus,
    ) {
        debug!(
            status = ?status,
            shutdown = state.is_shutdown,
            index = state.index,
            args = ?args,
            "advancing handshake chain"
        );
        debug_assert!(state.index <= state.handshakers.len());
        let terminal = status.is_err()
            || state.is_shutdown
            || args.exit_early
            || state.index == state.handshakers.len();
        if terminal {
            if status.is_ok() && state.is_shutdown {
                // The shutdown raced an ok completion: the caller must not
                // receive an endpoint.
                status = Err(HandshakeError::Shutdown);
                args.endpoint = None;
            }
            if let Err(error) = &status {
                args.trace.log(format!("handshake failed: {error}"));
                args.trace.commit();
            }
            if let Some(handle) = state.deadline_handle.take() {
                self.scheduler.cancel(handle);
            }
            state.is_shutdown = true;
            let result = match status {
                Ok(()) => Ok(args),
                // Dropping the state here releases the endpoint.
                Err(error) => Err(error),
            };
            if let Some(on_done) = state.on_done.take() {
                let keepalive = self.self_arc();
                self.scheduler.run(Box::new(move || {
                    on_done(result);
                    // Callback destroyed on the scheduler, not under the
                    // manager mutex.
                    drop(keepalive);
                }));
            }
            return;
        }

        let handshaker = Arc::clone(&state.handshakers[state.index]);
        args.trace.log(format!(
            "calling handshaker {} at index {}",
            handshaker.name(),
            state.index
        ));
        state.index += 1;
        let chain = self.self_arc();
        let done: DoneCallback = Box::new(move |args, status| {
            // The state mutex is held across do_handshake and is not
            // reentrant: re-entry must hop through the scheduler.
            let scheduler = Arc::clone(&chain.scheduler);
            scheduler.run(Box::new(move || {
                let mut state = chain.state.lock();
                chain.advance_locked(&mut state, args, status);
            }));
        });
        handshaker.do_handshake(args, done);
    }
}

impl std::fmt::Debug for HandshakeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HandshakeManager")
            .field("handshakers", &state.handshakers.len())
            .field("index", &state.index)
            .field("is_shutdown", &state.is_shutdown)
            .finish()
    }
}
