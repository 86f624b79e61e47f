//! The handshaker contract.

use crate::domain::{Acceptor, ChannelArgs, HandshakeError, TraceNode};
use crate::ports::endpoint::Endpoint;
use crate::ports::scheduler::TaskScheduler;
use bytes::BytesMut;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Status a handshaker reports through its continuation.
pub type HandshakeStatus = Result<(), HandshakeError>;

/// One-shot continuation a handshaker must invoke exactly once, returning
/// the handshake state it was handed together with its completion status.
/// May be invoked inline from `do_handshake` or from any other thread.
pub type DoneCallback = Box<dyn FnOnce(HandshakerArgs, HandshakeStatus) + Send + 'static>;

/// Terminal result of a whole handshake: the finished state (endpoint
/// ownership included) on success, the first failure otherwise.
pub type HandshakeResult = Result<HandshakerArgs, HandshakeError>;

/// One-shot terminal callback for a whole handshake. Always invoked on the
/// scheduler, never inline from the manager.
pub type OnHandshakeDone = Box<dyn FnOnce(HandshakeResult) + Send + 'static>;

/// Mutable hand-off state flowing through the handshaker chain.
///
/// Exactly one party owns this value at any time: the manager between
/// steps, the active handshaker during its step, the terminal callback on
/// success. A handshaker mutates it freely while it holds it and returns
/// it through its [`DoneCallback`].
pub struct HandshakerArgs {
    /// The byte endpoint under negotiation. `Some` until a terminal
    /// failure releases it; a handshaker may swap in a wrapped endpoint.
    pub endpoint: Option<Box<dyn Endpoint>>,
    /// Channel configuration snapshot. A handshaker may store back an
    /// extended snapshot for the rest of the chain.
    pub channel_args: ChannelArgs,
    /// Bytes already read off the wire but not yet consumed. Each
    /// handshaker may drain or extend it; the next one inherits the rest.
    pub read_buffer: BytesMut,
    /// Absolute deadline for the whole chain. Immutable.
    pub deadline: Instant,
    /// Accept context for server-side handshakes, drained of pending data.
    pub acceptor: Option<Acceptor>,
    /// Orderly short-circuit: set to finish the handshake after this step
    /// without running the remaining handshakers.
    pub exit_early: bool,
    /// Shared diagnostic trace for this handshake attempt.
    pub trace: TraceNode,
    /// The scheduler the chain runs on, for handshakers that defer work.
    pub scheduler: Arc<dyn TaskScheduler>,
}

impl fmt::Debug for HandshakerArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakerArgs")
            .field("endpoint", &self.endpoint.is_some())
            .field("channel_args", &self.channel_args.len())
            .field("read_buffer", &self.read_buffer.len())
            .field("exit_early", &self.exit_early)
            .finish()
    }
}

/// A single transformation step on the endpoint-plus-context state.
///
/// Implementations negotiate one protocol layer (proxy CONNECT, TLS, ALPN,
/// HTTP/2 preface, ...). The pipeline treats each as a black box behind
/// this contract.
///
/// # Contract
///
/// - `do_handshake` must not block; it schedules whatever I/O it needs and
///   returns. The continuation must be invoked exactly once, with the
///   handshake state handed back. On success the endpoint must be present
///   and residual pre-read bytes must sit in the read buffer. On failure
///   no partial state may be left behind that a later handshaker would
///   trip over.
/// - `shutdown` is an idempotent cancellation request. If the continuation
///   has not fired yet it must fire with a non-ok status in bounded time;
///   after the continuation fired, `shutdown` is a no-op.
/// - The manager never calls `do_handshake` and `shutdown` concurrently on
///   one instance, but `shutdown` may race the handshaker's internal
///   completion path.
pub trait Handshaker: Send + Sync + 'static {
    /// Static identifier for logging and tracing.
    fn name(&self) -> &'static str;

    /// Consume or augment the handshake state, then invoke `done`.
    fn do_handshake(&self, args: HandshakerArgs, done: DoneCallback);

    /// Request cancellation of an in-flight step.
    fn shutdown(&self, error: HandshakeError);
}
