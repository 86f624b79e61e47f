//! Testing utilities for the handshake subsystem.
//!
//! Deterministic mock implementations of the ports, for driving the
//! pipeline through exact interleavings without a runtime. Enable with the
//! `test-utils` feature flag.

use crate::domain::{EndpointError, HandshakeError};
use crate::ports::handshaker::{DoneCallback, HandshakeStatus, Handshaker, HandshakerArgs};
use crate::ports::{Endpoint, Task, TaskHandle, TaskScheduler};
use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// ManualScheduler - single-stepped executor with a fake clock
// =============================================================================

/// A scheduler that runs nothing until told to.
///
/// Tasks posted with `run` queue up until [`ManualScheduler::run_ready`];
/// timers hold until the fake clock passes their fire time via
/// [`ManualScheduler::advance`]. This makes shutdown/timeout races exactly
/// reproducible: a test can park a completion on the queue, inject a
/// shutdown, and only then let the queue drain.
#[derive(Default)]
pub struct ManualScheduler {
    inner: Mutex<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerInner {
    now: Duration,
    next_id: u64,
    ready: VecDeque<Task>,
    timers: Vec<TimerEntry>,
}

struct TimerEntry {
    handle: TaskHandle,
    fire_at: Duration,
    task: Task,
}

impl ManualScheduler {
    /// Create a scheduler with an empty queue and the clock at zero.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run queued tasks (including ones they enqueue) until the queue is
    /// empty. Returns how many ran.
    pub fn run_ready(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.inner.lock().ready.pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Advance the fake clock, moving due timers onto the ready queue,
    /// then drain the queue. Returns how many tasks ran.
    pub fn advance(&self, delta: Duration) -> usize {
        {
            let mut inner = self.inner.lock();
            inner.now += delta;
            let now = inner.now;
            let mut due: Vec<TimerEntry> = Vec::new();
            let mut remaining: Vec<TimerEntry> = Vec::new();
            for entry in inner.timers.drain(..) {
                if entry.fire_at <= now {
                    due.push(entry);
                } else {
                    remaining.push(entry);
                }
            }
            inner.timers = remaining;
            due.sort_by_key(|entry| entry.fire_at);
            for entry in due {
                inner.ready.push_back(entry.task);
            }
        }
        self.run_ready()
    }

    /// Tasks waiting on the ready queue.
    pub fn pending_tasks(&self) -> usize {
        self.inner.lock().ready.len()
    }

    /// Timers armed but not yet due.
    pub fn pending_timers(&self) -> usize {
        self.inner.lock().timers.len()
    }

    /// Current fake-clock reading.
    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }
}

impl TaskScheduler for ManualScheduler {
    fn run(&self, task: Task) {
        self.inner.lock().ready.push_back(task);
    }

    fn run_after(&self, delay: Duration, task: Task) -> TaskHandle {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let handle = TaskHandle::new(inner.next_id);
        let fire_at = inner.now + delay;
        inner.timers.push(TimerEntry {
            handle,
            fire_at,
            task,
        });
        handle
    }

    fn cancel(&self, handle: TaskHandle) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.timers.len();
        inner.timers.retain(|entry| entry.handle != handle);
        inner.timers.len() != before
    }
}

// =============================================================================
// MockEndpoint - in-memory byte endpoint
// =============================================================================

/// In-memory endpoint with observable writes and an observable drop.
///
/// Tests keep the handles returned by [`MockEndpoint::written`] and
/// [`MockEndpoint::drop_flag`] before moving the endpoint into the
/// pipeline, then assert on them after the terminal callback.
pub struct MockEndpoint {
    inbound: BytesMut,
    written: Arc<Mutex<Vec<u8>>>,
    dropped: Arc<AtomicBool>,
    peer: Option<SocketAddr>,
}

impl MockEndpoint {
    /// Endpoint with nothing to read.
    #[must_use]
    pub fn new() -> Self {
        Self::with_inbound(&[])
    }

    /// Endpoint whose reads drain `data`.
    #[must_use]
    pub fn with_inbound(data: &[u8]) -> Self {
        Self {
            inbound: BytesMut::from(data),
            written: Arc::new(Mutex::new(Vec::new())),
            dropped: Arc::new(AtomicBool::new(false)),
            peer: None,
        }
    }

    /// Shared view of everything written to this endpoint.
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }

    /// Flag that flips when the endpoint is dropped (released).
    pub fn drop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dropped)
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Endpoint for MockEndpoint {
    async fn read(&mut self, buf: &mut BytesMut) -> Result<usize, EndpointError> {
        let n = self.inbound.len();
        buf.extend_from_slice(&self.inbound.split());
        Ok(n)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), EndpointError> {
        self.written.lock().extend_from_slice(data);
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }
}

// =============================================================================
// HandshakeJournal - ordered record of chain activity
// =============================================================================

/// Shared, ordered record of handshaker invocations.
///
/// Scripted handshakers append one entry per `do_handshake`, `shutdown`
/// and completion, so tests can assert exact invocation order across the
/// whole chain.
#[derive(Clone, Default)]
pub struct HandshakeJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl HandshakeJournal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Snapshot of all entries in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

// =============================================================================
// ScriptedHandshaker - canned chain steps
// =============================================================================

enum Script {
    CompleteOk,
    CompleteErr(HandshakeError),
    ExitEarly,
    Pend,
    ReplaceEndpoint(Option<Box<dyn Endpoint>>),
}

/// A handshaker that follows a canned script when invoked.
///
/// Completion happens inline from `do_handshake` (the manager must
/// tolerate that); a pending script holds the handshake state until
/// `shutdown` arrives, which it echoes as its completion status - the
/// behavior the contract requires of any real handshaker.
pub struct ScriptedHandshaker {
    name: &'static str,
    script: Mutex<Script>,
    held: Mutex<Option<(HandshakerArgs, DoneCallback)>>,
    journal: HandshakeJournal,
}

impl ScriptedHandshaker {
    /// Completes ok inline.
    #[must_use]
    pub fn ok(name: &'static str, journal: HandshakeJournal) -> Arc<Self> {
        Self::with_script(name, journal, Script::CompleteOk)
    }

    /// Completes inline with `error`.
    #[must_use]
    pub fn failing(
        name: &'static str,
        journal: HandshakeJournal,
        error: HandshakeError,
    ) -> Arc<Self> {
        Self::with_script(name, journal, Script::CompleteErr(error))
    }

    /// Sets `exit_early`, then completes ok inline.
    #[must_use]
    pub fn exiting_early(name: &'static str, journal: HandshakeJournal) -> Arc<Self> {
        Self::with_script(name, journal, Script::ExitEarly)
    }

    /// Never completes on its own; waits for `shutdown` or
    /// [`ScriptedHandshaker::complete_now`].
    #[must_use]
    pub fn pending(name: &'static str, journal: HandshakeJournal) -> Arc<Self> {
        Self::with_script(name, journal, Script::Pend)
    }

    /// Swaps in `endpoint` (a wrapped endpoint in real chains), then
    /// completes ok inline.
    #[must_use]
    pub fn replacing_endpoint(
        name: &'static str,
        journal: HandshakeJournal,
        endpoint: Box<dyn Endpoint>,
    ) -> Arc<Self> {
        Self::with_script(name, journal, Script::ReplaceEndpoint(Some(endpoint)))
    }

    fn with_script(name: &'static str, journal: HandshakeJournal, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name,
            script: Mutex::new(script),
            held: Mutex::new(None),
            journal,
        })
    }

    /// Complete a pending step by hand with `status`.
    ///
    /// No-op if the step is not currently held (not yet invoked, or
    /// already completed).
    pub fn complete_now(&self, status: HandshakeStatus) {
        if let Some((args, done)) = self.held.lock().take() {
            self.journal
                .record(format!("{}: done({})", self.name, status_label(&status)));
            done(args, status);
        }
    }

    /// Whether the handshaker is currently holding the handshake state.
    pub fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }
}

fn status_label(status: &HandshakeStatus) -> String {
    match status {
        Ok(()) => "ok".to_owned(),
        Err(error) => error.to_string(),
    }
}

impl Handshaker for ScriptedHandshaker {
    fn name(&self) -> &'static str {
        self.name
    }

    fn do_handshake(&self, mut args: HandshakerArgs, done: DoneCallback) {
        self.journal.record(format!("{}: do_handshake", self.name));
        let mut script = self.script.lock();
        match &mut *script {
            Script::CompleteOk => done(args, Ok(())),
            Script::CompleteErr(error) => {
                let error = error.clone();
                done(args, Err(error));
            }
            Script::ExitEarly => {
                args.exit_early = true;
                done(args, Ok(()));
            }
            Script::Pend => *self.held.lock() = Some((args, done)),
            Script::ReplaceEndpoint(endpoint) => {
                if let Some(endpoint) = endpoint.take() {
                    args.endpoint = Some(endpoint);
                }
                done(args, Ok(()));
            }
        }
    }

    fn shutdown(&self, error: HandshakeError) {
        self.journal
            .record(format!("{}: shutdown({error})", self.name));
        // Echo the shutdown reason as the completion status; after the
        // continuation already fired this is a no-op.
        if let Some((args, done)) = self.held.lock().take() {
            done(args, Err(error));
        }
    }
}
