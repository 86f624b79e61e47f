//! # Connection Handshake Subsystem
//!
//! This crate implements the connection-establishment pipeline for the
//! Photon-RPC stack: a chained, deadline-bounded, cancellable state
//! machine that drives a freshly-accepted (or freshly-connected) byte
//! endpoint through an ordered sequence of pluggable handshakers until
//! the endpoint is ready to host application framing, or fails.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** errors, channel-args snapshots, diagnostic trace,
//!   accept context - pure data, no I/O
//! - **Ports Layer:** the `Handshaker` contract plus the `Endpoint` and
//!   `TaskScheduler` traits the pipeline is driven through
//! - **Service Layer:** the `HandshakeManager` chain driver and the
//!   per-role `HandshakerRegistry`
//! - **Adapters Layer:** tokio-backed scheduler and TCP endpoint
//!
//! ## Guarantees
//!
//! - Exactly one terminal callback per handshake, delivered on the
//!   scheduler, never inline, and only after the deadline timer is
//!   cancelled
//! - Handshakers run strictly in registration order, one at a time
//! - Shutdown and deadline expiry cancel the in-progress handshaker and
//!   surface through its completion path; a handshaker's own error wins
//!   over the cancellation reason
//! - The diagnostic trace persists only when the handshake fails
//!
//! ## Example
//!
//! ```rust,ignore
//! use photon_handshake::adapters::{TcpEndpoint, TokioScheduler};
//! use photon_handshake::domain::ChannelArgs;
//! use photon_handshake::service::HandshakeManager;
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! let scheduler = Arc::new(TokioScheduler::new());
//! let manager = HandshakeManager::new(scheduler);
//! manager.add(proxy_handshaker);
//! manager.add(tls_handshaker);
//! manager.do_handshake(
//!     Box::new(TcpEndpoint::new(stream)),
//!     ChannelArgs::new().with("server.name", "photon"),
//!     Instant::now() + Duration::from_secs(20),
//!     None,
//!     Box::new(|result| match result {
//!         Ok(args) => serve(args),
//!         Err(error) => tracing::warn!("handshake failed: {error}"),
//!     }),
//! );
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export domain types
pub use domain::{Acceptor, ChannelArgs, ChannelValue, EndpointError, HandshakeError, TraceNode};

// Re-export port traits and contract types
pub use ports::{
    DoneCallback, Endpoint, HandshakeResult, HandshakeStatus, Handshaker, HandshakerArgs,
    OnHandshakeDone, Task, TaskHandle, TaskScheduler,
};

// Re-export service types
pub use service::{HandshakeManager, HandshakeRole, HandshakerFactory, HandshakerRegistry};

// Re-export adapters
pub use adapters::{TcpEndpoint, TokioScheduler};
