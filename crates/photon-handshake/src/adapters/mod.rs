//! Adapters Layer - Production implementations of the driven ports
//!
//! - [`TokioScheduler`]: executor/timer service on a tokio runtime
//! - [`TcpEndpoint`]: byte endpoint over a tokio TCP stream

pub mod tcp;
pub mod tokio_scheduler;

pub use tcp::TcpEndpoint;
pub use tokio_scheduler::TokioScheduler;
