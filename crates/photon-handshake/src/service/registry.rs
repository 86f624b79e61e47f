//! Handshaker factory registry.

use crate::domain::ChannelArgs;
use crate::service::manager::HandshakeManager;
use tracing::debug;

/// Which side of the connection a handshaker set serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeRole {
    /// Connecting side.
    Client,
    /// Accepting side.
    Server,
}

/// Produces handshakers for one protocol layer.
///
/// A factory inspects the channel configuration and adds zero or more
/// handshakers to the manager. Factories registered for the same role are
/// invoked in ascending priority order (ties keep registration order), so
/// the chain ends up ordered proxy-before-TLS-before-preface without the
/// factories knowing about each other.
pub trait HandshakerFactory: Send + Sync + 'static {
    /// Static identifier for logging.
    fn name(&self) -> &'static str;

    /// Add this layer's handshakers to `manager`, if the configuration
    /// calls for them.
    fn add_handshakers(&self, channel_args: &ChannelArgs, manager: &HandshakeManager);
}

struct RegisteredFactory {
    priority: u8,
    role: HandshakeRole,
    factory: Box<dyn HandshakerFactory>,
}

/// Registry of handshaker factories, keyed by role and ordered by priority.
///
/// Built once at stack initialization, then consulted per connection to
/// populate a fresh [`HandshakeManager`].
#[derive(Default)]
pub struct HandshakerRegistry {
    factories: Vec<RegisteredFactory>,
}

impl HandshakerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `role`. Lower `priority` runs earlier in the
    /// chain; equal priorities keep registration order.
    pub fn register(
        &mut self,
        role: HandshakeRole,
        priority: u8,
        factory: Box<dyn HandshakerFactory>,
    ) {
        debug!(factory = factory.name(), ?role, priority, "registering handshaker factory");
        let at = self
            .factories
            .partition_point(|entry| entry.priority <= priority);
        self.factories.insert(
            at,
            RegisteredFactory {
                priority,
                role,
                factory,
            },
        );
    }

    /// Let every factory registered for `role` add its handshakers to
    /// `manager`, in priority order.
    pub fn add_handshakers(
        &self,
        role: HandshakeRole,
        channel_args: &ChannelArgs,
        manager: &HandshakeManager,
    ) {
        for entry in self.factories.iter().filter(|entry| entry.role == role) {
            entry.factory.add_handshakers(channel_args, manager);
        }
    }

    /// Number of registered factories across both roles.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry has no factories.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
