use razchess_transport::ChannelConfig;

/// Configuration for a [`SessionClient`](crate::SessionClient).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Reconnect behaviour of the underlying channel.
    pub channel: ChannelConfig,

    /// How many [`SessionEvent`](crate::SessionEvent)s a slow subscriber
    /// may fall behind before it starts missing them.
    ///
    /// Default: 64.
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            event_capacity: 64,
        }
    }
}
