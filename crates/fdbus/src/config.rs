// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Client endpoint configuration.

use std::time::Duration;

/// Configuration for a client endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Default service name sought through the name service; empty means
    /// `connect(None)` has no target.
    pub ns_name: String,

    /// Name-server URL. `None` makes every resolution report the name
    /// service as unreachable.
    pub ns_url: Option<String>,

    /// Retry after a session is lost to a transport fault.
    pub reconnect_enabled: bool,

    /// Pause before a direct reconnect attempt; zero skips the sleep.
    pub reconnect_wait: Duration,

    /// Frames above this size mark the session as faulted.
    pub max_message_size: usize,

    /// Dial timeout for TCP transports.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ns_name: String::new(),
            ns_url: None,
            reconnect_enabled: false,
            reconnect_wait: Duration::from_millis(1),
            max_message_size: 4 * 1024 * 1024,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the default service name.
    pub fn with_ns_name(mut self, name: &str) -> Self {
        self.ns_name = name.to_string();
        self
    }

    /// Builder: set the name-server URL.
    pub fn with_ns_url(mut self, url: &str) -> Self {
        self.ns_url = Some(url.to_string());
        self
    }

    /// Builder: enable reconnection after transport faults.
    pub fn with_reconnect(mut self) -> Self {
        self.reconnect_enabled = true;
        self
    }

    /// Builder: set the pause before direct reconnect attempts.
    pub fn with_reconnect_wait(mut self, wait: Duration) -> Self {
        self.reconnect_wait = wait;
        self
    }

    /// Builder: set the maximum frame size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Builder: set the TCP dial timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert!(config.ns_name.is_empty());
        assert!(config.ns_url.is_none());
        assert!(!config.reconnect_enabled);
        assert_eq!(config.reconnect_wait, Duration::from_millis(1));
    }

    #[test]
    fn builders_chain() {
        let config = ClientConfig::new()
            .with_ns_name("media")
            .with_ns_url("tcp://127.0.0.1:60000")
            .with_reconnect()
            .with_reconnect_wait(Duration::ZERO)
            .with_max_message_size(1024)
            .with_connect_timeout(Duration::from_secs(1));
        assert_eq!(config.ns_name, "media");
        assert_eq!(config.ns_url.as_deref(), Some("tcp://127.0.0.1:60000"));
        assert!(config.reconnect_enabled);
        assert!(config.reconnect_wait.is_zero());
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
    }
}
