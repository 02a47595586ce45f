//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Server configuration
//!
//! # Example
//!
//! ```
//! use telserv_service::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::new("0.0.0.0", 2323)
//!     .with_max_connections(64)
//!     .with_read_timeout(Duration::from_millis(250));
//! assert!(config.validate().is_ok());
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Server configuration
///
/// This structure contains all configuration options for the Telnet server.
/// Use the builder pattern methods to customize the configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to. An IP literal, `localhost`, or a host name resolved through the
    /// system resolver when the server binds.
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Requested address family.
    ///
    /// Kept for compatibility with existing deployments. The socket family always follows
    /// the resolved `host`; a mismatch is logged when the server binds.
    pub ipv6: bool,

    /// Bound on each read in the receive loop.
    ///
    /// A timed-out read is retried after the kill signal is checked, so this also bounds
    /// how long a session can take to notice it was closed.
    pub read_timeout: Duration,

    /// Bound on the single read performed before the server sends its own offers.
    pub negotiation_timeout: Duration,

    /// Bound on each socket write.
    pub write_timeout: Duration,

    /// Interval between reaper sweeps of the session pool.
    pub housekeeping_interval: Duration,

    /// How long `stop()` waits for session workers before aborting them.
    pub shutdown_timeout: Duration,

    /// Size of the per-session read buffer. One read yields at most this many bytes.
    pub read_buffer_size: usize,

    /// Maximum number of concurrent sessions
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 23,
            ipv6: false,
            read_timeout: Duration::from_secs(1),
            negotiation_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(10),
            housekeeping_interval: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
            read_buffer_size: 1024,
            max_connections: 1000,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given host and port
    ///
    /// All other settings will use their default values.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the requested address family
    pub fn with_ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = ipv6;
        self
    }

    /// Set the read timeout duration
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the handshake read timeout duration
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    /// Set the write timeout duration
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the reaper sweep interval
    pub fn with_housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }

    /// Set the shutdown timeout duration
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the read buffer size
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Resolve `host:port` into a socket address without a resolver lookup.
    ///
    /// Fails for host names other than `localhost`; the server resolves those itself.
    pub fn bind_address(&self) -> Result<SocketAddr, String> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|e| format!("invalid host {:?}: {}", self.host, e))?
        };
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() || self.host.contains(char::is_whitespace) {
            return Err(format!("invalid host {:?}", self.host));
        }

        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.read_buffer_size == 0 {
            return Err("read_buffer_size must be greater than 0".to_string());
        }

        if self.read_timeout.is_zero() {
            return Err("read_timeout must be greater than 0".to_string());
        }

        if self.negotiation_timeout.is_zero() {
            return Err("negotiation_timeout must be greater than 0".to_string());
        }

        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than 0".to_string());
        }

        if self.housekeeping_interval.is_zero() {
            return Err("housekeeping_interval must be greater than 0".to_string());
        }

        if self.shutdown_timeout.is_zero() {
            return Err("shutdown_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}
