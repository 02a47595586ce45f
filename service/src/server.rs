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

//! Telnet server implementation
//!
//! The TelnetServer owns the TCP listener and the [`SessionPool`]. Its accept loop
//! admits connections, runs the reaper on a fixed housekeeping interval and tears
//! everything down when asked to stop or when the listener fails.

use crate::{
    Result, ServerConfig, ServerMetrics, ServerSnapshot, SessionHandler, SessionPool, TelnetError,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, lookup_host};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Telnet server
///
/// # Example
///
/// ```no_run
/// use telserv_service::{CallbackHandler, ServerConfig, TelnetServer};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = TelnetServer::bind(ServerConfig::new("127.0.0.1", 2323)).await?;
///     server.start(Arc::new(CallbackHandler::new())).await?;
///
///     tokio::signal::ctrl_c().await?;
///     server.stop().await;
///     Ok(())
/// }
/// ```
pub struct TelnetServer {
    /// Server configuration
    config: ServerConfig,
    /// Live sessions
    pool: Arc<SessionPool>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Bound listener, moved into the accept task on start
    listener: Mutex<Option<TcpListener>>,
    /// Actual bind address
    bind_address: SocketAddr,
    /// Server start time
    started_at: Instant,
    /// Stop signal for the accept loop
    stop: CancellationToken,
    /// Running flag
    running: AtomicBool,
    /// Accept loop task handle
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl TelnetServer {
    /// Validate `config` and bind the listener.
    ///
    /// Connections are not accepted until [`TelnetServer::start`] is called.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate().map_err(TelnetError::InvalidConfig)?;
        let address = resolve(&config).await?;
        if config.ipv6 != address.is_ipv6() {
            warn!(
                ipv6 = config.ipv6,
                address = %address,
                "ipv6 flag does not match the bind address family; the address family wins"
            );
        }

        let listener = TcpListener::bind(address).await?;
        let bind_address = listener.local_addr()?;
        info!(address = %bind_address, "Telnet server bound");

        let metrics = Arc::new(ServerMetrics::new());
        let pool = Arc::new(SessionPool::new(config.clone(), metrics.clone()));
        Ok(Self {
            config,
            pool,
            metrics,
            listener: Mutex::new(Some(listener)),
            bind_address,
            started_at: Instant::now(),
            stop: CancellationToken::new(),
            running: AtomicBool::new(false),
            accept_task: Mutex::new(None),
        })
    }

    /// Start accepting connections, handing each one to `handler`.
    pub async fn start(&self, handler: Arc<dyn SessionHandler>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TelnetError::AlreadyRunning);
        }
        let Some(listener) = self.listener.lock().await.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Err(TelnetError::ServerNotRunning);
        };
        if self.stop.is_cancelled() {
            self.running.store(false, Ordering::SeqCst);
            return Err(TelnetError::ServerNotRunning);
        }

        info!(address = %self.bind_address, "Starting Telnet server");
        let task = tokio::spawn(accept_loop(
            listener,
            self.pool.clone(),
            handler,
            self.stop.clone(),
            self.config.housekeeping_interval,
        ));
        *self.accept_task.lock().await = Some(task);
        Ok(())
    }

    /// Stop accepting, close every session and wait for all of them.
    ///
    /// Idempotent. When this returns the listener is closed, the pool is empty and
    /// every session that was in it is `Closed`.
    pub async fn stop(&self) {
        self.stop.cancel();

        let task = self.accept_task.lock().await.take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                warn!(error = %error, "Accept loop did not exit cleanly");
            }
        }
        self.listener.lock().await.take();

        self.pool.shutdown().await;
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Telnet server stopped");
        }
    }

    /// Check if the accept loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.stop.is_cancelled()
    }

    /// Get the server's bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the session pool
    pub fn pool(&self) -> Arc<SessionPool> {
        self.pool.clone()
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.pool.len(),
            total_sessions: self.metrics.total_sessions(),
            rejected_sessions: self.metrics.rejected_sessions(),
            bind_address: self.bind_address,
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }
}

/// IP literals and `localhost` are taken as-is; other names go through the resolver.
async fn resolve(config: &ServerConfig) -> Result<SocketAddr> {
    if let Ok(address) = config.bind_address() {
        return Ok(address);
    }
    debug!(host = %config.host, "Resolving bind host");
    lookup_host((config.host.as_str(), config.port))
        .await?
        .next()
        .ok_or_else(|| {
            TelnetError::InvalidConfig(format!("host {:?} did not resolve", config.host))
        })
}

async fn accept_loop(
    listener: TcpListener,
    pool: Arc<SessionPool>,
    handler: Arc<dyn SessionHandler>,
    stop: CancellationToken,
    housekeeping_interval: Duration,
) {
    let mut housekeeping = tokio::time::interval(housekeeping_interval);
    housekeeping.tick().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = housekeeping.tick() => {
                pool.reap();
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => match pool.admit(stream, &handler) {
                    Ok(id) => debug!(session_id = %id, peer_addr = %peer_addr, "Connection accepted"),
                    Err(TelnetError::MaxConnectionsReached(limit)) => {
                        warn!(peer_addr = %peer_addr, limit, "Connection limit reached; rejecting");
                    }
                    Err(error) => {
                        warn!(peer_addr = %peer_addr, error = %error, "Failed to start session");
                    }
                },
                Err(error) => {
                    error!(error = %error, "Accept failed; shutting down");
                    stop.cancel();
                    pool.shutdown().await;
                    break;
                }
            }
        }
    }

    drop(listener);
    info!("Accept loop terminated");
}

impl std::fmt::Debug for TelnetServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetServer")
            .field("bind_address", &self.bind_address)
            .field("running", &self.is_running())
            .field("sessions", &self.pool.len())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for TelnetServer {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("TelnetServer dropped while still running");
        }
        self.stop.cancel();
    }
}
