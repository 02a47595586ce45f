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

//! Session pool implementation
//!
//! The SessionPool is responsible for:
//! - Admitting accepted connections and starting their workers
//! - Tracking every live session by ID
//! - Reaping sessions whose workers have finished or been killed
//! - Routing administrative requests to individual sessions
//! - Closing and joining every session on shutdown

use crate::{
    ControlMessage, Result, ServerConfig, ServerMetrics, Session, SessionConfig, SessionHandle,
    SessionHandler, SessionId, SessionInfo, TelnetError,
};
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use telserv_telnetcodec::{Negotiator, OptionState, TelnetCommand, TelnetOption};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

/// Concurrent set of running sessions, ordered by accept order
pub struct SessionPool {
    /// Live sessions (lock-free concurrent map)
    sessions: DashMap<SessionId, SessionHandle>,
    /// Next session ID (monotonically increasing)
    next_id: AtomicU64,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Server configuration
    config: ServerConfig,
}

impl SessionPool {
    /// Create an empty pool
    pub fn new(config: ServerConfig, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            metrics,
            config,
        }
    }

    fn next_session_id(&self) -> SessionId {
        SessionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Start a session for an accepted stream and track it.
    ///
    /// When the pool is full, dead entries are reaped first; if it is still full the
    /// stream is dropped and [`TelnetError::MaxConnectionsReached`] returned.
    pub fn admit(&self, stream: TcpStream, handler: &Arc<dyn SessionHandler>) -> Result<SessionId> {
        let limit = self.config.max_connections;
        if self.sessions.len() >= limit && {
            self.reap();
            self.sessions.len() >= limit
        } {
            self.metrics.session_rejected();
            return Err(TelnetError::MaxConnectionsReached(limit));
        }

        let id = self.next_session_id();
        let session = Session::new(
            id,
            stream,
            SessionConfig::from(&self.config),
            self.metrics.clone(),
        )?;
        let handle = session.start(handler.clone());
        self.sessions.insert(id, handle);
        Ok(id)
    }

    /// Remove every entry whose worker has finished or whose kill signal is set.
    ///
    /// Returns the number of entries removed. Live entries are untouched.
    pub fn reap(&self) -> usize {
        let dead: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| Self::is_dead(entry.value()))
            .map(|entry| *entry.key())
            .collect();

        let reaped = dead
            .into_iter()
            .filter(|id| {
                self.sessions
                    .remove_if(id, |_, handle| Self::is_dead(handle))
                    .is_some()
            })
            .count();
        if reaped > 0 {
            debug!(reaped, remaining = self.sessions.len(), "Reaped sessions");
        }
        reaped
    }

    fn is_dead(handle: &SessionHandle) -> bool {
        handle.is_finished() || handle.is_closed()
    }

    /// Number of pooled sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Check if a session is pooled
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Describe every pooled session, in accept order.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|entry| SessionInfo {
                index: 0,
                id: entry.id(),
                peer_addr: entry.peer_addr(),
                state: entry.state(),
                created_at: entry.created_at(),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        for (index, info) in infos.iter_mut().enumerate() {
            info.index = index;
        }
        infos
    }

    /// The ID listed at `index` by [`SessionPool::sessions`]
    pub fn id_at(&self, index: usize) -> Option<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids.get(index).copied()
    }

    fn control(&self, id: SessionId, message: ControlMessage) -> Result<()> {
        self.sessions
            .get(&id)
            .ok_or(TelnetError::SessionNotFound(id))?
            .send_control(message)
    }

    /// Queue application output for a session
    pub fn send(&self, id: SessionId, bytes: impl Into<Bytes>) -> Result<()> {
        self.control(id, ControlMessage::Send(bytes.into()))
    }

    /// Send one `IAC <command> <option>` unit to a session.
    ///
    /// Returns the encoded unit.
    pub fn negotiate(
        &self,
        id: SessionId,
        command: TelnetCommand,
        option: TelnetOption,
    ) -> Result<[u8; 3]> {
        self.control(id, ControlMessage::Negotiate(command, option))?;
        Ok(Negotiator::request(command, option))
    }

    /// Snapshot of a session's negotiated options, taken on its worker
    pub async fn option_state(&self, id: SessionId) -> Result<OptionState> {
        let (tx, rx) = oneshot::channel();
        self.control(id, ControlMessage::DumpOptions(tx))?;
        rx.await.map_err(|_| TelnetError::SessionClosed)
    }

    /// Human-readable dump of a session's negotiated options
    pub async fn dump_options(&self, id: SessionId) -> Result<String> {
        Ok(self.option_state(id).await?.to_string())
    }

    /// Kill a session, wait for its worker and remove it.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn kick(&self, id: SessionId) -> Result<()> {
        let (_, mut handle) = self
            .sessions
            .remove(&id)
            .ok_or(TelnetError::SessionNotFound(id))?;
        handle.close_and_join(self.config.shutdown_timeout).await;
        info!(state = %handle.state(), "Session kicked");
        Ok(())
    }

    /// Close every session, join every worker and empty the pool.
    ///
    /// Workers still running after the shutdown timeout are aborted. Every drained
    /// session is `Closed` when this returns.
    pub async fn shutdown(&self) {
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let mut handles: Vec<SessionHandle> = ids
            .into_iter()
            .filter_map(|id| self.sessions.remove(&id).map(|(_, handle)| handle))
            .collect();
        if handles.is_empty() {
            return;
        }

        info!(count = handles.len(), "Closing sessions");
        for handle in &handles {
            handle.close();
        }

        let joined = tokio::time::timeout(
            self.config.shutdown_timeout,
            join_all(handles.iter_mut().map(|handle| handle.join())),
        )
        .await;

        if joined.is_err() {
            for handle in handles.iter_mut().filter(|handle| !handle.is_finished()) {
                warn!(session_id = %handle.id(), "Session worker did not stop in time; aborting");
                handle.force_closed().await;
            }
        }
        debug!("All sessions closed");
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("sessions", &self.sessions.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionSetup;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    struct Silent;

    #[async_trait]
    impl SessionHandler for Silent {
        async fn on_session(&self, _setup: &mut SessionSetup) {}
    }

    fn test_config() -> ServerConfig {
        ServerConfig::default()
            .with_read_timeout(Duration::from_millis(50))
            .with_negotiation_timeout(Duration::from_millis(50))
            .with_max_connections(2)
    }

    async fn connect(pool: &SessionPool, handler: &Arc<dyn SessionHandler>) -> (SessionId, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let id = pool.admit(server, handler).unwrap();
        (id, client)
    }

    #[tokio::test]
    async fn test_admit_and_enumerate() {
        let pool = SessionPool::new(test_config(), Arc::new(ServerMetrics::new()));
        let handler: Arc<dyn SessionHandler> = Arc::new(Silent);

        let (first, _c1) = connect(&pool, &handler).await;
        let (second, _c2) = connect(&pool, &handler).await;
        assert!(first < second);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.id_at(0), Some(first));
        assert_eq!(pool.id_at(1), Some(second));
        assert_eq!(pool.id_at(2), None);

        let infos = pool.sessions();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].index, 0);
        assert_eq!(infos[1].id, second);

        pool.shutdown().await;
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_admit_rejects_when_full() {
        let metrics = Arc::new(ServerMetrics::new());
        let pool = SessionPool::new(test_config(), metrics.clone());
        let handler: Arc<dyn SessionHandler> = Arc::new(Silent);

        let _a = connect(&pool, &handler).await;
        let _b = connect(&pool, &handler).await;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let result = pool.admit(server, &handler);
        assert!(matches!(result, Err(TelnetError::MaxConnectionsReached(2))));
        assert_eq!(metrics.rejected_sessions(), 1);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_reap_removes_only_dead_entry() {
        let pool = SessionPool::new(test_config(), Arc::new(ServerMetrics::new()));
        let handler: Arc<dyn SessionHandler> = Arc::new(Silent);

        let (dead, _c1) = connect(&pool, &handler).await;
        let (live, _c2) = connect(&pool, &handler).await;

        pool.sessions.get(&dead).unwrap().close();
        assert_eq!(pool.reap(), 1);
        assert!(!pool.contains(dead));
        assert!(pool.contains(live));
        assert_eq!(pool.reap(), 0);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_kick_closes_blocked_session() {
        let pool = SessionPool::new(
            test_config().with_read_timeout(Duration::from_secs(30)),
            Arc::new(ServerMetrics::new()),
        );
        let handler: Arc<dyn SessionHandler> = Arc::new(Silent);
        let (id, mut client) = connect(&pool, &handler).await;

        let mut offers = [0u8; 9];
        client.read_exact(&mut offers).await.unwrap();

        let started = std::time::Instant::now();
        pool.kick(id).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!pool.contains(id));

        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);
        assert!(matches!(
            pool.kick(id).await,
            Err(TelnetError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_routing() {
        let pool = SessionPool::new(test_config(), Arc::new(ServerMetrics::new()));
        let handler: Arc<dyn SessionHandler> = Arc::new(Silent);
        let (id, mut client) = connect(&pool, &handler).await;

        let mut offers = [0u8; 9];
        client.read_exact(&mut offers).await.unwrap();

        let unit = pool
            .negotiate(id, TelnetCommand::Do, TelnetOption::TTYPE)
            .unwrap();
        assert_eq!(unit, [0xFF, 0xFD, 0x18]);
        let mut received = [0u8; 3];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(received, unit);

        let options = pool.option_state(id).await.unwrap();
        assert!(options.is_empty());
        assert!(pool.dump_options(id).await.unwrap().starts_with("<OptionState>"));

        let missing = SessionId::new(999);
        assert!(matches!(
            pool.send(missing, "x"),
            Err(TelnetError::SessionNotFound(_))
        ));

        pool.shutdown().await;
    }
}
