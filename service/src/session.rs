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

//! Session worker implementation
//!
//! Each accepted connection is driven by one worker task which owns the socket, the
//! negotiation engine and the session's event subscriptions. The worker is responsible
//! for:
//! - The initial option handshake
//! - The receive loop, routing negotiation chunks to the engine and everything else
//!   to subscribers
//! - Serving control messages (application output and administrative requests)
//! - Observing the kill signal and cleaning up
//!
//! Handler setup and every blocking read are raced against the kill signal, so a
//! session reaches [`SessionState::Closed`] promptly once [`SessionHandle::close`] or
//! [`SessionWriter::close`] is called.

use crate::{
    Result, ServerConfig, ServerMetrics, SessionEvent, SessionEventKind, SessionHandler,
    SessionId, SessionState, TelnetError,
};
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use telserv_telnetcodec::{
    EventBus, Negotiator, OptionEvent, OptionState, SubscriberResult, TelnetCommand, TelnetOption,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

/// Units the server offers right after the handshake read.
const HANDSHAKE: [(TelnetCommand, TelnetOption); 3] = [
    (TelnetCommand::Will, TelnetOption::Echo),
    (TelnetCommand::Will, TelnetOption::SuppressGoAhead),
    (TelnetCommand::Do, TelnetOption::NAWS),
];

/// Control messages served by the session worker
#[derive(Debug)]
pub enum ControlMessage {
    /// Write application output to the peer
    Send(Bytes),
    /// Send a single `IAC <command> <option>` unit to the peer
    Negotiate(TelnetCommand, TelnetOption),
    /// Reply with a copy of the session's option state
    DumpOptions(oneshot::Sender<OptionState>),
}

/// Worker timing and buffer settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound on each receive-loop read
    pub read_timeout: Duration,
    /// Bound on the handshake read
    pub negotiation_timeout: Duration,
    /// Bound on each socket write
    pub write_timeout: Duration,
    /// Read buffer size
    pub read_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for SessionConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            read_timeout: config.read_timeout,
            negotiation_timeout: config.negotiation_timeout,
            write_timeout: config.write_timeout,
            read_buffer_size: config.read_buffer_size,
        }
    }
}

/// Cloneable output side of a session, safe to move into subscriber callbacks
#[derive(Debug, Clone)]
pub struct SessionWriter {
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    kill: CancellationToken,
}

impl SessionWriter {
    /// Queue `bytes` for writing to the peer.
    ///
    /// Returns [`TelnetError::SessionClosed`] once the session has been closed.
    pub fn send(&self, bytes: impl Into<Bytes>) -> Result<()> {
        if self.kill.is_cancelled() {
            return Err(TelnetError::SessionClosed);
        }
        self.control_tx
            .send(ControlMessage::Send(bytes.into()))
            .map_err(|_| TelnetError::SessionClosed)
    }

    /// Set the session's kill signal. Does not wait for the worker.
    pub fn close(&self) {
        self.kill.cancel();
    }

    /// Whether the kill signal is set.
    pub fn is_closed(&self) -> bool {
        self.kill.is_cancelled()
    }
}

/// Per-session registration surface handed to [`SessionHandler::on_session`]
pub struct SessionSetup {
    id: SessionId,
    peer_addr: SocketAddr,
    writer: SessionWriter,
    events: EventBus<SessionEventKind, SessionEvent>,
    negotiator: Negotiator,
}

impl SessionSetup {
    fn new(id: SessionId, peer_addr: SocketAddr, writer: SessionWriter) -> Self {
        Self {
            id,
            peer_addr,
            writer,
            events: EventBus::new(),
            negotiator: Negotiator::new(),
        }
    }

    /// The session being set up
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The remote peer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// A writer for this session
    pub fn writer(&self) -> SessionWriter {
        self.writer.clone()
    }

    /// Subscribe to session events of `kind`.
    pub fn on<F>(&mut self, kind: SessionEventKind, callback: F)
    where
        F: FnMut(&SessionEvent) -> SubscriberResult + Send + 'static,
    {
        self.events.subscribe(kind, callback);
    }

    /// Subscribe to changes of `option`.
    pub fn on_option<F>(&mut self, option: TelnetOption, callback: F)
    where
        F: FnMut(&OptionEvent) -> SubscriberResult + Send + 'static,
    {
        self.negotiator.on_option(option, callback);
    }
}

impl std::fmt::Debug for SessionSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSetup")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("events", &self.events)
            .finish()
    }
}

/// An accepted connection that has not been started yet
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,
    stream: TcpStream,
    config: SessionConfig,
    metrics: Arc<ServerMetrics>,
}

impl Session {
    /// Wrap an accepted stream.
    ///
    /// Fails if the peer address cannot be read, which happens when the peer reset the
    /// connection before it was handed over.
    #[instrument(skip(stream, config, metrics), fields(session_id = %id))]
    pub fn new(
        id: SessionId,
        stream: TcpStream,
        config: SessionConfig,
        metrics: Arc<ServerMetrics>,
    ) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;
        debug!(peer_addr = %peer_addr, "Creating session");
        Ok(Self {
            id,
            peer_addr,
            stream,
            config,
            metrics,
        })
    }

    /// The session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The remote peer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Spawn the worker and return its handle immediately.
    ///
    /// The worker first lets `handler` register subscriptions, then performs the
    /// handshake and enters the receive loop.
    pub fn start(self, handler: Arc<dyn SessionHandler>) -> SessionHandle {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let kill = CancellationToken::new();
        let state = Arc::new(AtomicU8::new(SessionState::Connect.as_u8()));
        let writer = SessionWriter {
            control_tx: control_tx.clone(),
            kill: kill.clone(),
        };
        let id = self.id;
        let peer_addr = self.peer_addr;

        self.metrics.session_opened();
        let guard = CloseGuard {
            metrics: self.metrics.clone(),
            state: state.clone(),
            kill: kill.clone(),
            started_at: Instant::now(),
        };
        let worker_state = state.clone();
        let worker_kill = kill.clone();
        let join = tokio::spawn(async move {
            let _guard = guard;
            let mut setup = SessionSetup::new(self.id, self.peer_addr, writer);
            let ready = tokio::select! {
                _ = worker_kill.cancelled() => false,
                _ = handler.on_session(&mut setup) => true,
            };
            if !ready {
                debug!(session_id = %self.id, "Session closed during handler setup");
                worker_state.store(SessionState::Closing.as_u8(), Ordering::Release);
                return;
            }
            let worker = SessionWorker {
                id: self.id,
                peer_addr: self.peer_addr,
                stream: self.stream,
                config: self.config,
                metrics: self.metrics,
                state: worker_state,
                kill: worker_kill,
                control_rx,
                control_open: true,
                negotiator: setup.negotiator,
                events: setup.events,
                buffer: Vec::new(),
                connected: false,
            };
            worker.run().await;
        });

        SessionHandle {
            id,
            peer_addr,
            kill,
            state,
            control_tx,
            join,
            created_at: Instant::now(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}

/// Owner's view of a running session
pub struct SessionHandle {
    id: SessionId,
    peer_addr: SocketAddr,
    kill: CancellationToken,
    state: Arc<AtomicU8>,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    join: JoinHandle<()>,
    created_at: Instant,
}

impl SessionHandle {
    /// The session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The remote peer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// When the session was started
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set the kill signal. Does not wait for the worker.
    pub fn close(&self) {
        self.kill.cancel();
    }

    /// Whether the kill signal is set.
    pub fn is_closed(&self) -> bool {
        self.kill.is_cancelled()
    }

    /// Whether the worker task has returned.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// A writer for this session
    pub fn writer(&self) -> SessionWriter {
        SessionWriter {
            control_tx: self.control_tx.clone(),
            kill: self.kill.clone(),
        }
    }

    /// Queue a control message for the worker.
    pub fn send_control(&self, message: ControlMessage) -> Result<()> {
        if self.kill.is_cancelled() {
            return Err(TelnetError::SessionClosed);
        }
        self.control_tx
            .send(message)
            .map_err(|_| TelnetError::SessionClosed)
    }

    /// Handle that can abort the worker without consuming this handle
    pub fn abort_handle(&self) -> AbortHandle {
        self.join.abort_handle()
    }

    /// Wait for the worker to return.
    ///
    /// Must not be called again once it has returned. The state is `Closed` afterwards,
    /// including for a worker that panicked or was aborted.
    pub async fn join(&mut self) {
        if let Err(error) = (&mut self.join).await {
            if error.is_panic() {
                warn!(session_id = %self.id, "Session worker panicked");
            }
        }
    }

    /// Close the session and wait for its worker, aborting it after `limit`.
    ///
    /// The state is `Closed` when this returns.
    pub async fn close_and_join(&mut self, limit: Duration) {
        self.close();
        if timeout(limit, self.join()).await.is_err() {
            warn!(session_id = %self.id, "Session worker did not stop in time; aborting");
            self.force_closed().await;
        }
    }

    /// Abort a worker that has not been joined yet and wait for it.
    pub(crate) async fn force_closed(&mut self) {
        self.join.abort();
        self.join().await;
    }
}

/// Owned by the worker future. Dropping it, whether the worker returned, panicked or
/// was aborted, sets the kill signal, records the close and marks the session `Closed`.
struct CloseGuard {
    metrics: Arc<ServerMetrics>,
    state: Arc<AtomicU8>,
    kill: CancellationToken,
    started_at: Instant,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.kill.cancel();
        self.metrics.session_closed(self.started_at.elapsed());
        self.state
            .store(SessionState::Closed.as_u8(), Ordering::Release);
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Task-local state of a running session
struct SessionWorker {
    id: SessionId,
    peer_addr: SocketAddr,
    stream: TcpStream,
    config: SessionConfig,
    metrics: Arc<ServerMetrics>,
    state: Arc<AtomicU8>,
    kill: CancellationToken,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    control_open: bool,
    negotiator: Negotiator,
    events: EventBus<SessionEventKind, SessionEvent>,
    buffer: Vec<u8>,
    connected: bool,
}

impl SessionWorker {
    fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    #[instrument(skip(self), fields(session_id = %self.id, peer_addr = %self.peer_addr))]
    async fn run(mut self) {
        self.buffer = vec![0; self.config.read_buffer_size];
        self.set_state(SessionState::Negotiating);

        let result = match self.handshake().await {
            Ok(Some(pending)) => {
                self.set_state(SessionState::Active);
                self.connected = true;
                info!("Session active");
                self.publish(SessionEvent::Connect);
                if !pending.is_empty() {
                    self.publish(SessionEvent::Data(pending));
                }
                self.receive_loop().await
            }
            Ok(None) => Ok(()),
            Err(error) => Err(error),
        };

        if let Err(error) = result {
            debug!(error = %error, "Session ended with error");
        }
        self.finish().await;
    }

    /// Performs the handshake read and sends the server's offers.
    ///
    /// Returns the payload read during the handshake that was not negotiation, or
    /// `None` if the peer closed or the session was killed first.
    async fn handshake(&mut self) -> Result<Option<Bytes>> {
        let read = tokio::select! {
            _ = self.kill.cancelled() => return Ok(None),
            read = timeout(self.config.negotiation_timeout, self.stream.read(&mut self.buffer)) => read,
        };

        let mut pending = Bytes::new();
        match read {
            Err(_) => trace!("No negotiation from peer before timeout"),
            Ok(Ok(0)) => {
                debug!("Peer closed during handshake");
                return Ok(None);
            }
            Ok(Ok(n)) => {
                self.metrics.bytes_received(n as u64);
                let chunk = Bytes::copy_from_slice(&self.buffer[..n]);
                if Negotiator::is_negotiation(&chunk) {
                    self.negotiate(&chunk).await?;
                } else {
                    pending = chunk;
                }
            }
            Ok(Err(error)) => return Err(error.into()),
        }

        let mut offers = BytesMut::new();
        Negotiator::request_all(&HANDSHAKE, &mut offers);
        self.write(&offers).await?;
        Ok(Some(pending))
    }

    async fn receive_loop(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.kill.cancelled() => {
                    debug!("Kill signal observed");
                    return Ok(());
                }
                message = self.control_rx.recv(), if self.control_open => {
                    match message {
                        Some(message) => self.control(message).await?,
                        None => self.control_open = false,
                    }
                }
                read = timeout(self.config.read_timeout, self.stream.read(&mut self.buffer)) => {
                    match read {
                        Err(_) => continue,
                        Ok(Ok(0)) => {
                            debug!("Peer closed connection");
                            return Ok(());
                        }
                        Ok(Ok(n)) => {
                            self.metrics.bytes_received(n as u64);
                            let chunk = Bytes::copy_from_slice(&self.buffer[..n]);
                            if Negotiator::is_negotiation(&chunk) {
                                self.negotiate(&chunk).await?;
                            } else {
                                self.publish(SessionEvent::Data(chunk));
                            }
                        }
                        Ok(Err(error)) => {
                            debug!(error = %error, "Read failed");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn control(&mut self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::Send(bytes) => self.write(&bytes).await,
            ControlMessage::Negotiate(command, option) => {
                trace!(command = %command, option = %option, "Sending requested unit");
                self.write(&Negotiator::request(command, option)).await
            }
            ControlMessage::DumpOptions(reply) => {
                let _ = reply.send(self.negotiator.options().clone());
                Ok(())
            }
        }
    }

    /// Runs the engine over `chunk` and writes back any replies. Decode failures are
    /// logged and counted; only write failures end the session.
    async fn negotiate(&mut self, chunk: &[u8]) -> Result<()> {
        let faults = self.negotiator.subscriber_faults();
        let mut replies = BytesMut::new();
        match self.negotiator.negotiate(chunk, &mut replies) {
            Ok(consumed) => trace!(consumed, len = chunk.len(), "Negotiated"),
            Err(error) => {
                warn!(error = %error, "Negotiation decode failed");
                self.metrics.negotiation_error();
            }
        }
        self.metrics
            .subscriber_faults(self.negotiator.subscriber_faults() - faults);
        if !replies.is_empty() {
            self.write(&replies).await?;
        }
        Ok(())
    }

    fn publish(&mut self, event: SessionEvent) {
        let report = self.events.publish(&event.kind(), &event);
        self.metrics.subscriber_faults(report.failed as u64);
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        tokio::select! {
            _ = self.kill.cancelled() => Err(TelnetError::SessionClosed),
            written = timeout(self.config.write_timeout, self.stream.write_all(bytes)) => {
                match written {
                    Ok(Ok(())) => {
                        self.metrics.bytes_sent(bytes.len() as u64);
                        Ok(())
                    }
                    Ok(Err(error)) => Err(error.into()),
                    Err(_) => Err(TelnetError::Timeout),
                }
            }
        }
    }

    async fn finish(mut self) {
        self.set_state(SessionState::Closing);
        if self.connected {
            self.publish(SessionEvent::Disconnect);
        }
        if let Err(error) = self.stream.shutdown().await {
            trace!(error = %error, "Socket shutdown failed");
        }
        self.kill.cancel();
        info!("Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tracing_test::traced_test;

    struct Recorder {
        events: Arc<Mutex<Vec<SessionEvent>>>,
    }

    #[async_trait]
    impl SessionHandler for Recorder {
        async fn on_session(&self, setup: &mut SessionSetup) {
            for kind in [
                SessionEventKind::Connect,
                SessionEventKind::Data,
                SessionEventKind::Disconnect,
            ] {
                let events = self.events.clone();
                setup.on(kind, move |event| {
                    events.lock().unwrap().push(event.clone());
                    Ok(())
                });
            }
        }
    }

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server, _) = listener.accept().await.unwrap();
        (server, client.await.unwrap())
    }

    fn quick_config() -> SessionConfig {
        SessionConfig {
            read_timeout: Duration::from_millis(50),
            negotiation_timeout: Duration::from_millis(50),
            write_timeout: Duration::from_secs(1),
            read_buffer_size: 1024,
        }
    }

    async fn wait_for_state(handle: &SessionHandle, state: SessionState) {
        for _ in 0..100 {
            if handle.state() == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session never reached {state}, stuck in {}", handle.state());
    }

    #[tokio::test]
    async fn test_handshake_offers_and_connect() {
        let (server, mut client) = pair().await;
        let events = Arc::new(Mutex::new(Vec::new()));
        let session = Session::new(
            SessionId::new(1),
            server,
            quick_config(),
            Arc::new(ServerMetrics::new()),
        )
        .unwrap();
        let mut handle = session.start(Arc::new(Recorder {
            events: events.clone(),
        }));

        let mut offers = [0u8; 9];
        client.read_exact(&mut offers).await.unwrap();
        assert_eq!(
            offers,
            [0xFF, 0xFB, 0x01, 0xFF, 0xFB, 0x03, 0xFF, 0xFD, 0x1F]
        );

        wait_for_state(&handle, SessionState::Active).await;
        client.write_all(b"hello").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        handle.close_and_join(Duration::from_secs(1)).await;
        assert_eq!(handle.state(), SessionState::Closed);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                SessionEvent::Connect,
                SessionEvent::Data(Bytes::from_static(b"hello")),
                SessionEvent::Disconnect,
            ]
        );
    }

    #[tokio::test]
    async fn test_peer_close_during_handshake() {
        let (server, client) = pair().await;
        let events = Arc::new(Mutex::new(Vec::new()));
        let session = Session::new(
            SessionId::new(2),
            server,
            quick_config(),
            Arc::new(ServerMetrics::new()),
        )
        .unwrap();
        drop(client);
        let mut handle = session.start(Arc::new(Recorder {
            events: events.clone(),
        }));

        handle.join().await;
        assert_eq!(handle.state(), SessionState::Closed);
        assert!(handle.is_closed());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_writer_and_dump_options() {
        let (server, mut client) = pair().await;
        let session = Session::new(
            SessionId::new(3),
            server,
            SessionConfig {
                negotiation_timeout: Duration::from_secs(2),
                ..quick_config()
            },
            Arc::new(ServerMetrics::new()),
        )
        .unwrap();
        let mut handle = session.start(Arc::new(Recorder {
            events: Arc::new(Mutex::new(Vec::new())),
        }));

        client.write_all(&[0xFF, 0xFD, 0x01]).await.unwrap();
        let mut offers = [0u8; 9];
        client.read_exact(&mut offers).await.unwrap();
        wait_for_state(&handle, SessionState::Active).await;

        handle.writer().send("ready\r\n").unwrap();
        let mut line = [0u8; 7];
        client.read_exact(&mut line).await.unwrap();
        assert_eq!(&line, b"ready\r\n");

        let (tx, rx) = oneshot::channel();
        handle.send_control(ControlMessage::DumpOptions(tx)).unwrap();
        let options = rx.await.unwrap();
        assert_eq!(options.get(TelnetOption::Echo), Some(true));

        let writer = handle.writer();
        writer.close();
        assert!(writer.is_closed());
        assert!(writer.send("late").is_err());
        handle.join().await;
        assert_eq!(handle.state(), SessionState::Closed);
    }

    struct SlowSetup;

    #[async_trait]
    impl SessionHandler for SlowSetup {
        async fn on_session(&self, _setup: &mut SessionSetup) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }

    struct PanickingSetup;

    #[async_trait]
    impl SessionHandler for PanickingSetup {
        async fn on_session(&self, _setup: &mut SessionSetup) {
            panic!("setup bug");
        }
    }

    #[tokio::test]
    async fn test_close_during_slow_setup() {
        let (server, _client) = pair().await;
        let metrics = Arc::new(ServerMetrics::new());
        let session = Session::new(SessionId::new(4), server, quick_config(), metrics.clone())
            .unwrap();
        let mut handle = session.start(Arc::new(SlowSetup));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.state(), SessionState::Connect);

        handle.close();
        wait_for_state(&handle, SessionState::Closed).await;
        timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("worker did not exit after close");
        assert_eq!(metrics.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_aborted_worker_records_close() {
        let (server, _client) = pair().await;
        let metrics = Arc::new(ServerMetrics::new());
        let session = Session::new(SessionId::new(5), server, quick_config(), metrics.clone())
            .unwrap();
        let mut handle = session.start(Arc::new(SlowSetup));
        assert_eq!(metrics.active_sessions(), 1);

        handle.force_closed().await;
        assert_eq!(handle.state(), SessionState::Closed);
        assert!(handle.is_closed());
        assert_eq!(metrics.active_sessions(), 0);
        assert_eq!(metrics.total_sessions(), 1);
    }

    #[tokio::test]
    async fn test_panicked_worker_records_close() {
        let (server, _client) = pair().await;
        let metrics = Arc::new(ServerMetrics::new());
        let session = Session::new(SessionId::new(6), server, quick_config(), metrics.clone())
            .unwrap();
        let mut handle = session.start(Arc::new(PanickingSetup));

        handle.join().await;
        assert_eq!(handle.state(), SessionState::Closed);
        assert_eq!(metrics.active_sessions(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_malformed_subnegotiation_is_counted() {
        let (server, mut client) = pair().await;
        let metrics = Arc::new(ServerMetrics::new());
        let (_control_tx, control_rx) = mpsc::unbounded_channel();
        let mut worker = SessionWorker {
            id: SessionId::new(7),
            peer_addr: client.local_addr().unwrap(),
            stream: server,
            config: quick_config(),
            metrics: metrics.clone(),
            state: Arc::new(AtomicU8::new(SessionState::Active.as_u8())),
            kill: CancellationToken::new(),
            control_rx,
            control_open: true,
            negotiator: Negotiator::new(),
            events: EventBus::new(),
            buffer: vec![0; 64],
            connected: true,
        };

        worker
            .negotiate(&[0xFF, 0xFA, 0x18, 0x00, 0x01])
            .await
            .unwrap();
        assert_eq!(metrics.snapshot().negotiation_errors, 1);
        assert!(logs_contain("Negotiation decode failed"));

        worker.negotiate(&[0xFF, 0xFB, 0x01]).await.unwrap();
        let mut reply = [0u8; 3];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [0xFF, 0xFD, 0x01]);
        assert_eq!(worker.negotiator.options().get(TelnetOption::Echo), Some(true));
        assert_eq!(metrics.snapshot().negotiation_errors, 1);
    }
}
