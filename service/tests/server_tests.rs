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

//! End-to-end tests for the telserv-service crate over loopback TCP

use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telserv_service::{
    AdminCommand, CallbackHandler, ServerConfig, SessionEvent, SessionEventKind, SessionHandler,
    SessionSetup, SessionState, TelnetError, TelnetServer,
};
use telserv_telnetcodec::{OptionEvent, OptionValue, TelnetOption, WindowSize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const OFFERS: [u8; 9] = [0xFF, 0xFB, 0x01, 0xFF, 0xFB, 0x03, 0xFF, 0xFD, 0x1F];

fn test_config() -> ServerConfig {
    ServerConfig::new("127.0.0.1", 0)
        .with_read_timeout(Duration::from_millis(50))
        .with_negotiation_timeout(Duration::from_millis(100))
        .with_housekeeping_interval(Duration::from_millis(50))
        .with_shutdown_timeout(Duration::from_secs(2))
}

async fn start_server(config: ServerConfig, handler: Arc<dyn SessionHandler>) -> TelnetServer {
    let server = TelnetServer::bind(config).await.unwrap();
    server.start(handler).await.unwrap();
    server
}

/// Connect and consume the server's handshake offers.
async fn connect(server: &TelnetServer) -> TcpStream {
    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    let mut offers = [0u8; 9];
    timeout(Duration::from_secs(2), client.read_exact(&mut offers))
        .await
        .expect("handshake timed out")
        .unwrap();
    assert_eq!(offers, OFFERS);
    client
}

async fn eventually<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

async fn wait_active(server: &TelnetServer, count: usize) {
    let pool = server.pool();
    eventually("sessions to become active", || {
        let sessions = pool.sessions();
        sessions.len() == count && sessions.iter().all(|info| info.state == SessionState::Active)
    })
    .await;
}

#[tokio::test]
async fn test_handshake_offers() {
    let server = start_server(test_config(), Arc::new(CallbackHandler::new())).await;
    let _client = connect(&server).await;
    wait_active(&server, 1).await;
    server.stop().await;
}

#[tokio::test]
async fn test_early_negotiation_is_answered_before_offers() {
    let server = start_server(
        test_config().with_negotiation_timeout(Duration::from_secs(2)),
        Arc::new(CallbackHandler::new()),
    )
    .await;

    let mut client = TcpStream::connect(server.bind_address()).await.unwrap();
    client.write_all(&[0xFF, 0xFB, 0x1F]).await.unwrap();

    let mut received = [0u8; 12];
    client.read_exact(&mut received).await.unwrap();
    assert_eq!(&received[..3], &[0xFF, 0xFD, 0x1F]);
    assert_eq!(&received[3..], &OFFERS);

    server.stop().await;
}

#[tokio::test]
async fn test_data_and_option_events() {
    let data = Arc::new(Mutex::new(Vec::<Bytes>::new()));
    let options = Arc::new(Mutex::new(Vec::<OptionEvent>::new()));
    let disconnects = Arc::new(Mutex::new(0usize));

    let handler = {
        let data = data.clone();
        let options = options.clone();
        let disconnects = disconnects.clone();
        CallbackHandler::new()
            .with_on_data(move |_, writer, bytes| {
                data.lock().unwrap().push(bytes.clone());
                let _ = writer.send(bytes.clone());
            })
            .with_on_option(move |_, event| options.lock().unwrap().push(event.clone()))
            .with_on_disconnect(move |_| *disconnects.lock().unwrap() += 1)
    };
    let server = start_server(test_config(), Arc::new(handler)).await;
    let mut client = connect(&server).await;
    wait_active(&server, 1).await;

    client
        .write_all(&[
            0xFF, 0xFB, 0x1F, 0xFF, 0xFA, 0x1F, 0x00, 0x50, 0x00, 0x18, 0xFF, 0xF0,
        ])
        .await
        .unwrap();
    let mut reply = [0u8; 3];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [0xFF, 0xFD, 0x1F]);

    client.write_all(b"look\r\n").await.unwrap();
    let mut echoed = [0u8; 6];
    client.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"look\r\n");

    assert_eq!(*data.lock().unwrap(), vec![Bytes::from_static(b"look\r\n")]);
    assert_eq!(
        *options.lock().unwrap(),
        vec![
            OptionEvent::enabled(TelnetOption::NAWS, true),
            OptionEvent {
                option: TelnetOption::NAWS,
                value: OptionValue::WindowSize(WindowSize::new(80, 24)),
            },
        ]
    );

    let pool = server.pool();
    let id = pool.id_at(0).unwrap();
    let state = pool.option_state(id).await.unwrap();
    assert_eq!(state.get(TelnetOption::NAWS), Some(true));
    assert_eq!(state.window_size(), &WindowSize::new(80, 24));

    server.stop().await;
    assert_eq!(*disconnects.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_option_is_ignored() {
    let server = start_server(test_config(), Arc::new(CallbackHandler::new())).await;
    let mut client = connect(&server).await;
    wait_active(&server, 1).await;

    client.write_all(&[0xFF, 0xFB, 0x63]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let pool = server.pool();
    let state = pool.option_state(pool.id_at(0).unwrap()).await.unwrap();
    assert!(state.is_empty());
    assert_eq!(server.metrics().snapshot().negotiation_errors, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_subnegotiation_keeps_session_open() {
    let data = Arc::new(Mutex::new(Vec::<Bytes>::new()));
    let handler = {
        let data = data.clone();
        CallbackHandler::new().with_on_data(move |_, _, bytes| data.lock().unwrap().push(bytes.clone()))
    };
    let server = start_server(test_config(), Arc::new(handler)).await;
    let mut client = connect(&server).await;
    wait_active(&server, 1).await;

    client.write_all(&[0xFF, 0xFA, 0x18, 0x00, 0x01]).await.unwrap();
    let metrics = server.metrics();
    eventually("decode failure to be counted", || {
        metrics.snapshot().negotiation_errors == 1
    })
    .await;
    assert_eq!(server.pool().sessions()[0].state, SessionState::Active);

    client.write_all(b"hi").await.unwrap();
    eventually("data after the failure", || !data.lock().unwrap().is_empty()).await;
    assert_eq!(*data.lock().unwrap(), vec![Bytes::from_static(b"hi")]);
    assert_eq!(server.pool().len(), 1);

    server.stop().await;
}

struct Faulty {
    delivered: Arc<Mutex<usize>>,
}

#[async_trait::async_trait]
impl SessionHandler for Faulty {
    async fn on_session(&self, setup: &mut SessionSetup) {
        setup.on(SessionEventKind::Data, |_| panic!("subscriber bug"));
        setup.on(SessionEventKind::Data, |_| Err("refused".into()));
        let delivered = self.delivered.clone();
        setup.on(SessionEventKind::Data, move |event| {
            if let SessionEvent::Data(_) = event {
                *delivered.lock().unwrap() += 1;
            }
            Ok(())
        });
    }
}

#[tokio::test]
async fn test_subscriber_faults_are_isolated() {
    let delivered = Arc::new(Mutex::new(0usize));
    let server = start_server(
        test_config(),
        Arc::new(Faulty {
            delivered: delivered.clone(),
        }),
    )
    .await;
    let mut client = connect(&server).await;
    wait_active(&server, 1).await;

    client.write_all(b"one").await.unwrap();
    eventually("first delivery", || *delivered.lock().unwrap() == 1).await;
    client.write_all(b"two").await.unwrap();
    eventually("second delivery", || *delivered.lock().unwrap() == 2).await;

    let pool = server.pool();
    assert_eq!(pool.sessions()[0].state, SessionState::Active);
    let metrics = server.metrics();
    eventually("fault accounting", || metrics.snapshot().subscriber_faults == 4).await;

    server.stop().await;
}

#[tokio::test]
async fn test_kick_while_blocked_in_read() {
    let server = start_server(
        test_config().with_read_timeout(Duration::from_secs(30)),
        Arc::new(CallbackHandler::new()),
    )
    .await;
    let mut client = connect(&server).await;
    wait_active(&server, 1).await;

    let output = timeout(
        Duration::from_secs(5),
        server.execute(AdminCommand::Kick { index: 0 }),
    )
    .await
    .expect("kick did not finish")
    .unwrap();
    assert!(output.starts_with("kicked session-"));
    assert!(server.pool().is_empty());

    let mut rest = Vec::new();
    assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);

    server.stop().await;
}

#[tokio::test]
async fn test_reaper_removes_disconnected_session() {
    let server = start_server(test_config(), Arc::new(CallbackHandler::new())).await;
    let gone = connect(&server).await;
    let _stays = connect(&server).await;
    wait_active(&server, 2).await;

    let pool = server.pool();
    let gone_id = pool.id_at(0).unwrap();
    let stays_id = pool.id_at(1).unwrap();
    drop(gone);

    eventually("reaper sweep", || pool.len() == 1).await;
    assert!(!pool.contains(gone_id));
    assert!(pool.contains(stays_id));

    server.stop().await;
}

#[tokio::test]
async fn test_stop_closes_everything() {
    let server = start_server(
        test_config().with_read_timeout(Duration::from_secs(30)),
        Arc::new(CallbackHandler::new()),
    )
    .await;
    let address = server.bind_address();
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(connect(&server).await);
    }
    wait_active(&server, 3).await;

    timeout(Duration::from_secs(5), server.stop())
        .await
        .expect("stop did not return");
    assert!(server.pool().is_empty());
    assert!(!server.is_running());
    assert_eq!(server.metrics().active_sessions(), 0);

    for mut client in clients {
        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).await.unwrap(), 0);
    }
    assert!(TcpStream::connect(address).await.is_err());

    timeout(Duration::from_secs(1), server.stop())
        .await
        .expect("second stop did not return");
}

#[tokio::test]
async fn test_connection_limit() {
    let server = start_server(
        test_config().with_max_connections(1),
        Arc::new(CallbackHandler::new()),
    )
    .await;
    let _first = connect(&server).await;
    wait_active(&server, 1).await;

    let mut second = TcpStream::connect(server.bind_address()).await.unwrap();
    let mut rest = Vec::new();
    let read = timeout(Duration::from_secs(2), second.read_to_end(&mut rest))
        .await
        .expect("rejected connection was not dropped");
    assert!(read.map(|n| n == 0).unwrap_or(true));
    assert_eq!(server.metrics().rejected_sessions(), 1);
    assert_eq!(server.pool().len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_admin_commands() {
    let server = start_server(test_config(), Arc::new(CallbackHandler::new())).await;
    let mut client = connect(&server).await;
    wait_active(&server, 1).await;

    let listing = server.execute("clients".parse().unwrap()).await.unwrap();
    assert!(listing.starts_with("[0] session-1 "));
    assert!(listing.contains(" active "));

    client.write_all(&[0xFF, 0xFD, 0x01]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let dump = server.execute("opts 0".parse().unwrap()).await.unwrap();
    assert!(dump.contains("I WILL ECHO"));
    assert!(dump.contains("window_size: (0,0)"));

    let sent = server
        .execute("iac 0 do ttype".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(sent, "sent ff:fd:18");
    let mut unit = [0u8; 3];
    client.read_exact(&mut unit).await.unwrap();
    assert_eq!(unit, [0xFF, 0xFD, 0x18]);

    assert!(matches!(
        server.execute(AdminCommand::Opts { index: 5 }).await,
        Err(TelnetError::IndexOutOfRange(5))
    ));

    let stopped = server.execute(AdminCommand::Stop).await.unwrap();
    assert_eq!(stopped, "stopped");
    assert!(server.pool().is_empty());
    assert_eq!(
        server.execute(AdminCommand::Clients).await.unwrap(),
        "no sessions"
    );
}
