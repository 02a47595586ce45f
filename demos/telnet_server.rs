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

//! Echo Server with Operator Console
//!
//! This example runs a telnet echo server on port 2323 and reads operator commands
//! from standard input:
//!
//! - `clients` lists connected sessions
//! - `opts <index>` dumps a session's negotiated options
//! - `iac <index> <do|dont|will|wont> <option>` sends a negotiation unit
//! - `kick <index>` disconnects a session
//! - `stop` shuts the server down
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p telserv-service --example telnet_server
//! telnet localhost 2323
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use telserv_service::{
    AdminCommand, ServerConfig, SessionEvent, SessionEventKind, SessionHandler, SessionSetup,
    TelnetServer,
};
use telserv_telnetcodec::TelnetOption;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::new("127.0.0.1", 2323).with_max_connections(100);
    let server = TelnetServer::bind(config).await?;
    server.start(Arc::new(EchoHandler)).await?;

    println!("Listening on {}", server.bind_address());
    println!("Commands: clients | opts <n> | iac <n> <cmd> <opt> | kick <n> | stop");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<AdminCommand>() {
                    Ok(command) => {
                        let stop = command == AdminCommand::Stop;
                        match server.execute(command).await {
                            Ok(output) => println!("{}", output.trim_end()),
                            Err(e) => println!("error: {e}"),
                        }
                        if stop {
                            break;
                        }
                    }
                    Err(e) => println!("error: {e}"),
                }
            }
        }
    }

    server.stop().await;
    println!("{}", server.metrics().snapshot());
    Ok(())
}

/// Greets each session and echoes everything it sends
struct EchoHandler;

#[async_trait]
impl SessionHandler for EchoHandler {
    async fn on_session(&self, setup: &mut SessionSetup) {
        let id = setup.id();

        let writer = setup.writer();
        setup.on(SessionEventKind::Connect, move |_| {
            tracing::info!(session_id = %id, "Client connected");
            writer.send("Welcome to the TelServ echo server.\r\n")?;
            Ok(())
        });

        let writer = setup.writer();
        setup.on(SessionEventKind::Data, move |event| {
            if let SessionEvent::Data(bytes) = event {
                writer.send(bytes.clone())?;
            }
            Ok(())
        });

        setup.on(SessionEventKind::Disconnect, move |_| {
            tracing::info!(session_id = %id, "Client disconnected");
            Ok(())
        });

        setup.on_option(TelnetOption::NAWS, move |event| {
            tracing::info!(session_id = %id, event = %event, "Window changed");
            Ok(())
        });
    }
}
