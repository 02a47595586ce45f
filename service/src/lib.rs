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

//! Telnet Server
//!
//! Async Telnet server core built on Tokio. Each accepted connection gets its own
//! worker task that negotiates options, dispatches session events to subscribers and
//! serves administrative requests. The server owns a pool of those sessions, reaps the
//! dead ones on a fixed interval and can stop everything on demand.
//!
//! # Architecture
//!
//! ```text
//! TelnetServer  (listener, accept loop, housekeeping)
//!     ↓
//! SessionPool   (DashMap of SessionHandles, reaper, admin routing)
//!     ↓
//! Session worker → Negotiator + EventBus
//! ```
//!
//! # Example
//!
//! ```no_run
//! use telserv_service::{ServerConfig, SessionEvent, SessionEventKind, SessionHandler, SessionSetup, TelnetServer};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl SessionHandler for Echo {
//!     async fn on_session(&self, setup: &mut SessionSetup) {
//!         let writer = setup.writer();
//!         setup.on(SessionEventKind::Data, move |event| {
//!             if let SessionEvent::Data(bytes) = event {
//!                 writer.send(bytes.clone())?;
//!             }
//!             Ok(())
//!         });
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = TelnetServer::bind(ServerConfig::new("127.0.0.1", 2323)).await?;
//!     server.start(Arc::new(Echo)).await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

mod admin;
mod config;
mod error;
mod handler;
mod metrics;
mod pool;
mod server;
mod session;
mod types;

pub use admin::{AdminCommand, format_hex};
pub use config::ServerConfig;
pub use error::{Result, TelnetError};
pub use handler::{CallbackHandler, SessionEvent, SessionEventKind, SessionHandler};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use pool::SessionPool;
pub use server::TelnetServer;
pub use session::{
    ControlMessage, Session, SessionConfig, SessionHandle, SessionSetup, SessionWriter,
};
pub use types::{ServerSnapshot, SessionId, SessionInfo, SessionState};
