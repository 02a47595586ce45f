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

//! Handler traits and implementations for the Telnet server

use crate::{SessionId, SessionSetup, SessionWriter};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use telserv_telnetcodec::{KNOWN_OPTIONS, OptionEvent};

/// Application-level event raised by a session worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake finished; raised once before any `Data`
    Connect,
    /// A chunk of non-negotiation bytes exactly as read from the socket
    Data(Bytes),
    /// The worker is exiting; raised once, only after `Connect`
    Disconnect,
}

impl SessionEvent {
    /// The key this event is published under.
    pub fn kind(&self) -> SessionEventKind {
        match self {
            SessionEvent::Connect => SessionEventKind::Connect,
            SessionEvent::Data(_) => SessionEventKind::Data,
            SessionEvent::Disconnect => SessionEventKind::Disconnect,
        }
    }
}

/// Subscription key for [`SessionEvent`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    /// See [`SessionEvent::Connect`]
    Connect,
    /// See [`SessionEvent::Data`]
    Data,
    /// See [`SessionEvent::Disconnect`]
    Disconnect,
}

/// Server session handler trait
///
/// Called once per accepted connection, on the session's own task, before the
/// handshake begins. Implementations subscribe to session and option events through
/// the [`SessionSetup`] and keep a [`SessionWriter`] for output.
///
/// # Example
///
/// ```no_run
/// use telserv_service::{SessionEvent, SessionEventKind, SessionHandler, SessionSetup};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl SessionHandler for Echo {
///     async fn on_session(&self, setup: &mut SessionSetup) {
///         let writer = setup.writer();
///         setup.on(SessionEventKind::Data, move |event| {
///             if let SessionEvent::Data(bytes) = event {
///                 writer.send(bytes.clone())?;
///             }
///             Ok(())
///         });
///     }
/// }
/// ```
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    /// Register subscriptions for a newly accepted session.
    async fn on_session(&self, _setup: &mut SessionSetup) {}
}

type ConnectCallback = Arc<dyn Fn(SessionId, &SessionWriter) + Send + Sync + 'static>;
type DataCallback = Arc<dyn Fn(SessionId, &SessionWriter, &Bytes) + Send + Sync + 'static>;
type DisconnectCallback = Arc<dyn Fn(SessionId) + Send + Sync + 'static>;
type OptionCallback = Arc<dyn Fn(SessionId, &OptionEvent) + Send + Sync + 'static>;

/// Callback-based handler implementation
///
/// This provides a way to implement handlers using closures instead of implementing
/// the `SessionHandler` trait. Each closure is shared by every session.
///
/// # Example
///
/// ```no_run
/// use telserv_service::CallbackHandler;
/// use std::sync::Arc;
///
/// let handler = Arc::new(
///     CallbackHandler::new()
///         .with_on_connect(|id, writer| {
///             let _ = writer.send(format!("welcome {id}\r\n"));
///         })
///         .with_on_disconnect(|id| println!("{id} left")),
/// );
/// ```
#[derive(Default)]
pub struct CallbackHandler {
    /// Called after the handshake
    pub on_connect: Option<ConnectCallback>,
    /// Called for every data chunk
    pub on_data: Option<DataCallback>,
    /// Called when the session ends
    pub on_disconnect: Option<DisconnectCallback>,
    /// Called for every change to a recognized option
    pub on_option: Option<OptionCallback>,
}

impl CallbackHandler {
    /// Create a handler with no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connect callback
    pub fn with_on_connect<F>(mut self, callback: F) -> Self
    where
        F: Fn(SessionId, &SessionWriter) + Send + Sync + 'static,
    {
        self.on_connect = Some(Arc::new(callback));
        self
    }

    /// Set the data callback
    pub fn with_on_data<F>(mut self, callback: F) -> Self
    where
        F: Fn(SessionId, &SessionWriter, &Bytes) + Send + Sync + 'static,
    {
        self.on_data = Some(Arc::new(callback));
        self
    }

    /// Set the disconnect callback
    pub fn with_on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(SessionId) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Arc::new(callback));
        self
    }

    /// Set the option callback
    pub fn with_on_option<F>(mut self, callback: F) -> Self
    where
        F: Fn(SessionId, &OptionEvent) + Send + Sync + 'static,
    {
        self.on_option = Some(Arc::new(callback));
        self
    }
}

#[async_trait]
impl SessionHandler for CallbackHandler {
    async fn on_session(&self, setup: &mut SessionSetup) {
        let id = setup.id();

        if let Some(ref f) = self.on_connect {
            let f = f.clone();
            let writer = setup.writer();
            setup.on(SessionEventKind::Connect, move |_| {
                f(id, &writer);
                Ok(())
            });
        }

        if let Some(ref f) = self.on_data {
            let f = f.clone();
            let writer = setup.writer();
            setup.on(SessionEventKind::Data, move |event| {
                if let SessionEvent::Data(bytes) = event {
                    f(id, &writer, bytes);
                }
                Ok(())
            });
        }

        if let Some(ref f) = self.on_disconnect {
            let f = f.clone();
            setup.on(SessionEventKind::Disconnect, move |_| {
                f(id);
                Ok(())
            });
        }

        if let Some(ref f) = self.on_option {
            for option in KNOWN_OPTIONS {
                let f = f.clone();
                setup.on_option(option, move |event| {
                    f(id, event);
                    Ok(())
                });
            }
        }
    }
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_data", &self.on_data.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_option", &self.on_option.is_some())
            .finish()
    }
}
