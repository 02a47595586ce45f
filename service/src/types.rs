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

//! Core types for the Telnet server

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for a session (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Session lifecycle state (stored as atomic u8 for lock-free state management)
///
/// Transitions only move forward: `Connect → Negotiating → Active → Closing → Closed`.
/// `Negotiating` may skip straight to `Closing` when the peer goes away mid-handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SessionState {
    /// Accepted, worker not yet running
    Connect = 0,
    /// Performing the initial option handshake
    Negotiating = 1,
    /// Receiving data and dispatching events
    Active = 2,
    /// Kill signal observed or peer gone; cleaning up
    Closing = 3,
    /// Worker finished, socket closed
    Closed = 4,
}

impl SessionState {
    /// Convert from u8 (for atomic operations)
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connect,
            1 => Self::Negotiating,
            2 => Self::Active,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Convert to u8 (for atomic operations)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the session is shutting down or gone
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    /// Check if the session is dispatching events
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Negotiating => write!(f, "negotiating"),
            Self::Active => write!(f, "active"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Point-in-time description of a pooled session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Position in accept order among the sessions currently pooled
    pub index: usize,
    /// Session ID
    pub id: SessionId,
    /// Peer address
    pub peer_addr: SocketAddr,
    /// Current state
    pub state: SessionState,
    /// When the session was accepted
    pub created_at: Instant,
}

impl SessionInfo {
    /// Time since the session was accepted
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} {}s",
            self.index,
            self.id,
            self.peer_addr,
            self.state,
            self.age().as_secs()
        )
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Number of pooled sessions
    pub active_sessions: usize,
    /// Total sessions since server start
    pub total_sessions: u64,
    /// Connections refused at the session limit
    pub rejected_sessions: u64,
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Server uptime
    pub uptime: Duration,
    /// Server start time
    pub started_at: Instant,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TelnetServer {{ active: {}, total: {}, rejected: {}, addr: {}, uptime: {:?} }}",
            self.active_sessions,
            self.total_sessions,
            self.rejected_sessions,
            self.bind_address,
            self.uptime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id() {
        let id1 = SessionId::new(1);
        let id2 = SessionId::new(2);

        assert_eq!(id1.as_u64(), 1);
        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert_eq!(id2.to_string(), "session-2");
    }

    #[test]
    fn test_session_state_conversion() {
        for state in [
            SessionState::Connect,
            SessionState::Negotiating,
            SessionState::Active,
            SessionState::Closing,
            SessionState::Closed,
        ] {
            assert_eq!(SessionState::from_u8(state.as_u8()), state);
        }
        assert_eq!(SessionState::from_u8(200), SessionState::Closed);
    }

    #[test]
    fn test_session_state_ordering() {
        assert!(SessionState::Connect < SessionState::Negotiating);
        assert!(SessionState::Negotiating < SessionState::Active);
        assert!(SessionState::Active < SessionState::Closing);
        assert!(SessionState::Closing < SessionState::Closed);
    }

    #[test]
    fn test_session_state_terminal() {
        assert!(!SessionState::Connect.is_terminal());
        assert!(!SessionState::Negotiating.is_terminal());
        assert!(!SessionState::Active.is_terminal());
        assert!(SessionState::Closing.is_terminal());
        assert!(SessionState::Closed.is_terminal());
        assert!(SessionState::Active.is_active());
        assert!(!SessionState::Negotiating.is_active());
    }

    #[test]
    fn test_session_info_display() {
        let info = SessionInfo {
            index: 0,
            id: SessionId::new(7),
            peer_addr: "127.0.0.1:4000".parse().unwrap(),
            state: SessionState::Active,
            created_at: Instant::now(),
        };
        assert!(info.to_string().starts_with("[0] session-7 127.0.0.1:4000 active"));
    }
}
