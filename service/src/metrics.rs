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

//! Lock-free metrics for the Telnet server
//!
//! Every recording method updates the in-process atomics read by
//! [`ServerMetrics::snapshot`] and forwards the same measurement to whichever
//! `metrics` recorder the application installed.

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
#[derive(Debug)]
pub struct ServerMetrics {
    // Session counts
    total_sessions: AtomicU64,
    active_sessions: AtomicU64,
    rejected_sessions: AtomicU64,

    // Throughput
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,

    // Errors
    negotiation_errors: AtomicU64,
    subscriber_faults: AtomicU64,

    // Timing (stored as nanoseconds)
    total_session_duration_ns: AtomicU64,

    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_sessions: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            rejected_sessions: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            negotiation_errors: AtomicU64::new(0),
            subscriber_faults: AtomicU64::new(0),
            total_session_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a session being opened
    pub fn session_opened(&self) {
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        counter!("telserv.sessions.total").increment(1);
        gauge!("telserv.sessions.active").increment(1.0);
    }

    /// Record a session worker finishing
    pub fn session_closed(&self, duration: Duration) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        self.total_session_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        gauge!("telserv.sessions.active").decrement(1.0);
    }

    /// Record a connection refused at the session limit
    pub fn session_rejected(&self) {
        self.rejected_sessions.fetch_add(1, Ordering::Relaxed);
        counter!("telserv.sessions.rejected").increment(1);
    }

    /// Record a negotiation decode failure
    pub fn negotiation_error(&self) {
        self.negotiation_errors.fetch_add(1, Ordering::Relaxed);
        counter!("telserv.negotiation.errors").increment(1);
    }

    /// Record subscribers that failed or panicked during dispatch
    pub fn subscriber_faults(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.subscriber_faults.fetch_add(count, Ordering::Relaxed);
        counter!("telserv.subscriber.faults").increment(count);
    }

    /// Record bytes sent
    pub fn bytes_sent(&self, count: u64) {
        self.bytes_sent.fetch_add(count, Ordering::Relaxed);
        counter!("telserv.bytes.sent").increment(count);
    }

    /// Record bytes received
    pub fn bytes_received(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
        counter!("telserv.bytes.received").increment(count);
    }

    /// Get the current number of running session workers
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Get the total number of sessions since server start
    pub fn total_sessions(&self) -> u64 {
        self.total_sessions.load(Ordering::Relaxed)
    }

    /// Get the number of refused connections
    pub fn rejected_sessions(&self) -> u64 {
        self.rejected_sessions.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics
    ///
    /// Individual counters are read independently, so a snapshot taken while sessions
    /// are running may be slightly inconsistent across fields.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            rejected_sessions: self.rejected_sessions.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            negotiation_errors: self.negotiation_errors.load(Ordering::Relaxed),
            subscriber_faults: self.subscriber_faults.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
            avg_session_duration: self.average_session_duration(),
        }
    }

    fn average_session_duration(&self) -> Duration {
        let total = self.total_sessions.load(Ordering::Relaxed);
        let closed = total.saturating_sub(self.active_sessions.load(Ordering::Relaxed));
        if closed == 0 {
            return Duration::ZERO;
        }
        let total_ns = self.total_session_duration_ns.load(Ordering::Relaxed);
        Duration::from_nanos(total_ns / closed)
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total sessions since server start
    pub total_sessions: u64,
    /// Running session workers
    pub active_sessions: u64,
    /// Connections refused at the session limit
    pub rejected_sessions: u64,
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Negotiation decode failures
    pub negotiation_errors: u64,
    /// Subscribers that failed or panicked
    pub subscriber_faults: u64,
    /// Server uptime
    pub uptime: Duration,
    /// Average duration of closed sessions
    pub avg_session_duration: Duration,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Server Metrics:")?;
        writeln!(f, "  Uptime: {:?}", self.uptime)?;
        writeln!(
            f,
            "  Sessions: {} active, {} total, {} rejected",
            self.active_sessions, self.total_sessions, self.rejected_sessions
        )?;
        writeln!(
            f,
            "  Traffic: {} bytes in, {} bytes out",
            self.bytes_received, self.bytes_sent
        )?;
        writeln!(
            f,
            "  Faults: {} negotiation, {} subscriber",
            self.negotiation_errors, self.subscriber_faults
        )?;
        write!(f, "  Avg Session Duration: {:?}", self.avg_session_duration)
    }
}
