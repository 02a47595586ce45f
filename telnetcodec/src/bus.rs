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

//! Keyed synchronous event dispatch
//!
//! An [`EventBus`] maps a key to an ordered list of callbacks. Publishing runs every
//! callback registered for the key, in registration order, on the caller's task. Each
//! callback sits behind its own failure boundary: an `Err` return or a panic is logged and
//! counted, and dispatch moves on to the next callback.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::error;

/// Error type a subscriber may return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of every subscriber callback.
pub type SubscriberResult = Result<(), SubscriberError>;

type Subscriber<E> = Box<dyn FnMut(&E) -> SubscriberResult + Send>;

/// Outcome of a single [`EventBus::publish`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers that returned `Ok`
    pub delivered: usize,
    /// Subscribers that returned `Err` or panicked
    pub failed: usize,
}

impl DispatchReport {
    /// Whether every subscriber succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Accumulates another report into this one.
    pub fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// Subscription table from key to ordered callbacks.
pub struct EventBus<K, E> {
    subscribers: HashMap<K, Vec<Subscriber<E>>>,
}

impl<K, E> EventBus<K, E>
where
    K: Eq + Hash + Debug,
{
    /// Creates an empty bus.
    pub fn new() -> Self {
        EventBus {
            subscribers: HashMap::new(),
        }
    }

    /// Appends `callback` to the subscribers of `key`.
    pub fn subscribe<F>(&mut self, key: K, callback: F)
    where
        F: FnMut(&E) -> SubscriberResult + Send + 'static,
    {
        self.subscribers
            .entry(key)
            .or_default()
            .push(Box::new(callback));
    }

    /// Invokes every subscriber of `key` with `event`.
    ///
    /// A key with no subscribers is a no-op and yields an empty report.
    pub fn publish(&mut self, key: &K, event: &E) -> DispatchReport {
        let mut report = DispatchReport::default();
        let Some(subscribers) = self.subscribers.get_mut(key) else {
            return report;
        };
        for (index, subscriber) in subscribers.iter_mut().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    error!(key = ?key, subscriber = index, error = %err, "Subscriber failed");
                    report.failed += 1;
                }
                Err(payload) => {
                    error!(
                        key = ?key,
                        subscriber = index,
                        panic = panic_message(payload.as_ref()),
                        "Subscriber panicked"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Number of subscribers registered for `key`.
    pub fn subscriber_count(&self, key: &K) -> usize {
        self.subscribers.get(key).map_or(0, Vec::len)
    }

    /// Whether no subscriber is registered under any key.
    pub fn is_empty(&self) -> bool {
        self.subscribers.values().all(Vec::is_empty)
    }
}

impl<K, E> Default for EventBus<K, E>
where
    K: Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, E> Debug for EventBus<K, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.subscribers.iter().map(|(key, subs)| (key, subs.len())))
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
