//! Relay transport abstraction.
//!
//! The orchestrator talks to relays only through [`RelayTransport`], so the
//! same logic runs against real relays or the in-memory mock.

use crate::error::SyncResult;
use crate::event::{EventFilter, SignedEvent};
use async_trait::async_trait;

/// Publishes events to and fetches events from relays.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Publishes `event` to one relay. Any connection the attempt opens is
    /// released before returning, on success and failure alike.
    async fn publish(&self, relay: &str, event: &SignedEvent) -> SyncResult<()>;

    /// Fetches events matching `filter` from `relays`. Best effort: returns
    /// whatever arrived, deduplicated by id, newest first.
    async fn fetch(&self, relays: &[String], filter: &EventFilter) -> SyncResult<Vec<SignedEvent>>;
}

/// A mock transport for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory relays. Events published to any relay can be fetched from
    /// it; relays can be made to fail.
    ///
    /// Like a real relay, fetch applies only the indexed filter fields before
    /// the limit, so callers still see unrelated events that share a kind.
    #[derive(Debug, Default)]
    pub struct MockRelayTransport {
        relays: Mutex<HashMap<String, Vec<SignedEvent>>>,
        failing: Mutex<HashSet<String>>,
        publish_attempts: Mutex<Vec<String>>,
        fetch_calls: Mutex<usize>,
    }

    impl MockRelayTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every operation against `relay` fail.
        pub fn fail_relay(&self, relay: impl Into<String>) {
            self.failing.lock().unwrap().insert(relay.into());
        }

        /// Stores `event` on `relay` as if another device had published it.
        pub fn seed(&self, relay: impl Into<String>, event: SignedEvent) {
            self.relays
                .lock()
                .unwrap()
                .entry(relay.into())
                .or_default()
                .push(event);
        }

        /// Events currently held by `relay`.
        pub fn events_on(&self, relay: &str) -> Vec<SignedEvent> {
            self.relays
                .lock()
                .unwrap()
                .get(relay)
                .cloned()
                .unwrap_or_default()
        }

        /// Relays a publish was attempted on, in call order.
        pub fn publish_attempts(&self) -> Vec<String> {
            self.publish_attempts.lock().unwrap().clone()
        }

        pub fn fetch_calls(&self) -> usize {
            *self.fetch_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl RelayTransport for MockRelayTransport {
        async fn publish(&self, relay: &str, event: &SignedEvent) -> SyncResult<()> {
            self.publish_attempts.lock().unwrap().push(relay.to_string());
            if self.failing.lock().unwrap().contains(relay) {
                return Err(SyncError::TransportFailed(format!("{relay} unreachable")));
            }
            self.seed(relay, event.clone());
            Ok(())
        }

        async fn fetch(
            &self,
            relays: &[String],
            filter: &EventFilter,
        ) -> SyncResult<Vec<SignedEvent>> {
            *self.fetch_calls.lock().unwrap() += 1;
            let failing = self.failing.lock().unwrap().clone();
            let stored = self.relays.lock().unwrap();

            let mut seen = HashSet::new();
            let mut events: Vec<SignedEvent> = relays
                .iter()
                .filter(|r| !failing.contains(*r))
                .filter_map(|r| stored.get(r))
                .flatten()
                .filter(|e| filter.matches_indexed(e) && seen.insert(e.id.clone()))
                .cloned()
                .collect();
            events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            if let Some(limit) = filter.limit {
                events.truncate(limit);
            }
            Ok(events)
        }
    }
}
