//! Relay transport backed by `nostr-sdk`.
//!
//! Every call builds its own client and disconnects it before returning,
//! whether the call succeeded or not, so no relay connection outlives the
//! operation that opened it.

use crate::config::RelayTransportConfig;
use crate::error::{SyncError, SyncResult};
use crate::event::{EventFilter, SignedEvent};
use crate::signer::{to_nostr_event, to_signed_event};
use crate::transport::RelayTransport;
use async_trait::async_trait;
use nostr::{Event, Filter, Kind, PublicKey};
use nostr_sdk::Client;
use std::collections::HashSet;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Talks to real relays over websockets.
#[derive(Debug, Clone, Default)]
pub struct NostrRelayTransport {
    config: RelayTransportConfig,
}

impl NostrRelayTransport {
    pub fn new(config: RelayTransportConfig) -> Self {
        Self { config }
    }

    async fn publish_with(&self, client: &Client, relay: &str, event: Event) -> SyncResult<()> {
        client
            .add_relay(relay)
            .await
            .map_err(|e| SyncError::TransportFailed(format!("{relay}: {e}")))?;
        timeout(self.config.connect_timeout, client.connect_relay(relay))
            .await
            .map_err(|_| SyncError::Timeout)?
            .map_err(|e| SyncError::TransportFailed(format!("{relay}: {e}")))?;

        let output = timeout(self.config.publish_timeout, client.send_event_to([relay], &event))
            .await
            .map_err(|_| SyncError::Timeout)?
            .map_err(|e| SyncError::TransportFailed(format!("{relay}: {e}")))?;

        if output.success.is_empty() {
            return Err(SyncError::TransportFailed(format!(
                "{relay} did not accept the event: {:?}",
                output.failed
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RelayTransport for NostrRelayTransport {
    async fn publish(&self, relay: &str, event: &SignedEvent) -> SyncResult<()> {
        let event = to_nostr_event(event)?;
        let client = Client::default();
        let result = self.publish_with(&client, relay, event).await;
        let _ = client.disconnect().await;
        result
    }

    async fn fetch(&self, relays: &[String], filter: &EventFilter) -> SyncResult<Vec<SignedEvent>> {
        let nostr_filter = to_nostr_filter(filter)?;
        let client = Client::default();

        let mut added = Vec::with_capacity(relays.len());
        for relay in relays {
            match client.add_relay(relay.as_str()).await {
                Ok(_) => added.push(relay.as_str()),
                Err(e) => warn!("Failed to add relay {}: {}", relay, e),
            }
        }
        if added.is_empty() {
            return Err(SyncError::TransportFailed("no usable relays".to_string()));
        }

        let _ = client.connect().await;
        let fetched = client
            .fetch_events_from(added, nostr_filter, self.config.fetch_timeout)
            .await;
        let _ = client.disconnect().await;
        let fetched = fetched.map_err(|e| SyncError::TransportFailed(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for event in fetched.into_iter() {
            if let Err(e) = event.verify() {
                warn!("Dropping event {} with bad signature: {}", event.id, e);
                continue;
            }
            if !seen.insert(event.id) {
                continue;
            }
            events.push(to_signed_event(&event)?);
        }
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("Fetched {} events from {} relays", events.len(), relays.len());
        Ok(events)
    }
}

fn to_nostr_filter(filter: &EventFilter) -> SyncResult<Filter> {
    let mut nostr_filter = Filter::new();
    if !filter.kinds.is_empty() {
        nostr_filter = nostr_filter.kinds(filter.kinds.iter().map(|k| Kind::from(*k)));
    }
    if !filter.authors.is_empty() {
        let authors = filter
            .authors
            .iter()
            .map(|a| PublicKey::from_hex(a))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SyncError::TransportFailed(format!("invalid author: {e}")))?;
        nostr_filter = nostr_filter.authors(authors);
    }
    if !filter.identifiers.is_empty() {
        nostr_filter = nostr_filter.identifiers(filter.identifiers.iter().cloned());
    }
    if let Some(limit) = filter.limit {
        nostr_filter = nostr_filter.limit(limit);
    }
    Ok(nostr_filter)
}
