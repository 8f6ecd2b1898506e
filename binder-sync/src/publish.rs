//! Publish fan-out.
//!
//! A signed event goes to every relay concurrently. Each relay succeeds or
//! fails on its own; failures are logged and counted, never returned.

use crate::event::SignedEvent;
use crate::transport::RelayTransport;
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Outcome of one fan-out. For logging only; there is no quorum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub attempted: usize,
    pub accepted: usize,
    pub failed: usize,
}

/// Publishes `event` to every relay in `relays`.
pub async fn publish(
    transport: &dyn RelayTransport,
    relays: &[String],
    event: &SignedEvent,
) -> PublishReport {
    let attempts = relays.iter().map(|relay| async move {
        let result = transport.publish(relay, event).await;
        (relay, result)
    });

    let mut report = PublishReport {
        attempted: relays.len(),
        ..PublishReport::default()
    };
    for (relay, result) in join_all(attempts).await {
        match result {
            Ok(()) => {
                debug!("Published {} to {}", event.id, relay);
                report.accepted += 1;
            }
            Err(e) => {
                warn!("Draft sync publish failed for relay {}: {}", relay, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Published event {} to {}/{} relays",
        event.id, report.accepted, report.attempted
    );
    report
}
