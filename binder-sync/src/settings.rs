//! Relay settings.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use nostr_sdk::RelayUrl;

/// Source of the relays sync publishes to and fetches from.
#[async_trait]
pub trait RelaySettings: Send + Sync {
    /// URLs of enabled relays. May be empty.
    async fn enabled_relay_urls(&self) -> SyncResult<Vec<String>>;
}

/// One configured relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEntry {
    pub url: String,
    pub enabled: bool,
}

/// A fixed, validated relay list.
#[derive(Debug, Clone, Default)]
pub struct StaticRelaySettings {
    relays: Vec<RelayEntry>,
}

impl StaticRelaySettings {
    /// Validates and enables every URL in `urls`.
    pub fn new<I, S>(urls: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_options(urls, false)
    }

    /// Like [`StaticRelaySettings::new`], optionally accepting `ws://` for
    /// localhost (development relays).
    pub fn with_options<I, S>(urls: I, allow_insecure_localhost: bool) -> SyncResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let relays = urls
            .into_iter()
            .map(|url| {
                validate_relay_url(url.as_ref(), allow_insecure_localhost)
                    .map(|url| RelayEntry { url, enabled: true })
            })
            .collect::<SyncResult<Vec<_>>>()?;
        Ok(Self { relays })
    }

    /// Settings with no relays.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Enables or disables a relay. Returns whether it was found.
    pub fn set_enabled(&mut self, url: &str, enabled: bool) -> bool {
        match self.relays.iter_mut().find(|r| r.url == url) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[RelayEntry] {
        &self.relays
    }
}

#[async_trait]
impl RelaySettings for StaticRelaySettings {
    async fn enabled_relay_urls(&self) -> SyncResult<Vec<String>> {
        Ok(self
            .relays
            .iter()
            .filter(|r| r.enabled)
            .map(|r| r.url.clone())
            .collect())
    }
}

/// Checks a relay URL and returns it normalized (trimmed, no trailing
/// slash).
///
/// `wss://` is required. `ws://` is accepted only for `localhost` and
/// `127.0.0.1`, and only when `allow_insecure_localhost` is set.
pub fn validate_relay_url(url: &str, allow_insecure_localhost: bool) -> SyncResult<String> {
    let url = url.trim();

    let insecure = if url.starts_with("wss://") {
        false
    } else if url.starts_with("ws://") {
        true
    } else {
        return Err(SyncError::InvalidRelayUrl(format!(
            "relay must use wss://: {url}"
        )));
    };

    let parsed = RelayUrl::parse(url)
        .map_err(|e| SyncError::InvalidRelayUrl(format!("{url}: {e}")))?;

    if insecure {
        let host = extract_hostname(url);
        if host != "localhost" && host != "127.0.0.1" {
            return Err(SyncError::InvalidRelayUrl(format!(
                "relay must use wss://: {url}"
            )));
        }
        if !allow_insecure_localhost {
            return Err(SyncError::InvalidRelayUrl(format!(
                "insecure ws:// is allowed only for localhost in dev mode: {url}"
            )));
        }
    }

    let mut normalized = parsed.to_string();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    Ok(normalized)
}

/// Host part of a websocket URL, without port or userinfo.
fn extract_hostname(url: &str) -> &str {
    let without_scheme = url
        .strip_prefix("wss://")
        .or_else(|| url.strip_prefix("ws://"))
        .unwrap_or(url);
    let authority = without_scheme.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or(authority);
    if host_port.starts_with('[') {
        return host_port
            .split_once(']')
            .map(|(h, _)| h.trim_start_matches('['))
            .unwrap_or(host_port);
    }
    host_port.split(':').next().unwrap_or(host_port)
}
