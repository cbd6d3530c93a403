//! Player identifier → display name resolution.
//!
//! Lookup order: in-process cache, local `usercache.json` ledger, then the
//! remote profile service. Only successful resolutions are cached, so a
//! player that could not be named is retried on the next cycle.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// Default remote profile endpoint; the dash-less identifier is appended.
pub const DEFAULT_PROFILE_URL: &str = "https://sessionserver.mojang.com/session/minecraft/profile";

/// Error type for remote profile lookups.
#[derive(Debug)]
pub enum LookupError {
    /// Transport-level failure (DNS, connect, timeout).
    Http(String),
    /// Non-success status code.
    Status(u16),
    /// The service does not know this identifier.
    NotFound,
    /// Response body is not a profile.
    Malformed(String),
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::Http(msg) => write!(f, "profile lookup failed: {}", msg),
            LookupError::Status(code) => write!(f, "profile lookup returned HTTP {}", code),
            LookupError::NotFound => write!(f, "unknown profile"),
            LookupError::Malformed(msg) => write!(f, "malformed profile response: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

/// Remote source of display names.
pub trait ProfileLookup: Send + Sync {
    /// Returns the current display name for a dash-less identifier.
    fn lookup(&self, id: &str) -> Result<String, LookupError>;
}

#[derive(Debug, Deserialize)]
struct Profile {
    name: String,
}

/// Profile lookup against the Mojang session server.
pub struct MojangLookup {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl MojangLookup {
    /// Creates a lookup client for `base_url` with the given request timeout.
    ///
    /// Must not be called from inside an async runtime.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mcstat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl ProfileLookup for MojangLookup {
    fn lookup(&self, id: &str) -> Result<String, LookupError> {
        let url = format!("{}/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| LookupError::Http(e.to_string()))?;

        let status = response.status();
        // The session server answers 204 for identifiers it does not know.
        if status == reqwest::StatusCode::NO_CONTENT || status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let profile: Profile = response
            .json()
            .map_err(|e| LookupError::Malformed(e.to_string()))?;
        if profile.name.is_empty() {
            return Err(LookupError::Malformed("empty name".to_string()));
        }
        Ok(profile.name)
    }
}

#[derive(Debug, Deserialize)]
struct UserCacheEntry {
    name: String,
    uuid: String,
}

/// Parses the server's `usercache.json` into identifier → name.
///
/// Malformed content yields an empty map.
pub fn parse_usercache(content: &str) -> HashMap<String, String> {
    match serde_json::from_str::<Vec<UserCacheEntry>>(content) {
        Ok(entries) => entries
            .into_iter()
            .map(|entry| (normalize(&entry.uuid), entry.name))
            .collect(),
        Err(e) => {
            warn!(error = %e, "ignoring malformed usercache");
            HashMap::new()
        }
    }
}

/// Identifiers are compared without dashes.
fn normalize(id: &str) -> String {
    id.replace('-', "")
}

/// Resolves player identifiers to display names.
///
/// The cache is process-wide and is emptied by [`IdentityResolver::flush`],
/// which the binary calls once a day so renamed players are picked up.
pub struct IdentityResolver {
    cache: Mutex<HashMap<String, String>>,
    local: HashMap<String, String>,
    remote: Option<Box<dyn ProfileLookup>>,
}

impl IdentityResolver {
    /// Creates a resolver with no lookup sources; only cached names resolve.
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            local: HashMap::new(),
            remote: None,
        }
    }

    /// Adds the local identifier → name ledger, consulted before the remote service.
    pub fn with_local(mut self, ledger: HashMap<String, String>) -> Self {
        self.local = ledger
            .into_iter()
            .map(|(id, name)| (normalize(&id), name))
            .collect();
        self
    }

    /// Adds a remote lookup service used on local misses.
    pub fn with_remote(mut self, remote: impl ProfileLookup + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    /// Resolves an identifier to a display name.
    ///
    /// The whole check-lookup-insert sequence runs under the cache lock so
    /// concurrent callers never look the same player up twice.
    pub fn resolve(&self, id: &str) -> Option<String> {
        let key = normalize(id);
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(name) = cache.get(&key) {
            return Some(name.clone());
        }

        let name = if let Some(name) = self.local.get(&key) {
            name.clone()
        } else {
            let remote = self.remote.as_ref()?;
            match remote.lookup(&key) {
                Ok(name) => name,
                Err(e) => {
                    debug!(player = %id, error = %e, "cannot resolve player name");
                    return None;
                }
            }
        };

        cache.insert(key, name.clone());
        Some(name)
    }

    /// Empties the name cache and returns how many names it held.
    ///
    /// Blocks while a lookup is in flight.
    pub fn flush(&self) -> usize {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let entries = cache.len();
        cache.clear();
        entries
    }

    /// Number of cached names.
    pub fn cached(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}
