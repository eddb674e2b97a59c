//! # Domain Types
//!
//! Core types describing a remote sync endpoint and its connection phase.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SyncStatus    │   │ ConnectOptions  │   │ EndpointStatus  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Error      -1  │   │  pollInterval   │   │  url            │       │
//! │  │  Offline     0  │   │  credentials    │   │  status         │       │
//! │  │  Connecting  1  │   │  extra { .. }   │   │  tracked        │       │
//! │  │  Online      2  │   └─────────────────┘   └─────────────────┘       │
//! │  │  Syncing     3  │                                                    │
//! │  │  ErrWillRetry 4 │   ┌─────────────────┐                             │
//! │  └─────────────────┘   │CredentialsPolicy│                             │
//! │                        │  omit (default) │                             │
//! │                        │  same-origin    │                             │
//! │                        │  include        │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::DEFAULT_POLL_INTERVAL_MS;

// =============================================================================
// Sync Status
// =============================================================================

/// The phase a connection to one endpoint is currently in.
///
/// The numeric codes are what the local store persists; the `Display` form is
/// the human-readable text handed to status listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// The connection failed and will not retry on its own.
    Error,
    /// No connection is established.
    Offline,
    /// Handshake in progress.
    Connecting,
    /// Connected and idle.
    Online,
    /// Connected and exchanging changes.
    Syncing,
    /// The adapter hit an error and is retrying by itself.
    ErrorWillRetry,
}

impl SyncStatus {
    /// All statuses, ordered by code.
    pub const ALL: [SyncStatus; 6] = [
        SyncStatus::Error,
        SyncStatus::Offline,
        SyncStatus::Connecting,
        SyncStatus::Online,
        SyncStatus::Syncing,
        SyncStatus::ErrorWillRetry,
    ];

    /// Returns the persisted numeric code.
    pub const fn code(&self) -> i64 {
        match self {
            SyncStatus::Error => -1,
            SyncStatus::Offline => 0,
            SyncStatus::Connecting => 1,
            SyncStatus::Online => 2,
            SyncStatus::Syncing => 3,
            SyncStatus::ErrorWillRetry => 4,
        }
    }

    /// Parses a persisted numeric code.
    pub fn from_code(code: i64) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(CoreError::UnknownStatusCode(code))
    }

    /// Returns true for the terminal error status.
    pub const fn is_error(&self) -> bool {
        matches!(self, SyncStatus::Error)
    }

    /// Returns true while a live connection exists.
    pub const fn is_connected(&self) -> bool {
        matches!(self, SyncStatus::Online | SyncStatus::Syncing)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Error => write!(f, "Error"),
            SyncStatus::Offline => write!(f, "Offline"),
            SyncStatus::Connecting => write!(f, "Connecting"),
            SyncStatus::Online => write!(f, "Connected"),
            SyncStatus::Syncing => write!(f, "Syncing"),
            SyncStatus::ErrorWillRetry => write!(f, "Error, will retry"),
        }
    }
}

// =============================================================================
// Credentials Policy
// =============================================================================

/// Whether the adapter sends credentials (cookies, auth headers) to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsPolicy {
    /// Never send credentials.
    #[default]
    Omit,
    /// Send credentials only to the origin the store was loaded from.
    SameOrigin,
    /// Always send credentials.
    Include,
}

impl CredentialsPolicy {
    /// Returns the wire form of the policy.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CredentialsPolicy::Omit => "omit",
            CredentialsPolicy::SameOrigin => "same-origin",
            CredentialsPolicy::Include => "include",
        }
    }
}

impl std::fmt::Display for CredentialsPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CredentialsPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "omit" => Ok(CredentialsPolicy::Omit),
            "same-origin" => Ok(CredentialsPolicy::SameOrigin),
            "include" => Ok(CredentialsPolicy::Include),
            other => Err(CoreError::InvalidOption {
                key: ConnectOptions::CREDENTIALS_KEY.to_string(),
                reason: format!(
                    "unknown policy '{}'. Valid options: omit, same-origin, include",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Connect Options
// =============================================================================

/// Caller-supplied option bag, as received from application code.
pub type OptionsMap = Map<String, Value>;

/// Per-endpoint connection options handed to the protocol adapter.
///
/// ## Merge Order
/// ```text
/// caller fields ──► defaults (pollInterval = 10000, credentials = "omit")
///                   └─ applied LAST: caller values for these two keys
///                      are replaced, every other caller key survives
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Polling interval in milliseconds.
    #[serde(rename = "pollInterval")]
    pub poll_interval_ms: u64,

    /// Credential-sending policy.
    pub credentials: CredentialsPolicy,

    /// Any other adapter-specific fields.
    #[serde(flatten)]
    pub extra: OptionsMap,
}

impl ConnectOptions {
    /// JSON key of the polling interval.
    pub const POLL_INTERVAL_KEY: &'static str = "pollInterval";

    /// JSON key of the credentials policy.
    pub const CREDENTIALS_KEY: &'static str = "credentials";

    /// Merges caller-supplied fields with the defaults.
    ///
    /// Defaults are applied after the caller's fields, so `pollInterval` and
    /// `credentials` always come out as their defaults.
    pub fn merge(supplied: Option<OptionsMap>) -> Self {
        let mut extra = supplied.unwrap_or_default();
        extra.remove(Self::POLL_INTERVAL_KEY);
        extra.remove(Self::CREDENTIALS_KEY);

        ConnectOptions {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            credentials: CredentialsPolicy::default(),
            extra,
        }
    }

    /// Rebuilds options from their persisted JSON form.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::InvalidOption {
            key: "options".to_string(),
            reason: e.to_string(),
        })
    }

    /// Serializes the options for persistence.
    pub fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }

    /// Returns the options as a flat JSON object.
    pub fn to_map(&self) -> OptionsMap {
        let mut map = self.extra.clone();
        map.insert(
            Self::POLL_INTERVAL_KEY.to_string(),
            Value::from(self.poll_interval_ms),
        );
        map.insert(
            Self::CREDENTIALS_KEY.to_string(),
            Value::from(self.credentials.as_str()),
        );
        map
    }

    /// Returns the polling interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Looks up an adapter-specific field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::merge(None)
    }
}

// =============================================================================
// Endpoint Status
// =============================================================================

/// One row of `list_statuses()`: an endpoint known to the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    /// Endpoint locator.
    pub url: String,

    /// Last known status.
    pub status: SyncStatus,

    /// Whether the manager currently tracks this endpoint as connected.
    pub tracked: bool,
}

impl EndpointStatus {
    /// Human-readable status text.
    pub fn status_text(&self) -> String {
        self.status.to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes_round_trip() {
        for status in SyncStatus::ALL {
            assert_eq!(SyncStatus::from_code(status.code()).unwrap(), status);
        }
        assert!(matches!(
            SyncStatus::from_code(99),
            Err(CoreError::UnknownStatusCode(99))
        ));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SyncStatus::Online.to_string(), "Connected");
        assert_eq!(SyncStatus::ErrorWillRetry.to_string(), "Error, will retry");
        assert_eq!(SyncStatus::Offline.to_string(), "Offline");
    }

    #[test]
    fn test_status_predicates() {
        assert!(SyncStatus::Error.is_error());
        assert!(!SyncStatus::ErrorWillRetry.is_error());
        assert!(SyncStatus::Syncing.is_connected());
        assert!(!SyncStatus::Connecting.is_connected());
    }

    #[test]
    fn test_credentials_parsing() {
        assert_eq!(
            "same-origin".parse::<CredentialsPolicy>().unwrap(),
            CredentialsPolicy::SameOrigin
        );
        assert_eq!(
            "INCLUDE".parse::<CredentialsPolicy>().unwrap(),
            CredentialsPolicy::Include
        );
        assert!("sometimes".parse::<CredentialsPolicy>().is_err());
    }

    #[test]
    fn test_merge_defaults_win_over_caller_values() {
        let supplied = json!({
            "pollInterval": 500,
            "credentials": "include",
            "apiKey": "secret"
        });
        let options = ConnectOptions::merge(supplied.as_object().cloned());

        assert_eq!(options.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(options.credentials, CredentialsPolicy::Omit);
        assert_eq!(options.get("apiKey"), Some(&json!("secret")));
    }

    #[test]
    fn test_merge_without_options() {
        let options = ConnectOptions::merge(None);
        assert_eq!(options, ConnectOptions::default());
        assert_eq!(options.poll_interval(), Duration::from_secs(10));
        assert!(options.extra.is_empty());
    }

    #[test]
    fn test_options_json_persistence() {
        let supplied = json!({ "batchSize": 50 });
        let options = ConnectOptions::merge(supplied.as_object().cloned());

        let json = options.to_json();
        assert!(json.contains("\"pollInterval\":10000"));
        assert!(json.contains("\"credentials\":\"omit\""));

        let restored = ConnectOptions::from_json(&json).unwrap();
        assert_eq!(restored, options);
    }

    #[test]
    fn test_endpoint_status_text() {
        let row = EndpointStatus {
            url: "https://sync.example/db1".to_string(),
            status: SyncStatus::Online,
            tracked: true,
        };
        assert_eq!(row.status_text(), "Connected");
    }
}
