//! Provider connection parameters and reconciler tunables.
//! The two connection parameters are externally supplied (deployment env); an
//! empty or scaffold-placeholder value is a fatal configuration error. The
//! timing tunables ship with the production defaults but are plain fields so
//! deployments (and tests) can override them.

use std::time::Duration;

use crate::error::ConfigError;

/// Scaffold templates ship literal placeholder strings for the connection
/// parameters; treat any value that still looks like one as unconfigured.
const PLACEHOLDER_MARKERS: &[&str] = &["your-", "YOUR_", "changeme", "<", "example.invalid"];

fn looks_like_placeholder(v: &str) -> bool {
    PLACEHOLDER_MARKERS.iter().any(|m| v.contains(m))
}

/// The two externally supplied identity-provider connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub url: String,
    pub publishable_key: String,
}

impl ProviderConfig {
    pub fn new<S: Into<String>>(url: S, publishable_key: S) -> Self {
        Self { url: url.into(), publishable_key: publishable_key.into() }
    }

    /// Validate the connection parameters. Failure is terminal for the session
    /// subsystem: without valid configuration the provider cannot be reached.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() { return Err(ConfigError::MissingUrl); }
        if self.publishable_key.trim().is_empty() { return Err(ConfigError::MissingKey); }
        if looks_like_placeholder(&self.url) {
            return Err(ConfigError::Placeholder { field: "url" });
        }
        if looks_like_placeholder(&self.publishable_key) {
            return Err(ConfigError::Placeholder { field: "publishable key" });
        }
        Ok(())
    }
}

/// Reconciler tunables. The window/delay values are empirically chosen in
/// production; they are fields rather than constants so callers can tighten
/// them (tests run with millisecond values).
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub provider: ProviderConfig,
    /// A `signed-in` event for the currently held principal arriving within
    /// this window of the last profile replacement is treated as a silent
    /// refresh, not a real sign-in.
    pub fake_signin_window: Duration,
    /// Delay before the single provisioning retry after an authorization
    /// denial on a fresh principal.
    pub retry_delay: Duration,
    /// Budget for one profile/tenant store query; expiry is treated exactly
    /// like a query error.
    pub fetch_timeout: Duration,
    /// Optional redirect target passed through to the passwordless flow.
    pub email_redirect: Option<String>,
}

impl ReconcilerConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            fake_signin_window: Duration::from_secs(60),
            retry_delay: Duration::from_secs(3),
            fetch_timeout: Duration::from_secs(10),
            email_redirect: None,
        }
    }
}
