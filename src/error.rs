//! Unified error model for the session core.
//! Three small taxonomies: configuration (fatal for the subsystem), profile/tenant
//! fetch outcomes (drive the retry and race policy), and identity-provider call
//! failures (normalized into discriminated outcomes, never panics).

use thiserror::Error;

/// Fatal configuration problems detected before any identity operation runs.
/// The reconciler surfaces these as a persistent `config_error` state and then
/// performs no further event processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("identity provider url is not set")]
    MissingUrl,
    #[error("identity provider publishable key is not set")]
    MissingKey,
    #[error("identity provider {field} still holds a scaffold placeholder value")]
    Placeholder { field: &'static str },
}

/// Outcome taxonomy for profile-store reads. The variants are policy-bearing:
/// `NotFound` forces a sign-out, `Denied` feeds the bounded provisioning retry,
/// everything else leaves prior state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileFetchError {
    #[error("no profile row exists for the principal")]
    NotFound,
    #[error("authorization denied by the store")]
    Denied,
    #[error("profile store query timed out")]
    Timeout,
    #[error("profile store query failed: {0}")]
    Other(String),
}

/// Failure reported by an identity-provider call (sign-in, sign-out, session
/// read). Carried inside discriminated outcomes rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identity provider call failed: {0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new<S: Into<String>>(msg: S) -> Self { Self(msg.into()) }
}
