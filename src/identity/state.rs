use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::error::ConfigError;

use super::principal::{Profile, Session, Tenant};

/// The single shared mutable record of the session subsystem.
///
/// Exactly one writer exists (the reconciler); consumers read snapshots
/// through [`StateHandle`]. `is_loading == true` means "identity not settled
/// yet, do not read it"; a `None` tenant under a settled authenticated state
/// means "tenant unknown", not "signed out".
#[derive(Debug, Clone)]
pub struct ReconciliationState {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub is_loading: bool,
    pub is_fetching_profile: bool,
    pub config_error: Option<ConfigError>,
    /// Updated only when `profile` is actually replaced. Drives the
    /// fake-sign-in window check.
    pub last_profile_set_at: Option<Instant>,
}

impl Default for ReconciliationState {
    fn default() -> Self {
        Self {
            session: None,
            profile: None,
            is_loading: true,
            is_fetching_profile: false,
            config_error: None,
            last_profile_set_at: None,
        }
    }
}

impl ReconciliationState {
    /// Tenant view derived from the held profile (fetched, synthesized, or
    /// `None` when resolution degraded).
    pub fn tenant(&self) -> Option<&Tenant> {
        self.profile.as_ref().and_then(|p| p.tenant.as_ref())
    }

    pub fn current_tenant_id(&self) -> Option<uuid::Uuid> {
        self.profile.as_ref().and_then(|p| p.tenant_id)
    }

    /// Replace the profile wholesale and stamp the replacement time. The only
    /// place `last_profile_set_at` ever changes.
    pub(crate) fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
        self.last_profile_set_at = Some(Instant::now());
    }

    /// Drop session, profile and tenant together. Callers hold the write lock
    /// for the whole call, so consumers never observe a half-cleared state.
    pub(crate) fn clear_identity(&mut self) {
        self.session = None;
        self.profile = None;
        self.is_loading = false;
    }

    /// Settled means safe for consumers to read identity/tenant from.
    pub fn is_settled(&self) -> bool {
        !self.is_loading
    }
}

/// Cheap cloneable read handle passed to consumers (views, CRUD services).
#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<RwLock<ReconciliationState>>,
}

impl StateHandle {
    pub(crate) fn new(inner: Arc<RwLock<ReconciliationState>>) -> Self {
        Self { inner }
    }

    /// Read a point-in-time copy of the aggregate.
    pub fn snapshot(&self) -> ReconciliationState {
        self.inner.read().clone()
    }

    /// Tenant id used by every CRUD collaborator to scope its queries.
    /// `None` before the state settles means "not yet known".
    pub fn current_tenant_id(&self) -> Option<uuid::Uuid> {
        self.inner.read().current_tenant_id()
    }
}
