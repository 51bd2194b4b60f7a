//! tessella: session reconciliation core for a multi-tenant compliance platform.
//!
//! The crate owns the canonical in-memory answer to "who is signed in, as whom,
//! under which tenant". It sits between an external identity provider's
//! asynchronous auth-event stream and the application views / per-entity CRUD
//! services that read the reconciled identity. Everything else (the provider
//! itself, the profile store backend, the CRUD entities) is an external
//! collaborator reached through the traits in `identity::provider` and
//! `identity::store`.

pub mod config;
pub mod error;
pub mod identity;

pub use config::{ProviderConfig, ReconcilerConfig};
pub use error::{ConfigError, ProfileFetchError, ProviderError};
pub use identity::{
    platform_tenant, AuthEvent, AuthEventKind, IdentityProvider, Profile, ProfileStore,
    ReconciliationState, Role, Session, SessionReconciler, SignInOutcome, StateHandle,
    SubscriptionTier, Tenant, PLATFORM_TENANT_ID,
};
