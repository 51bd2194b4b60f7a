//! Central identity and session reconciliation for the platform.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod reconciler;
mod state;
mod store;

pub use principal::{
    platform_tenant, Profile, Role, Session, SubscriptionTier, Tenant, PLATFORM_TENANT_ID,
};
pub use provider::{AuthEvent, AuthEventKind, IdentityProvider, SignInOutcome};
pub use reconciler::SessionReconciler;
pub use state::{ReconciliationState, StateHandle};
pub use store::ProfileStore;
