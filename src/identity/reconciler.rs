//!
//! Session reconciler
//! ------------------
//! Owns the canonical signed-in/profile/tenant view and the policy that turns
//! identity-provider auth events into consistent state transitions:
//!
//! - fake-sign-in suppression: the provider re-emits a full `signed-in`
//!   notification when a browser tab regains focus and silently revalidates
//!   its token; re-running the profile fetch on every such event would cause
//!   visible reloading and can demote a super-administrator if an intervening
//!   authorization check transiently fails. A `signed-in` for the currently
//!   held principal within the configured window is therefore a session-only
//!   update.
//! - at most one profile resolution in flight; concurrent attempts are
//!   dropped, not queued.
//! - one bounded provisioning retry when the store denies a fresh principal
//!   whose row the backend has not committed yet.
//! - a previously resolved profile survives a denied refresh.
//! - super-administrators get a synthesized platform tenant instead of a
//!   tenant fetch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ReconcilerConfig;
use crate::error::{ProfileFetchError, ProviderError};

use super::principal::{platform_tenant, Profile, Session};
use super::provider::{AuthEvent, AuthEventKind, IdentityProvider, SignInOutcome};
use super::state::{ReconciliationState, StateHandle};
use super::store::ProfileStore;

const LOG_TARGET: &str = "tessella::reconciler";

struct Inner {
    config: ReconcilerConfig,
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
    state: Arc<RwLock<ReconciliationState>>,
    /// Cleared on teardown; a retry or event that fires afterwards is a no-op.
    alive: AtomicBool,
    /// True between scheduling the provisioning retry and its execution; while
    /// set, `is_loading` stays true so consumers keep waiting for the retry.
    retry_pending: AtomicBool,
    retry_task: Mutex<Option<JoinHandle<()>>>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

/// The session reconciliation core. Construct exactly one per application via
/// [`SessionReconciler::start`] and hand [`StateHandle`] clones to consumers.
pub struct SessionReconciler {
    inner: Arc<Inner>,
}

impl SessionReconciler {
    /// Validate configuration, perform the initial session read and profile
    /// resolution, then subscribe to the provider's auth-event stream.
    ///
    /// Always returns an instance: configuration failure is reported through
    /// the persistent `config_error` state field, after which no further
    /// identity operations run.
    pub async fn start(
        config: ReconcilerConfig,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        let inner = Arc::new(Inner {
            config,
            provider,
            store,
            state: Arc::new(RwLock::new(ReconciliationState::default())),
            alive: AtomicBool::new(true),
            retry_pending: AtomicBool::new(false),
            retry_task: Mutex::new(None),
            loop_task: Mutex::new(None),
        });

        if let Err(e) = inner.config.provider.validate() {
            error!(target: LOG_TARGET, "identity provider configuration invalid: {e}");
            {
                let mut st = inner.state.write();
                st.config_error = Some(e);
                st.is_loading = false;
            }
            return Self { inner };
        }

        match inner.provider.current_session().await {
            Ok(Some(session)) => {
                let principal_id = session.principal_id;
                debug!(target: LOG_TARGET, "existing session found for principal {principal_id}");
                inner.state.write().session = Some(session);
                let _ = Inner::resolve_profile(&inner, principal_id, 0).await;
                Inner::settle_loading(&inner);
            }
            Ok(None) => {
                debug!(target: LOG_TARGET, "no existing session, settling anonymous");
                inner.state.write().is_loading = false;
            }
            Err(e) => {
                // Unreachable provider is not a config error; settle anonymous
                // and let a later auth event re-establish identity.
                warn!(target: LOG_TARGET, "initial session read failed: {e}");
                inner.state.write().is_loading = false;
            }
        }

        let mut rx = inner.provider.subscribe();
        let task_inner = Arc::clone(&inner);
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !task_inner.alive.load(Ordering::SeqCst) {
                    break;
                }
                Inner::handle_event(&task_inner, event).await;
            }
        });
        *inner.loop_task.lock() = Some(handle);

        Self { inner }
    }

    /// Cloneable read view for consumers.
    pub fn state_handle(&self) -> StateHandle {
        StateHandle::new(Arc::clone(&self.inner.state))
    }

    /// Point-in-time copy of the aggregate.
    pub fn snapshot(&self) -> ReconciliationState {
        self.inner.state.read().clone()
    }

    /// Tenant id for scoping CRUD queries; `None` while not settled means
    /// "not yet known", not "no tenant".
    pub fn current_tenant_id(&self) -> Option<Uuid> {
        self.inner.state.read().current_tenant_id()
    }

    /// Request a passwordless sign-in for `email`. The address is normalized
    /// (trimmed, lowercased) before delegation. Never panics or errors
    /// through; both arms are rendered by the caller.
    pub async fn sign_in(&self, email: &str) -> SignInOutcome {
        let config_err = self.inner.state.read().config_error.clone();
        if let Some(e) = config_err {
            warn!(target: LOG_TARGET, "ignoring sign-in request, configuration invalid: {e}");
            return SignInOutcome::Failed(ProviderError::new(e.to_string()));
        }
        let normalized = email.trim().to_lowercase();
        let redirect = self.inner.config.email_redirect.clone();
        match self.inner.provider.sign_in_passwordless(normalized.clone(), redirect).await {
            Ok(()) => {
                info!(target: LOG_TARGET, "magic link dispatched to {normalized}");
                SignInOutcome::Sent
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "passwordless sign-in failed for {normalized}: {e}");
                SignInOutcome::Failed(e)
            }
        }
    }

    /// Sign out remotely, then unconditionally clear the local session,
    /// profile and tenant even if the remote call failed. The UI must never
    /// straddle a half-signed-out state.
    pub async fn sign_out(&self) {
        Inner::force_sign_out(&self.inner).await;
    }

    /// Transition entry point for one auth event. Driven by the subscription
    /// loop; public so deterministic tests can feed events directly.
    pub async fn handle_event(&self, event: AuthEvent) {
        Inner::handle_event(&self.inner, event).await;
    }

    /// Resolve the profile for `principal_id`. Returns whether a usable
    /// profile ended up set, including the kept-the-prior-profile case.
    /// A call while another resolution is in flight is dropped and returns
    /// false.
    pub async fn resolve_profile(&self, principal_id: Uuid, attempt: u32) -> bool {
        if self.inner.state.read().config_error.is_some() {
            return false;
        }
        Inner::resolve_profile(&self.inner, principal_id, attempt).await
    }

    /// Release the event subscription and cancel any pending provisioning
    /// retry. Idempotent.
    pub fn shutdown(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        self.inner.retry_pending.store(false, Ordering::SeqCst);
        if let Some(h) = self.inner.loop_task.lock().take() {
            h.abort();
        }
        if let Some(h) = self.inner.retry_task.lock().take() {
            h.abort();
        }
    }
}

impl Drop for SessionReconciler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    async fn handle_event(inner: &Arc<Inner>, event: AuthEvent) {
        // Terminal regime: without valid configuration no identity operation
        // is meaningful.
        if inner.state.read().config_error.is_some() {
            return;
        }
        match event.kind {
            AuthEventKind::SignedIn => {
                let Some(session) = event.session else {
                    debug!(target: LOG_TARGET, "signed-in event without session payload, ignoring");
                    return;
                };
                if Self::is_fake_sign_in(inner, &session) {
                    debug!(
                        target: LOG_TARGET,
                        "suppressing re-emitted sign-in for principal {}", session.principal_id
                    );
                    inner.state.write().session = Some(session);
                    return;
                }
                let principal_id = session.principal_id;
                {
                    let mut st = inner.state.write();
                    st.is_loading = true;
                    st.session = Some(session);
                }
                let _ = Self::resolve_profile(inner, principal_id, 0).await;
                Self::settle_loading(inner);
            }
            AuthEventKind::TokenRefreshed => {
                // Session-only update; profile/tenant/loading are never touched.
                if let Some(session) = event.session {
                    inner.state.write().session = Some(session);
                }
            }
            AuthEventKind::SignedOut => {
                debug!(target: LOG_TARGET, "signed-out event, clearing identity");
                Self::cancel_pending_retry(inner);
                inner.state.write().clear_identity();
            }
            AuthEventKind::Other(kind) => {
                debug!(target: LOG_TARGET, "ignoring auth event kind '{kind}'");
            }
        }
    }

    /// Narrow guard by design: same principal as the held profile AND a recent
    /// profile replacement. Any other combination is a real sign-in.
    fn is_fake_sign_in(inner: &Arc<Inner>, session: &Session) -> bool {
        let st = inner.state.read();
        let Some(profile) = st.profile.as_ref() else { return false };
        if profile.id != session.principal_id {
            return false;
        }
        match st.last_profile_set_at {
            Some(at) => at.elapsed() < inner.config.fake_signin_window,
            None => false,
        }
    }

    async fn resolve_profile(inner: &Arc<Inner>, principal_id: Uuid, attempt: u32) -> bool {
        // In-flight guard, checked and set under the state lock. The live
        // record is consulted at resume time, never a stale capture.
        {
            let mut st = inner.state.write();
            if st.is_fetching_profile {
                debug!(
                    target: LOG_TARGET,
                    "profile resolution already in flight, dropping attempt for {principal_id}"
                );
                return false;
            }
            st.is_fetching_profile = true;
        }
        let resolved = Self::resolve_profile_guarded(inner, principal_id, attempt).await;
        inner.state.write().is_fetching_profile = false;
        resolved
    }

    async fn resolve_profile_guarded(inner: &Arc<Inner>, principal_id: Uuid, attempt: u32) -> bool {
        let fetched = match tokio::time::timeout(
            inner.config.fetch_timeout,
            inner.store.profile_by_id(principal_id),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(ProfileFetchError::Timeout),
        };

        match fetched {
            Ok(mut profile) => {
                Self::resolve_tenant(inner, &mut profile).await;
                debug!(
                    target: LOG_TARGET,
                    "profile resolved for {principal_id} role={:?} tenant={:?}",
                    profile.role,
                    profile.tenant.as_ref().map(|t| t.id)
                );
                inner.state.write().set_profile(profile);
                true
            }
            Err(ProfileFetchError::NotFound) => {
                // A principal the provider authenticated but the profile table
                // does not know is an orphaned account, not a retryable
                // condition.
                warn!(
                    target: LOG_TARGET,
                    "no profile row for principal {principal_id}, forcing sign-out"
                );
                Self::force_sign_out(inner).await;
                false
            }
            Err(ProfileFetchError::Denied) if attempt == 0 => {
                // New principal whose server-side provisioning trigger has not
                // committed yet; one bounded retry, prior state untouched.
                debug!(
                    target: LOG_TARGET,
                    "store denied first attempt for {principal_id}, scheduling provisioning retry"
                );
                Self::schedule_retry(inner, principal_id);
                false
            }
            Err(ProfileFetchError::Denied) => {
                let held = inner.state.read().profile.is_some();
                if held {
                    info!(
                        target: LOG_TARGET,
                        "refresh denied for {principal_id}, retaining previously resolved profile"
                    );
                } else {
                    warn!(target: LOG_TARGET, "store denied retry for {principal_id}, no profile held");
                }
                held
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "profile fetch failed for {principal_id}: {e}");
                false
            }
        }
    }

    async fn resolve_tenant(inner: &Arc<Inner>, profile: &mut Profile) {
        if profile.is_super_administrator() && profile.tenant_id.is_none() {
            // Cross-tenant operator with no backing tenant record.
            profile.tenant = Some(platform_tenant());
            return;
        }
        let Some(tenant_id) = profile.tenant_id else {
            // Unusual but legal: profile without a tenant assignment.
            profile.tenant = None;
            return;
        };
        let fetched = match tokio::time::timeout(
            inner.config.fetch_timeout,
            inner.store.tenant_by_id(tenant_id),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(ProfileFetchError::Timeout),
        };
        match fetched {
            Ok(tenant) => profile.tenant = Some(tenant),
            Err(e) => {
                // Degraded, not fatal: the profile stands, the tenant stays
                // unknown until the next genuine sign-in.
                warn!(
                    target: LOG_TARGET,
                    "tenant {tenant_id} fetch failed, continuing without tenant: {e}"
                );
                profile.tenant = None;
            }
        }
    }

    fn schedule_retry(inner: &Arc<Inner>, principal_id: Uuid) {
        inner.retry_pending.store(true, Ordering::SeqCst);
        let task_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(task_inner.config.retry_delay).await;
            task_inner.retry_pending.store(false, Ordering::SeqCst);
            if !task_inner.alive.load(Ordering::SeqCst) {
                return;
            }
            // A sign-out may have landed while the retry slept; a retry for a
            // principal that no longer holds the session must not resurrect a
            // profile.
            let still_current = task_inner
                .state
                .read()
                .session
                .as_ref()
                .map(|s| s.principal_id == principal_id)
                .unwrap_or(false);
            if !still_current {
                debug!(
                    target: LOG_TARGET,
                    "dropping provisioning retry for {principal_id}, session no longer held"
                );
                return;
            }
            let _ = Inner::resolve_profile(&task_inner, principal_id, 1).await;
            task_inner.state.write().is_loading = false;
        });
        if let Some(old) = inner.retry_task.lock().replace(handle) {
            old.abort();
        }
    }

    /// Abort a pending provisioning retry. Called on every identity clear so
    /// a retry scheduled before a sign-out can never fire after it.
    fn cancel_pending_retry(inner: &Arc<Inner>) {
        inner.retry_pending.store(false, Ordering::SeqCst);
        if let Some(h) = inner.retry_task.lock().take() {
            h.abort();
        }
    }

    /// Completion of a sign-in transition: loading settles unless the
    /// provisioning retry is still pending, in which case the retry task
    /// settles it.
    fn settle_loading(inner: &Arc<Inner>) {
        if inner.retry_pending.load(Ordering::SeqCst) {
            return;
        }
        inner.state.write().is_loading = false;
    }

    async fn force_sign_out(inner: &Arc<Inner>) {
        Self::cancel_pending_retry(inner);
        if let Err(e) = inner.provider.sign_out().await {
            warn!(
                target: LOG_TARGET,
                "provider sign-out failed, clearing local session anyway: {e}"
            );
        }
        inner.state.write().clear_identity();
    }
}
