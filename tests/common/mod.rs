//! Scripted identity-provider and profile-store doubles shared by the
//! integration tests. Responses are queued ahead of time; call counters make
//! "no fetch was triggered" assertions observable.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use tessella::{
    AuthEvent, IdentityProvider, Profile, ProfileFetchError, ProfileStore, ProviderError, Role,
    Session, SubscriptionTier, Tenant,
};

/// Opt-in diagnostics for failing tests: `RUST_LOG=tessella=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn session_for(principal_id: Uuid, email: &str) -> Session {
    Session { principal_id, email: email.to_string() }
}

pub fn profile_for(id: Uuid, role: Role, tenant_id: Option<Uuid>) -> Profile {
    Profile {
        id,
        tenant_id,
        email: format!("{id}@acme.example"),
        display_name: "Test User".to_string(),
        role,
        tenant: None,
    }
}

pub fn tenant_for(id: Uuid) -> Tenant {
    Tenant {
        id,
        name: "Acme Compliance".to_string(),
        email_domain: "acme.example".to_string(),
        tier: SubscriptionTier::Standard,
    }
}

#[derive(Default)]
pub struct MockProvider {
    initial_session: Mutex<Option<Session>>,
    event_tx: Mutex<Option<UnboundedSender<AuthEvent>>>,
    sign_in_result: Mutex<Option<ProviderError>>,
    sign_out_result: Mutex<Option<ProviderError>>,
    pub sign_in_requests: Mutex<Vec<(String, Option<String>)>>,
    pub sign_out_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let p = Self::default();
        *p.initial_session.lock() = Some(session);
        p
    }

    pub fn fail_sign_in(&self, msg: &str) {
        *self.sign_in_result.lock() = Some(ProviderError::new(msg));
    }

    pub fn fail_sign_out(&self, msg: &str) {
        *self.sign_out_result.lock() = Some(ProviderError::new(msg));
    }

    /// Push an event into the subscribed stream, as the real provider would.
    pub fn emit(&self, event: AuthEvent) {
        let guard = self.event_tx.lock();
        let tx = guard.as_ref().expect("no subscriber attached");
        tx.send(event).expect("event loop dropped the receiver");
    }
}

impl IdentityProvider for MockProvider {
    fn current_session(&self) -> BoxFuture<'_, Result<Option<Session>, ProviderError>> {
        let s = self.initial_session.lock().clone();
        Box::pin(async move { Ok(s) })
    }

    fn subscribe(&self) -> UnboundedReceiver<AuthEvent> {
        let (tx, rx) = unbounded_channel();
        *self.event_tx.lock() = Some(tx);
        rx
    }

    fn sign_in_passwordless(
        &self,
        email: String,
        redirect: Option<String>,
    ) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.sign_in_requests.lock().push((email, redirect));
        let err = self.sign_in_result.lock().clone();
        Box::pin(async move {
            match err {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), ProviderError>> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let err = self.sign_out_result.lock().clone();
        Box::pin(async move {
            match err {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }
}

#[derive(Default)]
pub struct MockStore {
    profile_script: Mutex<VecDeque<Result<Profile, ProfileFetchError>>>,
    tenant_script: Mutex<VecDeque<Result<Tenant, ProfileFetchError>>>,
    /// Artificial latency applied to every query; lets tests observe
    /// mid-flight state and force timeouts.
    delay: Mutex<Duration>,
    pub profile_calls: AtomicUsize,
    pub tenant_calls: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_profile(&self, r: Result<Profile, ProfileFetchError>) {
        self.profile_script.lock().push_back(r);
    }

    pub fn push_tenant(&self, r: Result<Tenant, ProfileFetchError>) {
        self.tenant_script.lock().push_back(r);
    }

    pub fn set_delay(&self, d: Duration) {
        *self.delay.lock() = d;
    }

    pub fn profile_call_count(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn tenant_call_count(&self) -> usize {
        self.tenant_calls.load(Ordering::SeqCst)
    }
}

impl ProfileStore for MockStore {
    fn profile_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Profile, ProfileFetchError>> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .profile_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProfileFetchError::Other(format!("unscripted profile fetch for {id}"))));
        let delay = *self.delay.lock();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            next
        })
    }

    fn tenant_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Tenant, ProfileFetchError>> {
        self.tenant_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .tenant_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProfileFetchError::Other(format!("unscripted tenant fetch for {id}"))));
        let delay = *self.delay.lock();
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            next
        })
    }
}
