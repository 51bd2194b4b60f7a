use futures_util::future::BoxFuture;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::ProviderError;

use super::principal::Session;

/// Coarse event kinds emitted by the identity provider's auth stream. The
/// provider re-emits `SignedIn` on tab focus / silent token revalidation, so a
/// `SignedIn` carries no guarantee that a real authentication happened; the
/// reconciler disambiguates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    /// Anything else the provider may add over time; always ignored.
    Other(String),
}

/// One notification from the provider's auth-event stream.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self { kind: AuthEventKind::SignedIn, session: Some(session) }
    }
    pub fn signed_out() -> Self {
        Self { kind: AuthEventKind::SignedOut, session: None }
    }
    pub fn token_refreshed(session: Session) -> Self {
        Self { kind: AuthEventKind::TokenRefreshed, session: Some(session) }
    }
}

/// Outcome of a passwordless sign-in request. Discriminated rather than a
/// `Result` because callers render both arms; this surface never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The provider accepted the address and dispatched a magic link.
    Sent,
    Failed(ProviderError),
}

impl SignInOutcome {
    pub fn is_sent(&self) -> bool { matches!(self, SignInOutcome::Sent) }
}

/// Seam to the hosted identity provider. Implementations wrap the real
/// provider SDK; tests script one by hand.
///
/// Subscription model: `subscribe` hands back the receiving half of the event
/// stream. The reconciler owns the task draining it and aborts that task on
/// teardown, which releases the subscription.
pub trait IdentityProvider: Send + Sync {
    /// One-shot read of the current authenticated session, if any.
    fn current_session(&self) -> BoxFuture<'_, Result<Option<Session>, ProviderError>>;

    /// Obtain the auth-event stream.
    fn subscribe(&self) -> UnboundedReceiver<AuthEvent>;

    /// Trigger the passwordless (magic-link) flow for an already-normalized
    /// email address.
    fn sign_in_passwordless(
        &self,
        email: String,
        redirect: Option<String>,
    ) -> BoxFuture<'_, Result<(), ProviderError>>;

    /// Invalidate the provider-side session.
    fn sign_out(&self) -> BoxFuture<'_, Result<(), ProviderError>>;
}
