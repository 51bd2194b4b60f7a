use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::error::ProfileFetchError;

use super::principal::{Profile, Tenant};

/// Seam to the tenant-scoped profile store. The backend provisions profile
/// rows out of band when a principal first authenticates, so reads can race
/// server-side authorization policies that have not committed yet; the
/// reconciler owns that retry policy, the store just reports what it saw.
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile row for a principal. Implementations must return the
    /// profile with `tenant: None`; tenant resolution belongs to the caller.
    fn profile_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Profile, ProfileFetchError>>;

    /// Fetch a tenant record by id.
    fn tenant_by_id(&self, id: Uuid) -> BoxFuture<'_, Result<Tenant, ProfileFetchError>>;
}
