use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated principal as reported by the identity provider. Ephemeral:
/// owned by the provider, only ever read by the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub principal_id: Uuid,
    pub email: String,
}

/// Closed role set for tenant-scoped profiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Manager,
    Administrator,
    /// Cross-tenant operator. Has no backing tenant record; resolution
    /// synthesizes [`platform_tenant`] instead of fetching one.
    SuperAdministrator,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Starter,
    Standard,
    Enterprise,
    /// Reserved for the synthesized platform tenant.
    Internal,
}

/// An isolated customer organization. All CRUD data elsewhere in the
/// application is scoped to exactly one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub email_domain: String,
    pub tier: SubscriptionTier,
}

/// Tenant-scoped application identity for a principal.
///
/// `id` equals the provider session's principal id by construction; the core
/// never joins the two at runtime. A profile is replaced wholesale or not at
/// all: no code path partially overwrites one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    /// Resolved alongside the profile: fetched by `tenant_id`, synthesized for
    /// super-administrators, or left `None` when the tenant fetch degraded.
    pub tenant: Option<Tenant>,
}

impl Profile {
    pub fn is_super_administrator(&self) -> bool {
        matches!(self.role, Role::SuperAdministrator)
    }
}

/// Sentinel id of the synthesized cross-tenant context. Well-known so that
/// downstream scoping code can recognize it.
pub const PLATFORM_TENANT_ID: Uuid = Uuid::from_u128(u128::MAX);

/// The virtual tenant granted to super-administrators. Never fetched, never
/// persisted; identical for every super-administrator session.
pub fn platform_tenant() -> Tenant {
    Tenant {
        id: PLATFORM_TENANT_ID,
        name: "Platform Operations".to_string(),
        email_domain: "platform.internal".to_string(),
        tier: SubscriptionTier::Internal,
    }
}
