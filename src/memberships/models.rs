use crate::entitlements::EffectiveEntitlement;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const USER_TENANTS_COLLECTION: &str = "userTenants";

/// Feature-role tag for the sign-language variant content set.
pub const FEATURE_ROLE_JW: &str = "jw";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Viewer,
    Analyst,
    Editor,
    Admin,
    Owner,
}

impl MemberRole {
    /// Whether this role can administer tenant members.
    pub fn is_admin(self) -> bool {
        matches!(self, MemberRole::Admin | MemberRole::Owner)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberRole::Viewer => "viewer",
            MemberRole::Analyst => "analyst",
            MemberRole::Editor => "editor",
            MemberRole::Admin => "admin",
            MemberRole::Owner => "owner",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Active,
    Inactive,
}

/// Cached copy of profile data owned by the identity provider / profile doc.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSnapshot {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub provider: Option<String>,
    pub country: Option<String>,
    pub hearing_status: Option<String>,
}

/// The `tenants/{tenantId}/members/{uid}` document.
///
/// `profile` and `billing` are denormalized caches; they are overwritten
/// whole whenever their source changes and may be stale in between, but the
/// `role`/`status`/`feature_roles` fields are owned here and authoritative.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default)]
    pub feature_roles: Vec<String>,
    pub profile: Option<ProfileSnapshot>,
    pub billing: Option<EffectiveEntitlement>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl MembershipRecord {
    pub fn premium(&self) -> bool {
        self.billing.as_ref().map(|b| b.active).unwrap_or(false)
    }
}

/// Per-tenant entry in the cross-tenant index, kept in lockstep with the
/// membership record in the same transaction.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TenantIndexEntry {
    pub role: MemberRole,
    pub status: MemberStatus,
    #[serde(default)]
    pub feature_roles: Vec<String>,
    pub premium: bool,
}

impl TenantIndexEntry {
    pub fn from_membership(membership: &MembershipRecord) -> Self {
        Self {
            role: membership.role,
            status: membership.status,
            feature_roles: membership.feature_roles.clone(),
            premium: membership.premium(),
        }
    }
}

/// The `userTenants/{uid}` document: tenantId -> index entry.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserTenantsIndex {
    #[serde(default)]
    pub tenants: HashMap<String, TenantIndexEntry>,
}

pub fn member_path(tenant_id: &str, uid: &str) -> String {
    format!("tenants/{}/members/{}", tenant_id, uid)
}

pub fn entitlement_path(tenant_id: &str, uid: &str) -> String {
    format!("tenants/{}/entitlements/{}", tenant_id, uid)
}

pub fn user_tenants_path(uid: &str) -> String {
    format!("{}/{}", USER_TENANTS_COLLECTION, uid)
}
