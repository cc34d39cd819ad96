//! Legacy default-tenant compatibility shim.
//!
//! Older clients read a flat `subscriptionActive`/`subscriptionRenewalDate`
//! pair and the global role list straight off the user profile instead of the
//! tenant-scoped entitlement. That behavior is kept behind a trait invoked
//! after the tenant-scoped write, so only the configured default tenant ever
//! takes the legacy path and new tenants cannot trigger it by accident.

use super::CallableError;
use crate::firestore::Firestore;
use crate::play::VerifiedSubscription;
use crate::profiles::{self, profile_path, UserProfile};
use crate::roles::{normalize_roles, roles_equal, ClaimsSync, ROLE_PAID_USER};
use async_trait::async_trait;
use serde::Serialize;

#[async_trait]
pub trait LegacyMirror: Send + Sync {
    /// Mirrors a verified purchase into the legacy flat fields when the
    /// tenant is the legacy default tenant. Returns whether the global role
    /// list changed.
    async fn mirror_purchase(
        &self,
        uid: &str,
        tenant_id: &str,
        verified: &VerifiedSubscription,
    ) -> Result<bool, CallableError>;
}

/// Shim used by deployments without any legacy clients.
pub struct NoLegacyMirror;

#[async_trait]
impl LegacyMirror for NoLegacyMirror {
    async fn mirror_purchase(
        &self,
        _uid: &str,
        _tenant_id: &str,
        _verified: &VerifiedSubscription,
    ) -> Result<bool, CallableError> {
        Ok(false)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacySubscriptionPatch {
    subscription_active: bool,
    subscription_renewal_date: Option<i64>,
    roles: Vec<String>,
}

/// Production shim: mirrors into `users/{uid}` and pushes claims for the
/// default tenant only.
pub struct DefaultTenantMirror {
    default_tenant_id: String,
    firestore: Firestore,
    claims_sync: ClaimsSync,
}

impl DefaultTenantMirror {
    pub fn new(default_tenant_id: String, firestore: Firestore, claims_sync: ClaimsSync) -> Self {
        Self {
            default_tenant_id,
            firestore,
            claims_sync,
        }
    }
}

#[async_trait]
impl LegacyMirror for DefaultTenantMirror {
    async fn mirror_purchase(
        &self,
        uid: &str,
        tenant_id: &str,
        verified: &VerifiedSubscription,
    ) -> Result<bool, CallableError> {
        if tenant_id != self.default_tenant_id {
            return Ok(false);
        }

        let loaded = profiles::load_profile(&self.firestore, uid).await?;
        let (doc_id, profile) = match loaded {
            Some(l) => (l.doc_id, l.profile),
            None => (uid.to_string(), UserProfile::default()),
        };

        let old_roles = profile.roles.clone();
        let mut roles: Vec<String> = old_roles
            .iter()
            .filter(|r| r.as_str() != ROLE_PAID_USER)
            .cloned()
            .collect();
        if verified.active {
            roles.push(ROLE_PAID_USER.to_string());
        }
        let new_roles = normalize_roles(&roles);

        // Claims first, then the profile document, audit log last: a partial
        // failure leaves the log missing, never the claims stale.
        self.claims_sync.push_roles(uid, &new_roles).await?;

        let patch = LegacySubscriptionPatch {
            subscription_active: verified.active,
            subscription_renewal_date: verified.expiry_millis,
            roles: new_roles.clone(),
        };
        self.firestore
            .doc(&profile_path(&doc_id))
            .set_merge(&patch)
            .await?;

        self.claims_sync
            .log_if_changed(uid, &old_roles, &new_roles, "verifySubscription")
            .await?;

        Ok(!roles_equal(&old_roles, &new_roles))
    }
}
