//! Membership synchronization.
//!
//! `MembershipSync` rewrites a tenant's membership record together with the
//! user's cross-tenant index entry in one transaction, so no reader ever
//! observes the two disagreeing on role/status/featureRoles/premium.

pub mod models;

#[cfg(test)]
mod tests;

use crate::entitlements::EffectiveEntitlement;
use crate::firestore::transaction::Transaction;
use crate::firestore::{Firestore, FirestoreError};
use chrono::Utc;
use models::{
    member_path, user_tenants_path, MemberRole, MemberStatus, MembershipRecord, ProfileSnapshot,
    TenantIndexEntry, UserTenantsIndex,
};

/// Fields to change on a membership; anything left `None` is preserved.
#[derive(Debug, Default, Clone)]
pub struct MembershipPatch {
    pub role: Option<MemberRole>,
    pub status: Option<MemberStatus>,
    pub profile: Option<ProfileSnapshot>,
    pub billing: Option<EffectiveEntitlement>,
    pub feature_roles: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct MembershipSync {
    firestore: Firestore,
}

impl MembershipSync {
    pub fn new(firestore: Firestore) -> Self {
        Self { firestore }
    }

    /// Applies `patch` to the (tenant, user) membership in its own
    /// transaction. Returns the record as written.
    pub async fn sync(
        &self,
        tenant_id: &str,
        uid: &str,
        patch: &MembershipPatch,
    ) -> Result<MembershipRecord, FirestoreError> {
        self.firestore
            .run_transaction(|txn| async move {
                Self::apply_in(&txn, tenant_id, uid, patch).await
            })
            .await
    }

    /// Applies `patch` inside a caller-owned transaction, so operations that
    /// also rewrite the entitlement document commit everything atomically.
    ///
    /// A missing membership defaults to viewer/active with `createdAt` set to
    /// server time; an existing one keeps its role/status unless the patch
    /// names them, which is what makes re-joining idempotent.
    pub async fn apply_in(
        txn: &Transaction,
        tenant_id: &str,
        uid: &str,
        patch: &MembershipPatch,
    ) -> Result<MembershipRecord, FirestoreError> {
        let doc_path = member_path(tenant_id, uid);
        let now = Utc::now().to_rfc3339();

        let mut membership: MembershipRecord = txn.get(&doc_path).await?.unwrap_or_default();
        if membership.created_at.is_none() {
            membership.created_at = Some(now.clone());
        }

        if let Some(role) = patch.role {
            membership.role = role;
        }
        if let Some(status) = patch.status {
            membership.status = status;
        }
        if let Some(profile) = &patch.profile {
            membership.profile = Some(profile.clone());
        }
        if let Some(billing) = &patch.billing {
            membership.billing = Some(billing.clone());
        }
        if let Some(feature_roles) = &patch.feature_roles {
            membership.feature_roles = feature_roles.clone();
        }
        membership.updated_at = Some(now);

        txn.set(&doc_path, &membership)?;

        let index_path = user_tenants_path(uid);
        let mut index: UserTenantsIndex = txn.get(&index_path).await?.unwrap_or_default();
        index.tenants.insert(
            tenant_id.to_string(),
            TenantIndexEntry::from_membership(&membership),
        );
        txn.set(&index_path, &index)?;

        Ok(membership)
    }
}
