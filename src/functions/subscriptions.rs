//! Purchase verification and self-service subscription reconciliation.

use super::requests::{
    ReconcileRolesResponse, VerifySubscriptionRequest, VerifySubscriptionResponse,
};
use super::{CallableError, CallerContext, Callables};
use crate::entitlements::{EntitlementRecord, PurchaseRecord, PLATFORM_ANDROID};
use crate::memberships::models::entitlement_path;
use crate::memberships::{MembershipPatch, MembershipSync};
use crate::play::resolve_sku_map;
use crate::profiles::{self, profile_path};
use crate::roles::{normalize_roles, roles_equal, ROLE_PAID_USER};
use chrono::Utc;
use serde::Serialize;

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRolesPatch {
    roles: Vec<String>,
}

impl Callables {
    /// Verifies a store receipt and makes the (tenant, user) entitlement,
    /// the membership billing snapshot, and (for the legacy default tenant)
    /// the flat user-roles fields reflect the result.
    ///
    /// Nothing is written unless the receipt verification itself succeeds.
    pub async fn verify_subscription(
        &self,
        ctx: &CallerContext,
        request: &VerifySubscriptionRequest,
    ) -> Result<VerifySubscriptionResponse, CallableError> {
        request.validate()?;
        self.check_abuse_guard(request.guard_token.as_deref()).await?;

        let tenant = self.load_tenant(&request.tenant_id).await?;
        let is_default = request.tenant_id == self.config.default_tenant_id;

        let sku_map = resolve_sku_map(&tenant, is_default).ok_or_else(|| {
            CallableError::FailedPrecondition(format!(
                "tenant '{}' has no product mapping configured",
                request.tenant_id
            ))
        })?;

        // A product id registered for another tenant must not unlock this one.
        let subscription_type = sku_map.get(&request.product_id).ok_or_else(|| {
            CallableError::PermissionDenied(format!(
                "product '{}' is not registered for tenant '{}'",
                request.product_id, request.tenant_id
            ))
        })?;

        let verified = self
            .play
            .verify(
                &request.product_id,
                &request.purchase_token,
                subscription_type,
                now_millis(),
            )
            .await?;

        let uid = ctx.uid.as_str();
        let tenant_id = request.tenant_id.as_str();
        let verified_ref = &verified;

        self.firestore
            .run_transaction(|txn| async move {
                let path = entitlement_path(tenant_id, uid);
                let mut entitlement: EntitlementRecord =
                    txn.get(&path).await?.unwrap_or_default();

                entitlement.purchase = PurchaseRecord {
                    active: verified_ref.active,
                    expiry_millis: verified_ref.expiry_millis,
                    platform: Some(PLATFORM_ANDROID.to_string()),
                    subscription_type: Some(verified_ref.subscription_type.clone()),
                    product_id: Some(verified_ref.product_id.clone()),
                };
                entitlement.recompute_effective(now_millis());
                entitlement.updated_at = Some(Utc::now().to_rfc3339());
                txn.set(&path, &entitlement)?;

                let patch = MembershipPatch {
                    billing: Some(entitlement.effective.clone()),
                    ..MembershipPatch::default()
                };
                MembershipSync::apply_in(&txn, tenant_id, uid, &patch).await?;
                Ok(())
            })
            .await?;

        let roles_updated = self
            .legacy
            .mirror_purchase(uid, tenant_id, &verified)
            .await?;

        tracing::info!(
            tenant_id,
            uid,
            active = verified.active,
            roles_updated,
            "subscription verified"
        );

        Ok(VerifySubscriptionResponse {
            active: verified.active,
            renewal_date: verified.expiry_millis,
            roles_updated,
        })
    }

    /// Self-service reconciliation of the caller's `paidUser` role against
    /// the legacy renewal-date field. There is no real-time store webhook,
    /// so a cancellation only takes effect when the client calls this after
    /// the period end.
    ///
    /// Reads the legacy flat fields and is therefore only meaningful for
    /// users of the default tenant.
    pub async fn reconcile_subscription_roles(
        &self,
        ctx: &CallerContext,
    ) -> Result<ReconcileRolesResponse, CallableError> {
        let loaded = profiles::load_profile(&self.firestore, &ctx.uid)
            .await?
            .ok_or_else(|| {
                CallableError::NotFound(format!("profile for '{}' not found", ctx.uid))
            })?;

        let active = loaded
            .profile
            .subscription_renewal_date
            .map(|renewal| renewal > now_millis())
            .unwrap_or(false);

        let old_roles = loaded.profile.roles.clone();
        let mut roles: Vec<String> = old_roles
            .iter()
            .filter(|r| r.as_str() != ROLE_PAID_USER)
            .cloned()
            .collect();
        if active {
            roles.push(ROLE_PAID_USER.to_string());
        }
        let new_roles = normalize_roles(&roles);

        if !roles_equal(&old_roles, &new_roles) {
            // Claims before the profile write; audit log last.
            self.claims_sync.push_roles(&ctx.uid, &new_roles).await?;
            self.firestore
                .doc(&profile_path(&loaded.doc_id))
                .set_merge(&ProfileRolesPatch {
                    roles: new_roles.clone(),
                })
                .await?;
            self.claims_sync
                .log_if_changed(&ctx.uid, &old_roles, &new_roles, &ctx.uid)
                .await?;
            tracing::info!(uid = %ctx.uid, active, "subscription roles reconciled");
        }

        Ok(ReconcileRolesResponse {
            active,
            roles: new_roles,
        })
    }
}
