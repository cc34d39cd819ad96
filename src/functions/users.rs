//! Global role administration: the setCustomClaims callable and the shared
//! role-change pipeline behind it.

use super::requests::{SetCustomClaimsRequest, SetCustomClaimsResponse};
use super::{CallableError, CallerContext, Callables};
use crate::profiles::{self, profile_path};
use crate::roles::{normalize_roles, roles_equal};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRolesPatch {
    roles: Vec<String>,
}

impl Callables {
    /// Replaces a user's global role list. Platform-admin only.
    pub async fn set_custom_claims(
        &self,
        ctx: &CallerContext,
        request: &SetCustomClaimsRequest,
    ) -> Result<SetCustomClaimsResponse, CallableError> {
        request.validate()?;
        if !ctx.is_platform_admin() {
            return Err(CallableError::PermissionDenied(
                "platform admin required".to_string(),
            ));
        }

        self.apply_role_change(&request.user_id, &request.roles, &ctx.uid)
            .await
    }

    /// The role-change pipeline: normalize, push claims, and, only when the
    /// stored list actually differs, write the profile and append an audit
    /// entry. Replaying the operation with the same final roles produces no
    /// duplicate writes or log entries.
    pub async fn apply_role_change(
        &self,
        uid: &str,
        requested_roles: &[String],
        actor: &str,
    ) -> Result<SetCustomClaimsResponse, CallableError> {
        let normalized = normalize_roles(requested_roles);

        let loaded = profiles::load_profile(&self.firestore, uid).await?;
        let (doc_id, stored_roles) = match loaded {
            Some(l) => (l.doc_id, l.profile.roles),
            None => (uid.to_string(), Vec::new()),
        };

        let changed = !roles_equal(&stored_roles, &normalized);

        // Claims are the authorization source of truth and go out first; the
        // profile write follows, the audit log comes last.
        self.claims_sync.push_roles(uid, &normalized).await?;

        if changed {
            self.firestore
                .doc(&profile_path(&doc_id))
                .set_merge(&ProfileRolesPatch {
                    roles: normalized.clone(),
                })
                .await?;
            self.claims_sync
                .log_if_changed(uid, &stored_roles, &normalized, actor)
                .await?;
            tracing::info!(uid, actor, roles = ?normalized, "roles changed");
        }

        Ok(SetCustomClaimsResponse {
            roles: normalized,
            changed,
        })
    }
}
