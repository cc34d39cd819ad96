//! Tenant membership administration operations.

use super::requests::{
    JoinTenantRequest, JoinTenantResponse, PurgeWordMediaRequest, PurgeWordMediaResponse,
    RefreshMemberProfileRequest, SetMemberAccessRequest, SetMemberAccessResponse,
    SetMemberRoleRequest, UpdateMemberProfileRequest,
};
use super::{CallableError, CallerContext, Callables};
use crate::entitlements::{EntitlementRecord, ManualGrant};
use crate::memberships::models::{
    entitlement_path, member_path, MembershipRecord, ProfileSnapshot, FEATURE_ROLE_JW,
};
use crate::memberships::{MembershipPatch, MembershipSync};
use crate::profiles;
use crate::tenants::TenantVisibility;
use chrono::Utc;

const WORD_MEDIA_KINDS: &[&str] = &["audio.mp3", "video.mp4", "thumbnail.jpg"];

impl Callables {
    /// Joins the caller to a tenant. Private tenants require a platform
    /// admin; public tenants admit any authenticated user as a viewer.
    /// Re-joining an existing member refreshes the denormalized snapshots but
    /// leaves role and status untouched.
    pub async fn join_tenant(
        &self,
        ctx: &CallerContext,
        request: &JoinTenantRequest,
    ) -> Result<JoinTenantResponse, CallableError> {
        request.validate()?;
        self.check_abuse_guard(request.guard_token.as_deref()).await?;

        let tenant = self.load_tenant(&request.tenant_id).await?;
        if tenant.visibility == TenantVisibility::Private && !ctx.is_platform_admin() {
            return Err(CallableError::PermissionDenied(format!(
                "tenant '{}' is private",
                request.tenant_id
            )));
        }

        let already_member = self
            .firestore
            .doc(&member_path(&request.tenant_id, &ctx.uid))
            .get::<MembershipRecord>()
            .await?
            .is_some();

        let patch = MembershipPatch {
            profile: self.profile_snapshot(&ctx.uid).await,
            billing: self.billing_snapshot(&request.tenant_id, &ctx.uid).await,
            ..MembershipPatch::default()
        };
        let membership = self
            .membership_sync
            .sync(&request.tenant_id, &ctx.uid, &patch)
            .await?;

        tracing::info!(
            tenant_id = %request.tenant_id,
            uid = %ctx.uid,
            already_member,
            "tenant joined"
        );

        Ok(JoinTenantResponse {
            role: membership.role,
            status: membership.status,
            already_member,
        })
    }

    /// Sets a member's role and status. Tenant admin/owner or platform admin.
    pub async fn set_tenant_member_role(
        &self,
        ctx: &CallerContext,
        request: &SetMemberRoleRequest,
    ) -> Result<MembershipRecord, CallableError> {
        let (role, status) = request.validate()?;
        self.require_tenant_admin(ctx, &request.tenant_id).await?;

        let patch = MembershipPatch {
            role: Some(role),
            status: Some(status),
            profile: self.profile_snapshot(&request.target_uid).await,
            billing: self
                .billing_snapshot(&request.tenant_id, &request.target_uid)
                .await,
            ..MembershipPatch::default()
        };
        let membership = self
            .membership_sync
            .sync(&request.tenant_id, &request.target_uid, &patch)
            .await?;

        tracing::info!(
            tenant_id = %request.tenant_id,
            target = %request.target_uid,
            role = %role,
            actor = %ctx.uid,
            "member role set"
        );
        Ok(membership)
    }

    /// Toggles the "jw" feature role and/or the manual premium grant, leaving
    /// role and status untouched. The entitlement document and the membership
    /// billing snapshot are rewritten in one transaction, so a retry after a
    /// timeout converges on the same state.
    pub async fn set_tenant_member_access(
        &self,
        ctx: &CallerContext,
        request: &SetMemberAccessRequest,
    ) -> Result<SetMemberAccessResponse, CallableError> {
        request.validate()?;
        self.require_tenant_admin(ctx, &request.tenant_id).await?;

        let tenant_id = request.tenant_id.as_str();
        let uid = request.target_uid.as_str();
        let actor = ctx.uid.as_str();
        let jw = request.jw;
        let premium = request.premium;

        let membership = self
            .firestore
            .run_transaction(|txn| async move {
                let ent_path = entitlement_path(tenant_id, uid);
                let mut entitlement: EntitlementRecord =
                    txn.get(&ent_path).await?.unwrap_or_default();

                if let Some(active) = premium {
                    entitlement.manual = ManualGrant {
                        active,
                        granted_by: Some(actor.to_string()),
                        granted_at: Some(Utc::now().to_rfc3339()),
                    };
                }
                entitlement.recompute_effective(Utc::now().timestamp_millis());
                entitlement.updated_at = Some(Utc::now().to_rfc3339());
                txn.set(&ent_path, &entitlement)?;

                let current: MembershipRecord = txn
                    .get(&member_path(tenant_id, uid))
                    .await?
                    .unwrap_or_default();
                let feature_roles = jw.map(|enabled| {
                    let mut tags = current.feature_roles.clone();
                    tags.retain(|t| t != FEATURE_ROLE_JW);
                    if enabled {
                        tags.push(FEATURE_ROLE_JW.to_string());
                    }
                    tags
                });

                let patch = MembershipPatch {
                    billing: Some(entitlement.effective.clone()),
                    feature_roles,
                    ..MembershipPatch::default()
                };
                MembershipSync::apply_in(&txn, tenant_id, uid, &patch).await
            })
            .await?;

        tracing::info!(
            tenant_id,
            target = uid,
            actor,
            ?jw,
            ?premium,
            "member access set"
        );

        Ok(SetMemberAccessResponse {
            premium_active: membership.premium(),
            feature_roles: membership.feature_roles,
        })
    }

    /// Overwrites the denormalized profile snapshot with explicit values.
    pub async fn update_tenant_member_profile(
        &self,
        ctx: &CallerContext,
        request: &UpdateMemberProfileRequest,
    ) -> Result<MembershipRecord, CallableError> {
        request.validate()?;
        self.require_tenant_admin(ctx, &request.tenant_id).await?;

        let current = self
            .firestore
            .doc(&member_path(&request.tenant_id, &request.target_uid))
            .get::<MembershipRecord>()
            .await?
            .and_then(|m| m.profile)
            .unwrap_or_default();

        let snapshot = ProfileSnapshot {
            display_name: Some(request.display_name.clone()),
            country: request.country.clone().or(current.country),
            hearing_status: request.hearing_status.clone().or(current.hearing_status),
            email: current.email,
            provider: current.provider,
        };

        let patch = MembershipPatch {
            profile: Some(snapshot),
            ..MembershipPatch::default()
        };
        let membership = self
            .membership_sync
            .sync(&request.tenant_id, &request.target_uid, &patch)
            .await?;
        Ok(membership)
    }

    /// Rebuilds the denormalized snapshot from the identity provider, the
    /// profile document, and the stored entitlement. Role and status are
    /// never touched here.
    pub async fn refresh_tenant_member_profile_from_auth(
        &self,
        ctx: &CallerContext,
        request: &RefreshMemberProfileRequest,
    ) -> Result<MembershipRecord, CallableError> {
        request.validate()?;
        self.require_tenant_admin(ctx, &request.tenant_id).await?;

        // Unlike the best-effort snapshot path, a missing identity record is
        // a hard failure here: the whole point of the call is the re-read.
        let user = self.identity.get_user(&request.target_uid).await?;
        let profile = match profiles::load_profile(&self.firestore, &request.target_uid).await {
            Ok(loaded) => loaded.map(|l| l.profile).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(target = %request.target_uid, error = %e, "profile read failed during refresh");
                Default::default()
            }
        };

        let snapshot = ProfileSnapshot {
            display_name: user.display_name.clone().or(profile.display_name),
            email: user.email.clone().or(profile.email),
            provider: user.primary_provider().or(profile.provider),
            country: profile.country,
            hearing_status: profile.hearing_status,
        };

        let patch = MembershipPatch {
            profile: Some(snapshot),
            billing: self
                .billing_snapshot(&request.tenant_id, &request.target_uid)
                .await,
            ..MembershipPatch::default()
        };
        let membership = self
            .membership_sync
            .sync(&request.tenant_id, &request.target_uid, &patch)
            .await?;
        Ok(membership)
    }

    /// Deletes a word's media objects. Every candidate path is checked
    /// against the tenant's allow-listed prefixes before anything is removed.
    pub async fn purge_word_media(
        &self,
        ctx: &CallerContext,
        request: &PurgeWordMediaRequest,
    ) -> Result<PurgeWordMediaResponse, CallableError> {
        request.validate()?;
        self.require_tenant_admin(ctx, &request.tenant_id).await?;

        let tenant = self.load_tenant(&request.tenant_id).await?;
        if tenant.storage_prefixes.is_empty() {
            return Err(CallableError::FailedPrecondition(format!(
                "tenant '{}' has no media prefixes configured",
                request.tenant_id
            )));
        }

        let paths: Vec<String> = tenant
            .storage_prefixes
            .iter()
            .flat_map(|prefix| {
                WORD_MEDIA_KINDS.iter().map(move |kind| {
                    format!(
                        "{}/{}/{}",
                        prefix.trim_end_matches('/'),
                        request.word_id,
                        kind
                    )
                })
            })
            .collect();

        let deleted = self
            .media
            .delete_allowed(&tenant.storage_prefixes, &paths)
            .await?;

        tracing::info!(
            tenant_id = %request.tenant_id,
            word_id = %request.word_id,
            deleted,
            "word media purged"
        );
        Ok(PurgeWordMediaResponse { deleted })
    }
}
