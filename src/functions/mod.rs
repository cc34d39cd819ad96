//! The callable-operations layer.
//!
//! Every operation follows the same shape: authenticate the bearer token,
//! authorize (platform admin, tenant admin/owner, or self, depending on the
//! operation), validate the request DTO, execute against the clients, and
//! return a summary. Operations hold no per-invocation state and are designed
//! to be retried end to end by the caller.

pub mod compat;
pub mod guard;
pub mod members;
pub mod requests;
pub mod subscriptions;
pub mod users;


use crate::auth::verifier::{IdTokenVerifier, TokenVerificationError};
use crate::auth::{AuthError, IdentityClient};
use crate::entitlements::EffectiveEntitlement;
use crate::firestore::{Firestore, FirestoreError};
use crate::memberships::models::{member_path, MemberStatus, MembershipRecord, ProfileSnapshot};
use crate::memberships::MembershipSync;
use crate::play::{PlayError, SubscriptionVerifier};
use crate::profiles;
use crate::roles::{ClaimsSync, ClaimsSyncError, ROLE_ADMIN};
use crate::storage::{MediaStore, StorageError};
use crate::tenants::{tenant_path, TenantConfig};
use compat::LegacyMirror;
use guard::AbuseGuard;
use std::sync::Arc;
use thiserror::Error;

/// Failure taxonomy surfaced to callers, with stable wire codes.
#[derive(Error, Debug)]
pub enum CallableError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl CallableError {
    /// The stable code callers can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            CallableError::Unauthenticated(_) => "unauthenticated",
            CallableError::PermissionDenied(_) => "permission-denied",
            CallableError::InvalidArgument(_) => "invalid-argument",
            CallableError::NotFound(_) => "not-found",
            CallableError::FailedPrecondition(_) => "failed-precondition",
            CallableError::Internal(_) => "internal",
        }
    }
}

impl From<FirestoreError> for CallableError {
    fn from(e: FirestoreError) -> Self {
        CallableError::Internal(format!("document store: {}", e))
    }
}

impl From<AuthError> for CallableError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UserNotFound => {
                CallableError::NotFound("identity record not found".to_string())
            }
            other => CallableError::Internal(format!("identity provider: {}", other)),
        }
    }
}

impl From<ClaimsSyncError> for CallableError {
    fn from(e: ClaimsSyncError) -> Self {
        match e {
            ClaimsSyncError::Auth(inner) => inner.into(),
            ClaimsSyncError::Store(inner) => inner.into(),
        }
    }
}

impl From<PlayError> for CallableError {
    fn from(e: PlayError) -> Self {
        CallableError::Internal(format!("subscription verification: {}", e))
    }
}

impl From<StorageError> for CallableError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::PathNotAllowed(path) => CallableError::PermissionDenied(format!(
                "object path '{}' is outside the tenant's media tree",
                path
            )),
            other => CallableError::Internal(format!("blob store: {}", other)),
        }
    }
}

impl From<TokenVerificationError> for CallableError {
    fn from(e: TokenVerificationError) -> Self {
        CallableError::Unauthenticated(format!("token verification failed: {}", e))
    }
}

/// The authenticated caller, derived from a verified ID token.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub uid: String,
    pub email: Option<String>,
    pub claims: serde_json::Map<String, serde_json::Value>,
}

impl CallerContext {
    /// Platform admins carry the global `admin` role in their claims and are
    /// elevated across all tenants.
    pub fn is_platform_admin(&self) -> bool {
        self.claims
            .get("roles")
            .and_then(|v| v.as_array())
            .map(|roles| roles.iter().any(|r| r.as_str() == Some(ROLE_ADMIN)))
            .unwrap_or(false)
    }
}

/// Service-level configuration supplied by the embedder. Per-tenant settings
/// live in the tenant documents instead.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// The one tenant that still drives the legacy flat user-roles fields.
    pub default_tenant_id: String,
    /// Play package name subscriptions are verified against.
    pub android_package_name: String,
    /// Media bucket; `None` uses the project default bucket.
    pub media_bucket: Option<String>,
}

/// The callable operations, with all clients wired in.
#[derive(Clone)]
pub struct Callables {
    pub(crate) firestore: Firestore,
    pub(crate) identity: IdentityClient,
    pub(crate) verifier: IdTokenVerifier,
    pub(crate) play: SubscriptionVerifier,
    pub(crate) media: MediaStore,
    pub(crate) claims_sync: ClaimsSync,
    pub(crate) membership_sync: MembershipSync,
    pub(crate) legacy: Arc<dyn LegacyMirror>,
    pub(crate) abuse_guard: Option<Arc<AbuseGuard>>,
    pub(crate) config: ServiceConfig,
}

impl Callables {
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        firestore: Firestore,
        identity: IdentityClient,
        verifier: IdTokenVerifier,
        play: SubscriptionVerifier,
        media: MediaStore,
        legacy: Arc<dyn LegacyMirror>,
        abuse_guard: Option<Arc<AbuseGuard>>,
        config: ServiceConfig,
    ) -> Self {
        let claims_sync = ClaimsSync::new(identity.clone(), firestore.clone());
        let membership_sync = MembershipSync::new(firestore.clone());
        Self {
            firestore,
            identity,
            verifier,
            play,
            media,
            claims_sync,
            membership_sync,
            legacy,
            abuse_guard,
            config,
        }
    }

    /// Authenticates a request from its `Authorization` header value.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<CallerContext, CallableError> {
        let token = authorization
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| {
                CallableError::Unauthenticated("missing bearer token".to_string())
            })?;

        let decoded = self.verifier.verify(token).await?;
        Ok(CallerContext {
            uid: decoded.user_id,
            email: decoded.email,
            claims: decoded.claims,
        })
    }

    /// Loads the tenant config or fails `not-found`.
    pub(crate) async fn load_tenant(&self, tenant_id: &str) -> Result<TenantConfig, CallableError> {
        self.firestore
            .doc(&tenant_path(tenant_id))
            .get::<TenantConfig>()
            .await?
            .ok_or_else(|| CallableError::NotFound(format!("tenant '{}' not found", tenant_id)))
    }

    /// Authorizes tenant-member administration: platform admin, or an active
    /// admin/owner membership in the tenant.
    pub(crate) async fn require_tenant_admin(
        &self,
        ctx: &CallerContext,
        tenant_id: &str,
    ) -> Result<(), CallableError> {
        if ctx.is_platform_admin() {
            return Ok(());
        }

        let membership = self
            .firestore
            .doc(&member_path(tenant_id, &ctx.uid))
            .get::<MembershipRecord>()
            .await?;

        match membership {
            Some(m) if m.role.is_admin() && m.status == MemberStatus::Active => Ok(()),
            _ => Err(CallableError::PermissionDenied(
                "tenant admin or owner required".to_string(),
            )),
        }
    }

    pub(crate) async fn check_abuse_guard(
        &self,
        token: Option<&str>,
    ) -> Result<(), CallableError> {
        match &self.abuse_guard {
            Some(g) => g.check(token).await,
            None => Ok(()),
        }
    }

    /// Best-effort profile snapshot for denormalization. Lookup failures are
    /// logged and swallowed; the membership's own role/status fields never
    /// depend on this data.
    pub(crate) async fn profile_snapshot(&self, uid: &str) -> Option<ProfileSnapshot> {
        let user = match self.identity.get_user(uid).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(uid, error = %e, "profile snapshot: identity lookup failed");
                None
            }
        };

        let profile = match profiles::load_profile(&self.firestore, uid).await {
            Ok(loaded) => loaded.map(|l| l.profile),
            Err(e) => {
                tracing::warn!(uid, error = %e, "profile snapshot: profile read failed");
                None
            }
        };

        if user.is_none() && profile.is_none() {
            return None;
        }

        let user = user.unwrap_or_default();
        let profile = profile.unwrap_or_default();
        Some(ProfileSnapshot {
            display_name: user.display_name.clone().or(profile.display_name),
            email: user.email.clone().or(profile.email),
            provider: user.primary_provider().or(profile.provider),
            country: profile.country,
            hearing_status: profile.hearing_status,
        })
    }

    /// Best-effort billing snapshot from the stored effective entitlement.
    pub(crate) async fn billing_snapshot(
        &self,
        tenant_id: &str,
        uid: &str,
    ) -> Option<EffectiveEntitlement> {
        use crate::entitlements::EntitlementRecord;
        use crate::memberships::models::entitlement_path;

        match self
            .firestore
            .doc(&entitlement_path(tenant_id, uid))
            .get::<EntitlementRecord>()
            .await
        {
            Ok(record) => record.map(|r| r.effective),
            Err(e) => {
                tracing::warn!(tenant_id, uid, error = %e, "billing snapshot read failed");
                None
            }
        }
    }
}
