//! Role normalization and custom-claims synchronization.
//!
//! The role set stored on a profile and pushed into custom claims always
//! satisfies: `admin` implies `paidUser`, and exactly one of
//! `paidUser`/`freeUser` is present.

#[cfg(test)]
mod tests;

use crate::auth::{AuthError, IdentityClient};
use crate::firestore::{Firestore, FirestoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PAID_USER: &str = "paidUser";
pub const ROLE_FREE_USER: &str = "freeUser";

const ROLE_CHANGE_LOG_COLLECTION: &str = "roleChangeLogs";

/// Normalizes an arbitrary role list: trims, drops empties, dedupes, and
/// applies the premium-role exclusion invariant. The output is sorted so two
/// normalized lists can be compared directly regardless of input order.
///
/// Pure and total; `normalize_roles(normalize_roles(x)) == normalize_roles(x)`.
pub fn normalize_roles<I, S>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set: Vec<String> = Vec::new();
    for role in roles {
        let role = role.as_ref().trim();
        if !role.is_empty() && !set.iter().any(|r| r == role) {
            set.push(role.to_string());
        }
    }

    if set.iter().any(|r| r == ROLE_ADMIN) && !set.iter().any(|r| r == ROLE_PAID_USER) {
        set.push(ROLE_PAID_USER.to_string());
    }
    if set.iter().any(|r| r == ROLE_PAID_USER) {
        set.retain(|r| r != ROLE_FREE_USER);
    } else {
        set.push(ROLE_FREE_USER.to_string());
    }

    set.sort();
    set
}

/// Order-independent equality of two role lists after normalization.
pub fn roles_equal<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> bool {
    normalize_roles(a.iter().map(AsRef::as_ref)) == normalize_roles(b.iter().map(AsRef::as_ref))
}

/// Append-only audit entry, written only when a normalized role set changed.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoleChangeLog {
    pub user_id: String,
    pub old_roles: Vec<String>,
    pub new_roles: Vec<String>,
    pub changed_at: String,
    pub changed_by: String,
}

#[derive(Error, Debug)]
pub enum ClaimsSyncError {
    #[error("identity provider: {0}")]
    Auth(#[from] AuthError),
    #[error("document store: {0}")]
    Store(#[from] FirestoreError),
}

/// Pushes role lists into identity-provider custom claims and records audit
/// entries for real changes.
#[derive(Clone)]
pub struct ClaimsSync {
    identity: IdentityClient,
    firestore: Firestore,
}

impl ClaimsSync {
    pub fn new(identity: IdentityClient, firestore: Firestore) -> Self {
        Self {
            identity,
            firestore,
        }
    }

    /// Overlays `roles` onto the user's existing custom claims, preserving
    /// unrelated claim keys. Pushing the same roles twice overwrites the
    /// claims with the same value, so retries are harmless.
    pub async fn push_roles(&self, uid: &str, roles: &[String]) -> Result<(), ClaimsSyncError> {
        let user = self.identity.get_user(uid).await?;
        let mut claims = user.claims();
        claims.insert(
            "roles".to_string(),
            serde_json::Value::Array(
                roles
                    .iter()
                    .map(|r| serde_json::Value::String(r.clone()))
                    .collect(),
            ),
        );
        self.identity.set_custom_claims(uid, &claims).await?;
        Ok(())
    }

    /// Appends an audit entry when the normalized role sets differ; a no-op
    /// otherwise, so retried operations do not duplicate entries.
    pub async fn log_if_changed(
        &self,
        uid: &str,
        old_roles: &[String],
        new_roles: &[String],
        actor: &str,
    ) -> Result<bool, ClaimsSyncError> {
        if roles_equal(old_roles, new_roles) {
            return Ok(false);
        }
        self.append_log(
            uid,
            &normalize_roles(old_roles),
            &normalize_roles(new_roles),
            actor,
        )
        .await?;
        Ok(true)
    }

    /// Unconditionally appends an audit entry.
    async fn append_log(
        &self,
        uid: &str,
        old_roles: &[String],
        new_roles: &[String],
        actor: &str,
    ) -> Result<(), ClaimsSyncError> {
        let entry = RoleChangeLog {
            user_id: uid.to_string(),
            old_roles: old_roles.to_vec(),
            new_roles: new_roles.to_vec(),
            changed_at: Utc::now().to_rfc3339(),
            changed_by: actor.to_string(),
        };
        self.firestore
            .collection(ROLE_CHANGE_LOG_COLLECTION)
            .add(&entry)
            .await?;
        Ok(())
    }
}
