//! User profile documents (`users/{uid}`).
//!
//! Some profiles predate the auth migration and are keyed by a legacy id
//! with the real uid stored in `authUid`; reads fall back to an equality
//! query when the direct document is absent.

use crate::firestore::{Firestore, FirestoreError};
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub roles: Vec<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub hearing_status: Option<String>,
    pub provider: Option<String>,
    pub auth_uid: Option<String>,
    /// Legacy flat mirror of the default tenant's subscription state.
    pub subscription_active: Option<bool>,
    pub subscription_renewal_date: Option<i64>,
}

pub fn profile_path(doc_id: &str) -> String {
    format!("{}/{}", USERS_COLLECTION, doc_id)
}

/// A profile together with the id of the document it actually lives in,
/// which differs from the uid for legacy-keyed documents.
#[derive(Debug, Clone)]
pub struct LoadedProfile {
    pub doc_id: String,
    pub profile: UserProfile,
}

/// Loads the profile for `uid`, trying the direct document first and then
/// the `authUid` index for legacy-keyed documents.
pub async fn load_profile(
    firestore: &Firestore,
    uid: &str,
) -> Result<Option<LoadedProfile>, FirestoreError> {
    if let Some(profile) = firestore.doc(&profile_path(uid)).get::<UserProfile>().await? {
        return Ok(Some(LoadedProfile {
            doc_id: uid.to_string(),
            profile,
        }));
    }

    let mut matches = firestore
        .query(USERS_COLLECTION)
        .filter_eq("authUid", uid)?
        .limit(1)
        .fetch::<UserProfile>()
        .await?;

    Ok(matches.pop().map(|(doc_id, profile)| LoadedProfile {
        doc_id,
        profile,
    }))
}
