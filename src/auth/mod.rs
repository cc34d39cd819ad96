//! Identity-provider client (Identity Toolkit REST).
//!
//! The service reads user records for denormalized profile snapshots and
//! writes custom claims; claims are the authorization source of truth read by
//! clients, so claim writes happen before the less-authoritative audit log.

pub mod keys;
pub mod models;
pub mod verifier;

#[cfg(test)]
mod tests;

use crate::core::middleware::FIREBASE_SCOPES;
use models::{GetAccountInfoRequest, GetAccountInfoResponse, UpdateAccountRequest, UserRecord};
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use yup_oauth2::ServiceAccountKey;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("Identity Toolkit API error: {0}")]
    ApiError(String),
    #[error("user not found")]
    UserNotFound,
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Client for the project's Identity Toolkit accounts API.
#[derive(Clone)]
pub struct IdentityClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl IdentityClient {
    pub fn new(key: ServiceAccountKey) -> Self {
        let project_id = key.project_id.clone().unwrap_or_default();
        let client = crate::core::authenticated_client(key, FIREBASE_SCOPES);
        Self {
            client,
            base_url: format!(
                "https://identitytoolkit.googleapis.com/v1/projects/{}",
                project_id
            ),
        }
    }

    pub fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Fetches the user record for `uid`.
    pub async fn get_user(&self, uid: &str) -> Result<UserRecord, AuthError> {
        let url = format!("{}/accounts:lookup", self.base_url);
        let request = GetAccountInfoRequest {
            local_id: vec![uid.to_string()],
        };

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::ApiError(format!(
                "lookup failed {}: {}",
                status, text
            )));
        }

        let result: GetAccountInfoResponse = response.json().await?;
        result
            .users
            .and_then(|mut users| users.pop())
            .ok_or(AuthError::UserNotFound)
    }

    /// Overwrites the user's custom claims with `claims`.
    ///
    /// Callers that need to preserve unrelated claim keys must read the
    /// current claims first and overlay; see `roles::ClaimsSync::push_roles`.
    pub async fn set_custom_claims(
        &self,
        uid: &str,
        claims: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AuthError> {
        let url = format!("{}/accounts:update", self.base_url);
        let request = UpdateAccountRequest {
            local_id: uid.to_string(),
            custom_attributes: Some(serde_json::to_string(claims)?),
        };

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::ApiError(format!(
                "set claims failed {}: {}",
                status, text
            )));
        }
        Ok(())
    }
}
