//! Blob-store client (Cloud Storage JSON API), used to purge word media.
//!
//! Every delete is gated by an allow-listed path-prefix check so a malformed
//! or hostile word id can never reach objects outside the tenant's media
//! tree.


use crate::core::middleware::FIREBASE_SCOPES;
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;
use url::form_urlencoded;
use yup_oauth2::ServiceAccountKey;

const STORAGE_V1_API: &str = "https://storage.googleapis.com/storage/v1";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("Storage API error: {0}")]
    ApiError(String),
    #[error("object path '{0}' is outside the allowed prefixes")]
    PathNotAllowed(String),
}

/// Returns whether `path` is a sane object path under one of the allow-listed
/// prefixes. Rejects traversal segments and absolute paths outright.
pub fn path_allowed(prefixes: &[String], path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.split('/').any(|seg| seg == "..") {
        return false;
    }
    prefixes.iter().any(|prefix| {
        let prefix = prefix.trim_end_matches('/');
        path.strip_prefix(prefix)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
    })
}

/// Client for the project's media bucket.
#[derive(Clone)]
pub struct MediaStore {
    client: ClientWithMiddleware,
    base_url: String,
    bucket: String,
}

impl MediaStore {
    pub fn new(key: ServiceAccountKey, bucket: Option<String>) -> Self {
        let project_id = key.project_id.clone().unwrap_or_default();
        let client = crate::core::authenticated_client(key, FIREBASE_SCOPES);
        Self {
            client,
            base_url: STORAGE_V1_API.to_string(),
            bucket: bucket.unwrap_or_else(|| format!("{}.appspot.com", project_id)),
        }
    }

    pub fn new_with_client(
        client: ClientWithMiddleware,
        base_url: String,
        bucket: String,
    ) -> Self {
        Self {
            client,
            base_url,
            bucket,
        }
    }

    /// Deletes one object; `Ok(false)` when it was already absent.
    pub async fn delete_object(&self, object_path: &str) -> Result<bool, StorageError> {
        let encoded: String =
            form_urlencoded::byte_serialize(object_path.as_bytes()).collect();
        let url = format!("{}/b/{}/o/{}", self.base_url, self.bucket, encoded);

        let response = self.client.delete(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::ApiError(format!(
                "delete object failed {}: {}",
                status, text
            )));
        }
        Ok(true)
    }

    /// Deletes `paths` after validating each one against `prefixes`.
    ///
    /// The allow-list check runs over the whole batch before the first delete
    /// goes out, so a single bad path fails the call without removing
    /// anything. Returns the number of objects actually removed.
    pub async fn delete_allowed(
        &self,
        prefixes: &[String],
        paths: &[String],
    ) -> Result<usize, StorageError> {
        for path in paths {
            if !path_allowed(prefixes, path) {
                return Err(StorageError::PathNotAllowed(path.clone()));
            }
        }

        let mut deleted = 0;
        for path in paths {
            if self.delete_object(path).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
