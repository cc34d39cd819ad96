use super::models::Document;
use super::value::{fields_to_typed, serializable_to_fields};
use super::FirestoreError;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::{de::DeserializeOwned, Serialize};

/// Reference to a single document, addressed by its full REST URL.
#[derive(Clone)]
pub struct DocumentReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) url: String,
}

impl<'a> DocumentReference<'a> {
    /// Reads the document. `Ok(None)` when it does not exist.
    pub async fn get<T: DeserializeOwned>(&self) -> Result<Option<T>, FirestoreError> {
        let response = self.client.get(&self.url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FirestoreError::ApiError(format!(
                "get document failed {}: {}",
                status, text
            )));
        }

        let doc: Document = response.json().await?;
        Ok(Some(fields_to_typed(doc.fields)?))
    }

    /// Overwrites the document with `value`.
    pub async fn set<T: Serialize>(&self, value: &T) -> Result<(), FirestoreError> {
        self.patch(value, None).await
    }

    /// Merges `value` into the document: only the serialized top-level fields
    /// are touched, everything else is preserved. Creates the document when it
    /// does not exist.
    pub async fn set_merge<T: Serialize>(&self, value: &T) -> Result<(), FirestoreError> {
        let fields = serializable_to_fields(value)?;
        let mask: Vec<String> = fields.keys().cloned().collect();
        self.patch(value, Some(mask)).await
    }

    async fn patch<T: Serialize>(
        &self,
        value: &T,
        update_mask: Option<Vec<String>>,
    ) -> Result<(), FirestoreError> {
        let fields = serializable_to_fields(value)?;

        let mut url = self.url.clone();
        if let Some(mask) = update_mask {
            for (i, field) in mask.iter().enumerate() {
                url.push(if i == 0 { '?' } else { '&' });
                url.push_str("updateMask.fieldPaths=");
                url.push_str(field);
            }
        }

        let body = serde_json::to_vec(&serde_json::json!({ "fields": fields }))?;
        let response = self
            .client
            .patch(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FirestoreError::ApiError(format!(
                "write document failed {}: {}",
                status, text
            )));
        }
        Ok(())
    }
}

/// Reference to a collection; supports auto-id appends.
#[derive(Clone)]
pub struct CollectionReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) url: String,
}

impl<'a> CollectionReference<'a> {
    pub fn doc(&self, document_id: &str) -> DocumentReference<'a> {
        DocumentReference {
            client: self.client,
            url: format!("{}/{}", self.url, document_id),
        }
    }

    /// Appends a new document with a server-generated id.
    pub async fn add<T: Serialize>(&self, value: &T) -> Result<(), FirestoreError> {
        let fields = serializable_to_fields(value)?;
        let body = serde_json::to_vec(&serde_json::json!({ "fields": fields }))?;

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FirestoreError::ApiError(format!(
                "add document failed {}: {}",
                status, text
            )));
        }
        Ok(())
    }
}
