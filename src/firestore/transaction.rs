use super::models::{CommitRequest, CommitResponse, Document, Write};
use super::value::{fields_to_typed, serializable_to_fields};
use super::FirestoreError;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Mutex};

/// A Firestore transaction: reads go through the transaction id so the commit
/// is rejected (ABORTED) when any document read here was concurrently
/// modified; writes are buffered locally until `commit`.
///
/// Clones share the write buffer, so a clone handed to a closure accumulates
/// writes into the same commit.
#[derive(Clone)]
pub struct Transaction {
    client: ClientWithMiddleware,
    base_url: String,
    database: String,
    pub(crate) transaction_id: String,
    writes: Arc<Mutex<Vec<Write>>>,
}

impl Transaction {
    pub(crate) fn new(
        client: ClientWithMiddleware,
        base_url: String,
        database: String,
        transaction_id: String,
    ) -> Self {
        Self {
            client,
            base_url,
            database,
            transaction_id,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn resource_name(&self, doc_path: &str) -> String {
        format!("{}/documents/{}", self.database, doc_path)
    }

    /// Reads `doc_path` (e.g. `"tenants/t1/members/u1"`) within the
    /// transaction. `Ok(None)` when the document does not exist.
    pub async fn get<T: DeserializeOwned>(
        &self,
        doc_path: &str,
    ) -> Result<Option<T>, FirestoreError> {
        let url = format!("{}/{}", self.base_url, doc_path);
        let response = self
            .client
            .get(&url)
            .query(&[("transaction", &self.transaction_id)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FirestoreError::ApiError(format!(
                "transactional get failed {}: {}",
                status, text
            )));
        }

        let doc: Document = response.json().await?;
        Ok(Some(fields_to_typed(doc.fields)?))
    }

    /// Buffers a full overwrite of `doc_path`.
    pub fn set<T: Serialize>(&self, doc_path: &str, value: &T) -> Result<(), FirestoreError> {
        let fields = serializable_to_fields(value)?;
        let doc = Document {
            name: self.resource_name(doc_path),
            fields,
            create_time: String::new(),
            update_time: String::new(),
        };

        self.writes
            .lock()
            .expect("transaction write buffer poisoned")
            .push(Write {
                update: Some(doc),
                delete: None,
                update_mask: None,
            });
        Ok(())
    }

    /// Commits all buffered writes atomically.
    pub(crate) async fn commit(self) -> Result<CommitResponse, FirestoreError> {
        let url = format!("{}/documents:commit", self.url_root());
        let writes = self
            .writes
            .lock()
            .expect("transaction write buffer poisoned")
            .clone();

        let request = CommitRequest {
            database: self.database.clone(),
            writes,
            transaction: Some(self.transaction_id.clone()),
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
            return Err(FirestoreError::ApiError(format!(
                "transaction commit failed {}: {}",
                status, text
            )));
        }

        Ok(response.json().await?)
    }

    fn url_root(&self) -> &str {
        // base_url ends in "/documents"; the :commit / :rollback endpoints
        // live one level up.
        self.base_url
            .strip_suffix("/documents")
            .unwrap_or(&self.base_url)
    }
}
