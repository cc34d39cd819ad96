//! Document-store client (Firestore REST v1).
//!
//! Exposes the narrow surface the entitlement service relies on: typed single
//! document get/set/merge, equality/limit queries, and multi-document atomic
//! transactions. `run_transaction` retries the whole read-modify-write cycle
//! when the commit is aborted by a concurrent writer.

pub mod models;
pub mod query;
pub mod reference;
pub mod transaction;
pub mod value;

#[cfg(test)]
mod tests;

use crate::core::middleware::FIREBASE_SCOPES;
use models::{BeginTransactionRequest, BeginTransactionResponse, RollbackRequest};
use query::QueryBuilder;
use reference::{CollectionReference, DocumentReference};
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use std::future::Future;
use thiserror::Error;
use transaction::Transaction;
use yup_oauth2::ServiceAccountKey;

const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

const TXN_MAX_ATTEMPTS: u32 = 5;

/// Errors from document-store operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("Firestore API error: {0}")]
    ApiError(String),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("transaction failed: {0}")]
    TransactionError(String),
}

impl FirestoreError {
    fn is_aborted_commit(&self) -> bool {
        matches!(
            self,
            FirestoreError::ApiError(msg)
                if msg.contains("ABORTED") || msg.contains("409") || msg.contains("Aborted")
        )
    }
}

/// Client for the project's Firestore database.
#[derive(Clone)]
pub struct Firestore {
    client: ClientWithMiddleware,
    base_url: String,
    database: String,
}

impl Firestore {
    pub fn new(key: ServiceAccountKey) -> Self {
        let project_id = key.project_id.clone().unwrap_or_default();
        let client = crate::core::authenticated_client(
            key,
            FIREBASE_SCOPES,
        );
        let base_url = FIRESTORE_V1_API.replace("{project_id}", &project_id);
        Self::from_parts(client, base_url)
    }

    /// Points the client at a custom base URL (tests run against a mock
    /// server with an unauthenticated client).
    pub fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self::from_parts(client, base_url)
    }

    fn from_parts(client: ClientWithMiddleware, base_url: String) -> Self {
        // "projects/{p}/databases/(default)" -- the resource prefix used in
        // commit bodies and document names.
        let database = base_url
            .find("projects/")
            .map(|start| base_url[start..].trim_end_matches("/documents").to_string())
            .unwrap_or_default();
        Self {
            client,
            base_url,
            database,
        }
    }

    /// A reference to the document at `doc_path`, e.g. `"users/abc"` or
    /// `"tenants/t1/members/abc"`.
    pub fn doc(&self, doc_path: &str) -> DocumentReference<'_> {
        DocumentReference {
            client: &self.client,
            url: format!("{}/{}", self.base_url, doc_path),
        }
    }

    pub fn collection(&self, collection_id: &str) -> CollectionReference<'_> {
        CollectionReference {
            client: &self.client,
            url: format!("{}/{}", self.base_url, collection_id),
        }
    }

    /// A query over a root collection.
    pub fn query(&self, collection_id: &str) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.client, self.base_url.clone(), collection_id)
    }

    async fn begin_transaction(&self) -> Result<Transaction, FirestoreError> {
        let url = format!("{}:beginTransaction", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&BeginTransactionRequest::default())?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                crate::core::parse_error_response(response, "begin transaction failed").await,
            ));
        }

        let result: BeginTransactionResponse = response.json().await?;
        Ok(Transaction::new(
            self.client.clone(),
            self.base_url.clone(),
            self.database.clone(),
            result.transaction,
        ))
    }

    async fn rollback(&self, transaction_id: &str) -> Result<(), FirestoreError> {
        let url = format!("{}:rollback", self.base_url);
        let request = RollbackRequest {
            transaction: transaction_id.to_string(),
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
            return Err(FirestoreError::ApiError(format!(
                "rollback failed: {}",
                status
            )));
        }
        Ok(())
    }

    /// Runs `body` inside a transaction, committing its buffered writes.
    ///
    /// The closure may run several times: on a commit aborted by a conflicting
    /// concurrent writer a fresh transaction is started and the whole
    /// read-modify-write cycle is replayed, up to `TXN_MAX_ATTEMPTS`.
    pub async fn run_transaction<F, Fut, R>(&self, body: F) -> Result<R, FirestoreError>
    where
        F: Fn(Transaction) -> Fut,
        Fut: Future<Output = Result<R, FirestoreError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let txn = self.begin_transaction().await?;
            let txn_id = txn.transaction_id.clone();

            // The clone shares the write buffer with `txn`.
            match body(txn.clone()).await {
                Ok(result) => match txn.commit().await {
                    Ok(_) => return Ok(result),
                    Err(e) if e.is_aborted_commit() && attempt < TXN_MAX_ATTEMPTS => {
                        tracing::debug!(attempt, "transaction aborted by concurrent writer, retrying");
                        continue;
                    }
                    Err(e) if e.is_aborted_commit() => {
                        return Err(FirestoreError::TransactionError(format!(
                            "aborted after {} attempts",
                            attempt
                        )));
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => {
                    let _ = self.rollback(&txn_id).await;
                    return Err(e);
                }
            }
        }
    }
}
