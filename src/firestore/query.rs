use super::models::{
    CollectionSelector, FieldFilter, FieldReference, QueryFilter, RunQueryRequest,
    RunQueryResponse, StructuredQuery,
};
use super::value::{fields_to_typed, json_to_value};
use super::FirestoreError;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::{de::DeserializeOwned, Serialize};

/// Builder for the simple queries this service needs: equality filters and a
/// result limit over a single collection.
pub struct QueryBuilder<'a> {
    client: &'a ClientWithMiddleware,
    parent_url: String,
    query: StructuredQuery,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(
        client: &'a ClientWithMiddleware,
        parent_url: String,
        collection_id: &str,
    ) -> Self {
        Self {
            client,
            parent_url,
            query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: collection_id.to_string(),
                }],
                filter: None,
                limit: None,
            },
        }
    }

    pub fn filter_eq<T: Serialize>(
        mut self,
        field: &str,
        value: T,
    ) -> Result<Self, FirestoreError> {
        let value = json_to_value(serde_json::to_value(value)?)?;
        let filter = QueryFilter {
            field_filter: Some(FieldFilter {
                field: FieldReference {
                    field_path: field.to_string(),
                },
                op: "EQUAL".to_string(),
                value,
            }),
            composite_filter: None,
        };

        self.query.filter = match self.query.filter.take() {
            None => Some(filter),
            Some(existing) => Some(QueryFilter {
                field_filter: None,
                composite_filter: Some(super::models::CompositeFilter {
                    op: "AND".to_string(),
                    filters: match existing.composite_filter {
                        Some(mut cf) => {
                            cf.filters.push(filter);
                            cf.filters
                        }
                        None => vec![existing, filter],
                    },
                }),
            }),
        };
        Ok(self)
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Runs the query, returning `(document_id, data)` pairs.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<(String, T)>, FirestoreError> {
        let url = format!("{}:runQuery", self.parent_url);
        let request = RunQueryRequest {
            structured_query: self.query,
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
                "run query failed {}: {}",
                status, text
            )));
        }

        // runQuery streams one JSON object per matched document; an empty
        // result is a single object with only readTime.
        let rows: Vec<RunQueryResponse> = response.json().await?;
        let mut out = Vec::new();
        for row in rows {
            if let Some(doc) = row.document {
                let id = doc
                    .name
                    .rsplit('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                out.push((id, fields_to_typed(doc.fields)?));
            }
        }
        Ok(out)
    }
}
