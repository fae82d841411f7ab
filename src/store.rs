//! REST client for the document collection holding manual predictions.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, info};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, ServiceError};
use crate::records::{validate_document_id, Label, PatientRecord, STORED_FIELDS};

/// Placeholder for a field the stored document does not carry.
pub const MISSING: &str = "N/A";

/// A stored prediction, one value per entry of `STORED_FIELDS`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPrediction {
    pub values: Vec<String>,
}

impl StoredPrediction {
    fn from_fields(fields: Option<&Map<String, Value>>) -> Self {
        let values = STORED_FIELDS
            .iter()
            .map(|(name, kind)| {
                fields
                    .and_then(|f| f.get(*name))
                    .and_then(|envelope| envelope.get(kind.envelope()))
                    .map(display_value)
                    .unwrap_or_else(|| MISSING.to_string())
            })
            .collect();
        StoredPrediction { values }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        STORED_FIELDS
            .iter()
            .position(|(name, _)| *name == field)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    fields: Option<Map<String, Value>>,
}

pub struct RecordStore {
    client: Client,
    collection: Url,
}

impl RecordStore {
    pub fn new(collection_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let collection = Url::parse(collection_url)
            .map_err(|_| ServiceError::StoreUrl(collection_url.to_string()))?;
        if collection.cannot_be_a_base() {
            return Err(ServiceError::StoreUrl(collection_url.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(RecordStore {
            client: builder.build()?,
            collection,
        })
    }

    /// URL of the document keyed by `email`, percent-encoded as one segment.
    pub fn document_url(&self, email: &str) -> Result<Url> {
        validate_document_id(email)?;
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::StoreUrl(self.collection.to_string()))?
            .pop_if_empty()
            .push(email);
        Ok(url)
    }

    /// Creates or overwrites the fields of the document keyed by the
    /// record's email.
    pub async fn upsert(&self, record: &PatientRecord, result: Label) -> Result<()> {
        let url = self.document_url(&record.email)?;
        let body = json!({ "fields": record.to_store_fields(result) });
        debug!("PATCH {url}");

        let response = self.client.patch(url).json(&body).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::StoreStatus {
                status: status.as_u16(),
                body,
            });
        }

        info!("prediction for {} saved", record.email);
        Ok(())
    }

    /// Every stored prediction in server order, following page tokens.
    /// A token the server already handed out is an error.
    pub async fn list_all(&self) -> Result<Vec<StoredPrediction>> {
        let mut predictions = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut request = self.client.get(self.collection.clone());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            let status = response.status();
            if status != StatusCode::OK {
                let body = response.text().await.unwrap_or_default();
                return Err(ServiceError::StoreStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            let page: ListResponse = response.json().await?;
            debug!("fetched {} documents", page.documents.len());
            predictions.extend(
                page.documents
                    .iter()
                    .map(|doc| StoredPrediction::from_fields(doc.fields.as_ref())),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(ServiceError::StorePaging(token));
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(predictions)
    }
}
