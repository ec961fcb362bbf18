//! `LeadStore` over the REST API, for driving a remote board from the CLI.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::models::*;
use super::store::LeadStore;
use crate::errors::StoreError;

#[derive(Deserialize)]
struct LeadsEnvelope {
    leads: Vec<Lead>,
}

#[derive(Deserialize)]
struct LeadEnvelope {
    lead: Lead,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct SuccessBody {
    success: bool,
}

#[derive(Debug, Clone)]
pub struct HttpLeadStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLeadStore {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a response to `T`, or to the `StoreError` its status describes.
    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
        id: Option<&str>,
    ) -> Result<T, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| StoreError::Persistence(format!("Invalid response body: {}", e)));
        }

        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| status.to_string());
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::not_found(id.unwrap_or_default()),
            StatusCode::BAD_REQUEST => validation_from_message(&message),
            _ => StoreError::Persistence(format!("Server returned {}: {}", status, message)),
        })
    }
}

/// Rebuild a `Validation` error from the server's `"Invalid {field}: {message}"`
/// text. Bodies in any other shape keep their text under the `request` field.
fn validation_from_message(text: &str) -> StoreError {
    text.strip_prefix("Invalid ")
        .and_then(|rest| rest.split_once(": "))
        .filter(|(field, _)| !field.is_empty() && !field.contains(' '))
        .map(|(field, message)| StoreError::validation(field, message))
        .unwrap_or_else(|| StoreError::validation("request", text))
}

fn transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Persistence(format!("Request failed: {}", err))
}

#[async_trait]
impl LeadStore for HttpLeadStore {
    async fn fetch_leads(&self) -> Result<Vec<Lead>, StoreError> {
        let resp = self
            .client
            .get(self.url("/api/leads"))
            .send()
            .await
            .map_err(transport_error)?;
        let body: LeadsEnvelope = Self::decode(resp, None).await?;
        Ok(body.leads)
    }

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StoreError> {
        let resp = self
            .client
            .get(self.url(&format!("/api/leads/{}", id)))
            .send()
            .await
            .map_err(transport_error)?;
        match Self::decode::<LeadEnvelope>(resp, Some(id)).await {
            Ok(body) => Ok(Some(body.lead)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_lead(&self, new: NewLead) -> Result<Lead, StoreError> {
        let resp = self
            .client
            .post(self.url("/api/leads"))
            .json(&new)
            .send()
            .await
            .map_err(transport_error)?;
        let body: LeadEnvelope = Self::decode(resp, None).await?;
        Ok(body.lead)
    }

    async fn update_lead(&self, id: &str, update: LeadUpdate) -> Result<Lead, StoreError> {
        let resp = self
            .client
            .put(self.url(&format!("/api/leads/{}", id)))
            .json(&update)
            .send()
            .await
            .map_err(transport_error)?;
        let body: LeadEnvelope = Self::decode(resp, Some(id)).await?;
        Ok(body.lead)
    }

    async fn delete_lead(&self, id: &str) -> Result<bool, StoreError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/leads/{}", id)))
            .send()
            .await
            .map_err(transport_error)?;
        match Self::decode::<SuccessBody>(resp, Some(id)).await {
            Ok(body) => Ok(body.success),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn check(&self) -> Result<StoreStatus, StoreError> {
        let resp = self
            .client
            .get(self.url("/api/db/check"))
            .send()
            .await
            .map_err(transport_error)?;
        Self::decode(resp, None).await
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let resp = self
            .client
            .post(self.url("/api/db/init"))
            .send()
            .await
            .map_err(transport_error)?;
        let body: SuccessBody = Self::decode(resp, None).await?;
        if body.success {
            Ok(())
        } else {
            Err(StoreError::Persistence("Schema initialization failed".into()))
        }
    }

    async fn append_note(&self, id: &str, note: String) -> Result<Lead, StoreError> {
        let resp = self
            .client
            .post(self.url(&format!("/api/leads/{}/notes", id)))
            .json(&serde_json::json!({ "note": note }))
            .send()
            .await
            .map_err(transport_error)?;
        let body: LeadEnvelope = Self::decode(resp, Some(id)).await?;
        Ok(body.lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_keeps_server_field() {
        let err = validation_from_message("Invalid stage: unknown stage 'archivado'");
        match &err {
            StoreError::Validation { field, message } => {
                assert_eq!(field, "stage");
                assert_eq!(message, "unknown stage 'archivado'");
            }
            other => panic!("Expected Validation, got {other:?}"),
        }
        assert_eq!(err.to_string(), "Invalid stage: unknown stage 'archivado'");
    }

    #[test]
    fn test_validation_message_without_field() {
        let err = validation_from_message("Failed to parse the request body as JSON");
        assert!(matches!(
            err,
            StoreError::Validation { ref field, .. } if field == "request"
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let store = HttpLeadStore::new("http://127.0.0.1:3000/");
        assert_eq!(store.url("/api/leads"), "http://127.0.0.1:3000/api/leads");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_persistence_error() {
        // Port 9 (discard) is not expected to host an HTTP server.
        let store = HttpLeadStore::new("http://127.0.0.1:9");
        let err = store.fetch_leads().await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
    }
}
