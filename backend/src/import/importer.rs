//! Guest importers: where a finished batch goes.
//!
//! The session never persists guests itself; it hands the final list to a
//! [`GuestImporter`]. Two implementations ship with the crate:
//!
//! - [`HttpImporter`] - POSTs the batch to the guest API
//! - [`JsonFileImporter`] - writes the batch to a JSON file (offline use)

use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::models::ParsedGuest;

/// Bulk endpoint on the guest API.
pub const BULK_IMPORT_PATH: &str = "/api/guests/bulk";

/// Persists a batch of guests.
pub trait GuestImporter {
    fn import(&self, guests: &[ParsedGuest]) -> impl Future<Output = Result<(), ImportError>> + Send;
}

/// Request body for a bulk import.
#[derive(Debug, Serialize)]
pub struct BulkImportRequest<'a> {
    pub guests: &'a [ParsedGuest],
}

/// Sends batches to the guest API.
#[derive(Debug, Clone)]
pub struct HttpImporter {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpImporter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        let importer = Self::new(config.api_url.clone());
        match &config.api_token {
            Some(token) => importer.with_token(token.clone()),
            None => importer,
        }
    }

    /// Send a bearer token with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, BULK_IMPORT_PATH)
    }
}

impl GuestImporter for HttpImporter {
    async fn import(&self, guests: &[ParsedGuest]) -> Result<(), ImportError> {
        let mut request = self.client.post(self.endpoint()).json(&BulkImportRequest { guests });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Writes batches to a JSON file instead of calling the API.
#[derive(Debug, Clone)]
pub struct JsonFileImporter {
    path: PathBuf,
}

impl JsonFileImporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl GuestImporter for JsonFileImporter {
    async fn import(&self, guests: &[ParsedGuest]) -> Result<(), ImportError> {
        let json = serde_json::to_string_pretty(&BulkImportRequest { guests })?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use tempfile::tempdir;

    #[test]
    fn test_endpoint() {
        let importer = HttpImporter::new("http://localhost:8080/");
        assert_eq!(importer.endpoint(), "http://localhost:8080/api/guests/bulk");
    }

    #[test]
    fn test_from_config_token() {
        let config = ImportConfig {
            api_token: Some("secret".into()),
            ..ImportConfig::default()
        };
        let importer = HttpImporter::from_config(&config);
        assert_eq!(importer.token.as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn test_json_file_importer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guests.json");
        let guests = vec![ParsedGuest::new("Asha", Side::Bride)];

        JsonFileImporter::new(&path).import(&guests).await.unwrap();

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["guests"][0]["name"], "Asha");
        assert_eq!(written["guests"][0]["rsvpStatus"], "pending");
    }

    #[tokio::test]
    async fn test_http_importer_unreachable() {
        // Nothing listens on port 9 (discard)
        let importer = HttpImporter::new("http://127.0.0.1:9");
        let err = importer.import(&[ParsedGuest::new("Asha", Side::Bride)]).await.unwrap_err();
        assert!(matches!(err, ImportError::Http(_)));
    }
}
