//! Couche d'accès au pont HTTP de l'API cloud music
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec le pont
//! API (serveur NeteaseCloudMusicApi local ou distant). Le credential de
//! session est un cookie opaque transmis à chaque requête.

pub mod auth;
pub mod catalog;
pub mod user;

use crate::error::{NcmError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Client API bas-niveau pour communiquer avec le pont cloud music
pub struct NcmApi {
    /// Client HTTP
    client: Client,
    /// URL de base du pont API (ex: "http://127.0.0.1:3000")
    base_url: String,
}

impl NcmApi {
    /// Crée une nouvelle instance de l'API
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:67.0) Gecko/20100101 Firefox/67.0")
            .build()?;

        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    /// Retourne l'URL de base du pont API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Client HTTP partagé (utilisé par le mode proxy du serveur WebDAV)
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Effectue une requête GET et valide le code de l'enveloppe
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        credential: Option<&str>,
    ) -> Result<T> {
        let envelope = self.get_envelope(endpoint, params, credential).await?;

        // Vérifier le code porté par l'enveloppe (200 = succès, 301 = session absente)
        if let Some(code) = envelope.get("code").and_then(Value::as_i64) {
            if code != 200 {
                let message = envelope
                    .get("message")
                    .or_else(|| envelope.get("msg"))
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error");
                warn!("API error on {} (code {}): {}", endpoint, code, message);
                return Err(NcmError::from_body_code(code, message));
            }
        }

        serde_json::from_value(envelope).map_err(|e| {
            warn!("Failed to parse response from {}: {}", endpoint, e);
            NcmError::JsonParse(e)
        })
    }

    /// Effectue une requête GET et retourne l'enveloppe brute
    ///
    /// Certains endpoints (polling QR notamment) utilisent le champ `code`
    /// comme machine à états et non comme indicateur d'erreur ; ils passent
    /// par cette variante.
    pub(crate) async fn get_envelope(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        credential: Option<&str>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);

        debug!("GET {} with {} params", url, params.len());

        // Le pont API met les réponses en cache ; un timestamp force une
        // réponse fraîche.
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();

        let mut request = self
            .client
            .get(&url)
            .query(params)
            .query(&[("timestamp", timestamp.as_str())]);

        if let Some(cookie) = credential {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Traite la réponse HTTP
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("HTTP error ({}): {}", status_code, error_text);
            return Err(NcmError::from_status(status_code, error_text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response body: {}", e);
            NcmError::JsonParse(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_creation() {
        let api = NcmApi::new("http://127.0.0.1:3000").unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = NcmApi::new("http://127.0.0.1:3000/").unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:3000");
    }
}
