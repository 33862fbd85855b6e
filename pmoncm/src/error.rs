//! Gestion des erreurs pour le client cloud music

use thiserror::Error;

/// Type Result personnalisé pour pmoncm
pub type Result<T> = std::result::Result<T, NcmError>;

/// Erreurs possibles lors de l'utilisation du client cloud music
#[derive(Error, Debug)]
pub enum NcmError {
    /// Erreur d'authentification (cookie absent, expiré ou révoqué)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Ressource non trouvée (chanson, playlist, etc.)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Erreur retournée dans l'enveloppe de l'API
    #[error("Cloud music API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// Erreur du cache catalogue (sqlite)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Erreur générique
    #[error("Cloud music error: {0}")]
    Other(String),
}

impl NcmError {
    /// Crée une erreur depuis un code de statut HTTP et un message
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            _ => Self::Api {
                code: code as i64,
                message: message.into(),
            },
        }
    }

    /// Crée une erreur depuis le champ `code` d'une enveloppe de réponse
    ///
    /// L'API signale une session absente ou expirée avec le code 301.
    pub fn from_body_code(code: i64, message: impl Into<String>) -> Self {
        match code {
            301 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            _ => Self::Api {
                code,
                message: message.into(),
            },
        }
    }

    /// Vérifie si l'erreur correspond à un credential invalide
    pub fn is_auth_error(&self) -> bool {
        matches!(self, NcmError::Unauthorized(_))
    }
}

impl From<rusqlite::Error> for NcmError {
    fn from(err: rusqlite::Error) -> Self {
        NcmError::Cache(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_code() {
        assert!(NcmError::from_status(401, "no cookie").is_auth_error());
        assert!(matches!(
            NcmError::from_status(404, "gone"),
            NcmError::NotFound(_)
        ));
        assert!(matches!(
            NcmError::from_status(500, "boom"),
            NcmError::Api { code: 500, .. }
        ));
    }

    #[test]
    fn test_from_body_code_maps_301_to_unauthorized() {
        assert!(NcmError::from_body_code(301, "need login").is_auth_error());
        assert!(matches!(
            NcmError::from_body_code(502, "exists"),
            NcmError::Api { code: 502, .. }
        ));
    }
}
