//! Gestion des erreurs du serveur WebDAV
//!
//! Chaque erreur est convertie au statut protocolaire le plus étroit ; le
//! détail n'est qu'une chaîne lisible, jamais un contrat machine.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pmoncm::NcmError;
use thiserror::Error;

/// Type Result personnalisé pour pmowebdav
pub type Result<T> = std::result::Result<T, DavError>;

/// Erreurs possibles lors du traitement d'une requête WebDAV
#[derive(Error, Debug)]
pub enum DavError {
    /// Aucun credential de session valide
    #[error("Unauthorized")]
    Unauthorized,

    /// Le chemin ne correspond à aucune ressource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Destination de COPY/MOVE hors de la racine des playlists utilisateur
    #[error("Unsupported destination: {0}")]
    UnsupportedDestination(String),

    /// Requête malformée (header manquant, chemin invalide)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Échec d'un collaborateur amont
    #[error("Upstream failure: {0}")]
    Upstream(#[from] NcmError),

    /// Échec de sérialisation XML
    #[error("XML rendering error: {0}")]
    Xml(#[from] quick_xml::SeError),
}

impl DavError {
    /// Statut protocolaire associé à l'erreur
    pub fn status(&self) -> StatusCode {
        match self {
            DavError::Unauthorized => StatusCode::UNAUTHORIZED,
            DavError::NotFound(_) => StatusCode::NOT_FOUND,
            DavError::UnsupportedDestination(_) => StatusCode::FORBIDDEN,
            DavError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DavError::Upstream(e) if e.is_auth_error() => StatusCode::UNAUTHORIZED,
            DavError::Upstream(NcmError::NotFound(_)) => StatusCode::NOT_FOUND,
            DavError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DavError::Xml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DavError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, self.to_string()).into_response()
    }
}
