//! Gestion du credential de session (cookie opaque persisté sur disque)
//!
//! Le cookie est la seule donnée d'authentification : il est chargé au
//! démarrage, remplacé lors d'un login ou d'un rafraîchissement, et relu par
//! chaque requête. Écrivain unique (flow de login ou tâche de refresh), les
//! lecteurs voient la dernière valeur committée.

use crate::error::{NcmError, Result};
use std::fs;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Magasin du credential de session
pub struct CredentialStore {
    /// Fichier de persistance du cookie
    path: PathBuf,
    /// Cookie de session courant
    cookie: RwLock<Option<String>>,
    /// Identifiant de l'utilisateur connecté (rempli après validation)
    user_id: RwLock<Option<String>>,
}

impl CredentialStore {
    /// Charge le magasin depuis le fichier de cookie
    ///
    /// Un fichier absent ou vide donne un magasin non authentifié ; ce n'est
    /// pas une erreur (le flow de login QR prendra le relais).
    pub fn load(path: PathBuf) -> Self {
        let cookie = match fs::read_to_string(&path) {
            Ok(content) => {
                let trimmed = content.trim().to_string();
                if trimmed.is_empty() {
                    None
                } else {
                    info!(cookie_file=%path.display(), "Loaded session cookie");
                    Some(trimmed)
                }
            }
            Err(_) => None,
        };

        Self {
            path,
            cookie: RwLock::new(cookie),
            user_id: RwLock::new(None),
        }
    }

    /// Retourne le cookie courant s'il existe
    pub async fn cookie(&self) -> Option<String> {
        self.cookie.read().await.clone()
    }

    /// Retourne le cookie courant ou une erreur `Unauthorized`
    pub async fn require_cookie(&self) -> Result<String> {
        self.cookie
            .read()
            .await
            .clone()
            .ok_or_else(|| NcmError::Unauthorized("no session credential".to_string()))
    }

    /// Vrai si un credential est présent
    pub async fn is_authenticated(&self) -> bool {
        self.cookie.read().await.is_some()
    }

    /// Remplace le cookie et le persiste sur disque
    ///
    /// L'échec d'écriture est loggé mais ne fait pas échouer l'appelant : la
    /// source de vérité est la valeur en mémoire.
    pub async fn commit(&self, cookie: String) {
        if let Err(e) = fs::write(&self.path, &cookie) {
            warn!(cookie_file=%self.path.display(), "Failed to persist cookie: {}", e);
        }
        *self.cookie.write().await = Some(cookie);
        info!("Session credential committed");
    }

    /// Définit l'identifiant utilisateur associé à la session
    pub async fn set_user_id(&self, user_id: String) {
        *self.user_id.write().await = Some(user_id);
    }

    /// Identifiant de l'utilisateur connecté
    pub async fn user_id(&self) -> Option<String> {
        self.user_id.read().await.clone()
    }

    /// Identifiant utilisateur ou erreur `Unauthorized`
    pub async fn require_user_id(&self) -> Result<String> {
        self.user_id
            .read()
            .await
            .clone()
            .ok_or_else(|| NcmError::Unauthorized("session has no user id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_missing_file_is_unauthenticated() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::load(dir.path().join("cookie.txt"));
        assert!(!store.is_authenticated().await);
        assert!(store.require_cookie().await.is_err());
    }

    #[tokio::test]
    async fn test_commit_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookie.txt");

        let store = CredentialStore::load(path.clone());
        store.commit("MUSIC_U=abcdef;".to_string()).await;
        assert_eq!(store.cookie().await.as_deref(), Some("MUSIC_U=abcdef;"));

        // Un nouveau magasin relit le cookie persisté
        let reloaded = CredentialStore::load(path);
        assert_eq!(reloaded.cookie().await.as_deref(), Some("MUSIC_U=abcdef;"));
    }

    #[tokio::test]
    async fn test_blank_file_is_unauthenticated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookie.txt");
        fs::write(&path, "  \n").unwrap();

        let store = CredentialStore::load(path);
        assert!(!store.is_authenticated().await);
    }
}
