//! Module d'authentification (login QR et session)

use super::NcmApi;
use crate::error::{NcmError, Result};
use crate::models::{AccountInfo, QrCheck, QrKey, QrLogin};
use serde_json::Value;
use tracing::{debug, info};

impl NcmApi {
    /// Vérifie l'état de la session courante
    ///
    /// # Errors
    ///
    /// * `NcmError::Unauthorized` - Le cookie est absent, expiré ou révoqué
    pub async fn login_status(&self, credential: &str) -> Result<AccountInfo> {
        let envelope = self
            .get_envelope("/login/status", &[], Some(credential))
            .await?;

        // Le profil est null tant qu'aucune session n'est active
        let data = envelope.get("data").unwrap_or(&envelope);
        let profile = data.get("profile").filter(|p| !p.is_null()).ok_or_else(|| {
            NcmError::Unauthorized("no active session for this credential".to_string())
        })?;

        let user_id = profile
            .get("userId")
            .map(value_to_id)
            .ok_or_else(|| NcmError::Unauthorized("profile has no userId".to_string()))?;
        let nickname = profile
            .get("nickname")
            .and_then(Value::as_str)
            .map(str::to_string);

        debug!(
            "Session valid - User ID: {}, Nickname: {:?}",
            user_id, nickname
        );

        Ok(AccountInfo { user_id, nickname })
    }

    /// Demande une nouvelle clé de login QR
    pub async fn qr_key(&self) -> Result<String> {
        let envelope = self.get_envelope("/login/qr/key", &[], None).await?;
        let data = envelope
            .get("data")
            .cloned()
            .ok_or_else(|| NcmError::Other("qr key response has no data".to_string()))?;
        let key: QrKey = serde_json::from_value(data)?;
        Ok(key.unikey)
    }

    /// Génère l'URL à encoder dans le QR code pour une clé donnée
    pub async fn qr_create(&self, key: &str) -> Result<QrLogin> {
        let envelope = self
            .get_envelope("/login/qr/create", &[("key", key)], None)
            .await?;
        let data = envelope
            .get("data")
            .cloned()
            .ok_or_else(|| NcmError::Other("qr create response has no data".to_string()))?;
        let login: QrLogin = serde_json::from_value(data)?;
        Ok(login)
    }

    /// Interroge l'état du login QR
    ///
    /// Le champ `code` est une machine à états (800 expiré, 801 en attente,
    /// 802 scanné, 803 confirmé), pas un indicateur d'erreur.
    pub async fn qr_check(&self, key: &str) -> Result<QrCheck> {
        let envelope = self
            .get_envelope("/login/qr/check", &[("key", key)], None)
            .await?;
        let check: QrCheck = serde_json::from_value(envelope)?;
        Ok(check)
    }

    /// Renouvelle la session courante
    ///
    /// Retourne le nouveau cookie si le pont en émet un, None si la session
    /// a été prolongée sans rotation de cookie.
    pub async fn refresh_login(&self, credential: &str) -> Result<Option<String>> {
        let envelope = self
            .get_envelope("/login/refresh", &[], Some(credential))
            .await?;

        let code = envelope.get("code").and_then(Value::as_i64).unwrap_or(200);
        if code != 200 {
            return Err(NcmError::from_body_code(code, "login refresh rejected"));
        }

        info!("Session refreshed");
        Ok(envelope
            .get("cookie")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string))
    }
}

/// Convertit un id JSON (string ou number) en String
fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
