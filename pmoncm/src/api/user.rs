//! Module des opérations sur les données utilisateur (mutation de playlists)

use super::NcmApi;
use crate::error::{NcmError, Result};
use serde_json::Value;
use tracing::{debug, info};

/// Code d'enveloppe signalant que la piste est déjà dans la playlist
const CODE_ALREADY_PRESENT: i64 = 502;

/// Interprète le code de retour d'un ajout de piste
///
/// L'ajout est idempotent : "déjà présente" (502) est un succès au même
/// titre que 200, pour qu'un second COPY du même morceau réponde 201.
fn interpret_add_track_code(code: i64, message: &str) -> Result<()> {
    match code {
        200 | CODE_ALREADY_PRESENT => Ok(()),
        other => Err(NcmError::from_body_code(other, message)),
    }
}

impl NcmApi {
    /// Ajoute une piste à une playlist de l'utilisateur
    ///
    /// # Errors
    ///
    /// * `NcmError::Unauthorized` - Session absente ou révoquée
    /// * `NcmError::Api` - La mutation a été refusée par le catalogue
    pub async fn playlist_add_track(
        &self,
        playlist_id: &str,
        track_id: &str,
        credential: &str,
    ) -> Result<()> {
        let envelope = self
            .get_envelope(
                "/playlist/tracks",
                &[("op", "add"), ("pid", playlist_id), ("tracks", track_id)],
                Some(credential),
            )
            .await?;

        let code = envelope.get("code").and_then(Value::as_i64).unwrap_or(200);
        let message = envelope
            .get("message")
            .or_else(|| envelope.get("msg"))
            .and_then(Value::as_str)
            .unwrap_or("add track rejected");

        interpret_add_track_code(code, message)?;

        if code == CODE_ALREADY_PRESENT {
            debug!(
                "Track {} already present in playlist {}",
                track_id, playlist_id
            );
        } else {
            info!("Track {} added to playlist {}", track_id, playlist_id);
        }

        Ok(())
    }
}
