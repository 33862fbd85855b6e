//! Favoritage par COPY/MOVE
//!
//! Ce système n'implémente pas de déplacement de fichiers : un COPY ou un
//! MOVE dont la destination vit sous la racine des playlists utilisateur
//! est interprété comme "ajouter la piste à cette playlist". Toute autre
//! destination est rejetée.

use crate::error::{DavError, Result};
use crate::fs::{self, naming, resolver, PathKind, PlaylistRoot};
use crate::state::DavState;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tracing::info;

/// Traite un COPY/MOVE : résolution source + destination, mutation, purge
///
/// L'opération amont est un unique appel atomique ; en cas d'échec aucun
/// état partiel n'est laissé, seuls les caches restent intacts.
pub async fn handle_copy(
    state: &DavState,
    src_path: &str,
    headers: &HeaderMap,
) -> Result<Response> {
    let src_kind = fs::classify(src_path)
        .ok_or_else(|| DavError::NotFound(src_path.to_string()))?;
    let PathKind::Track { ref file, .. } = src_kind else {
        return Err(DavError::BadRequest(
            "COPY/MOVE source must be a track file".to_string(),
        ));
    };

    let destination = headers
        .get("destination")
        .ok_or_else(|| DavError::BadRequest("missing Destination header".to_string()))?
        .to_str()
        .map_err(|_| DavError::BadRequest("undecodable Destination header".to_string()))?;
    let playlist_name = destination_playlist_name(destination)?;

    // Source d'abord : un chemin inconnu doit échouer avant toute mutation
    let song_id = resolver::resolve_track(state, src_path, file).await?;

    let playlist = resolver::find_playlist(state, PlaylistRoot::User, &playlist_name)
        .await?
        .ok_or_else(|| {
            DavError::NotFound(format!("no user playlist named '{playlist_name}'"))
        })?;

    state.client.add_to_playlist(&playlist.id, &song_id).await?;

    // Purger ce qui a pu changer : le listing de la playlist cible, celui
    // de la racine utilisateur, et les chemins dérivés de l'ancien contenu.
    let dest_dir = format!("/{}/{}", naming::USER_PLAYLISTS, playlist_name);
    let user_root = format!("/{}", naming::USER_PLAYLISTS);
    state.listings.invalidate(&dest_dir).await;
    state.listings.invalidate(&user_root).await;
    state.vfs.invalidate_dir(&dest_dir).await;

    info!(
        "Favorited song {} into playlist '{}' ({})",
        song_id, playlist_name, playlist.id
    );

    Ok(StatusCode::CREATED.into_response())
}

/// Extrait le nom de playlist d'un header Destination
///
/// Le header porte un URI absolu ou un chemin ; seule une destination sous
/// la racine des playlists utilisateur est supportée.
pub(crate) fn destination_playlist_name(destination: &str) -> Result<String> {
    let path = match destination.parse::<Uri>() {
        Ok(uri) => uri.path().to_string(),
        Err(_) => destination.to_string(),
    };

    let decoded = fs::decode_path(&path)
        .ok_or_else(|| DavError::BadRequest("undecodable Destination path".to_string()))?;

    let segments: Vec<&str> = decoded.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        [root, name, ..] if *root == naming::USER_PLAYLISTS && !name.is_empty() => {
            Ok(name.to_string())
        }
        _ => Err(DavError::UnsupportedDestination(decoded)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_accepts_absolute_uri() {
        let name =
            destination_playlist_name("http://localhost:8080/My%20Playlists/Road%20Trip").unwrap();
        assert_eq!(name, "Road Trip");
    }

    #[test]
    fn test_destination_accepts_plain_path_with_file() {
        let name =
            destination_playlist_name("/My%20Playlists/Mix/Title%20-%20Artist.mp3").unwrap();
        assert_eq!(name, "Mix");
    }

    #[test]
    fn test_destination_outside_user_root_is_unsupported() {
        let err = destination_playlist_name("/Daily%20Songs/file.mp3").unwrap_err();
        assert!(matches!(err, DavError::UnsupportedDestination(_)));

        let err = destination_playlist_name("/elsewhere/entirely").unwrap_err();
        assert!(matches!(err, DavError::UnsupportedDestination(_)));
    }

    #[test]
    fn test_destination_root_without_playlist_is_unsupported() {
        let err = destination_playlist_name("/My%20Playlists").unwrap_err();
        assert!(matches!(err, DavError::UnsupportedDestination(_)));
    }
}
