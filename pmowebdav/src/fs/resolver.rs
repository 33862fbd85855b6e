//! Résolution du namespace virtuel
//!
//! Deux responsabilités : construire les listings de répertoires (en
//! enregistrant le path map au passage) et résoudre un chemin feuille vers
//! un identifiant de chanson du catalogue.

use crate::error::{DavError, Result};
use crate::fs::{self, naming, DavEntry, PathKind, PlaylistRoot};
use crate::state::DavState;
use pmoncm::{CatalogStore, PlaylistSummary, Song};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Namespace sqlite du path map
const NS_PATHMAP: &str = "pathmap";

/// Path map : chemins feuilles vers identifiants de chansons
///
/// Les entrées naissent comme effet de bord des listings, persistent dans
/// le magasin sqlite et ne disparaissent que sur invalidation explicite.
/// Plusieurs chemins peuvent pointer la même chanson (recommandations du
/// jour et playlist, par exemple) ; aucune unicité côté id. En cas de
/// collision de noms dans un même répertoire, la dernière écriture gagne.
pub struct Vfs {
    map: RwLock<HashMap<String, String>>,
    store: Arc<CatalogStore>,
}

impl Vfs {
    /// Crée le path map en préchargeant les entrées persistées
    pub fn new(store: Arc<CatalogStore>) -> Self {
        let map = match store.load_namespace::<String>(NS_PATHMAP) {
            Ok(entries) => {
                if !entries.is_empty() {
                    info!("Preloaded {} path map entr(ies)", entries.len());
                }
                entries.into_iter().collect()
            }
            Err(e) => {
                warn!("Failed to preload path map: {}", e);
                HashMap::new()
            }
        };

        Self {
            map: RwLock::new(map),
            store,
        }
    }

    /// Enregistre (ou écrase) l'association chemin → chanson
    pub async fn record(&self, path: &str, song_id: &str) {
        self.map
            .write()
            .await
            .insert(path.to_string(), song_id.to_string());
        if let Err(e) = self
            .store
            .put_json(NS_PATHMAP, path, &song_id.to_string())
        {
            warn!("Failed to persist path map entry {}: {}", path, e);
        }
    }

    /// Résout un chemin feuille déjà connu
    pub async fn resolve(&self, path: &str) -> Option<String> {
        self.map.read().await.get(path).cloned()
    }

    /// Retourne une chanson quelconque mappée dans un répertoire
    ///
    /// Sert les fichiers de couverture synthétisés : n'importe quelle piste
    /// du répertoire fournit l'image d'album.
    pub async fn any_song_in_dir(&self, dir: &str) -> Option<String> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.map
            .read()
            .await
            .iter()
            .find(|(path, _)| path.starts_with(&prefix))
            .map(|(_, id)| id.clone())
    }

    /// Supprime toutes les entrées d'un répertoire (mémoire + disque)
    pub async fn invalidate_dir(&self, dir: &str) {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.map.write().await.retain(|path, _| !path.starts_with(&prefix));
        if let Err(e) = self.store.delete_prefix(NS_PATHMAP, &prefix) {
            warn!("Failed to drop persisted path map entries under {}: {}", dir, e);
        }
    }
}

/// Construit le listing d'un répertoire : l'entrée du répertoire lui-même
/// suivie de ses enfants ordonnés
///
/// Les chemins des pistes listées sont enregistrés dans le path map, de
/// sorte qu'un chemin retourné par un PROPFIND résout toujours ensuite.
pub async fn list_directory(
    state: &DavState,
    path: &str,
    kind: &PathKind,
) -> Result<(DavEntry, Vec<DavEntry>)> {
    match kind {
        PathKind::Root => {
            let mtime = state.start_of_day;
            let children = [naming::DAILY_SONGS, naming::DAILY_PLAYLISTS, naming::USER_PLAYLISTS]
                .iter()
                .map(|name| DavEntry::collection(*name, &format!("/{name}"), mtime))
                .collect();
            Ok((DavEntry::collection("/", "/", mtime), children))
        }

        PathKind::DailySongs => {
            let songs = state.client.daily_songs().await?;
            let mtime = state.start_of_day;
            let children = song_entries(state, path, &songs, &HashMap::new(), mtime).await;
            Ok((
                DavEntry::collection(naming::DAILY_SONGS, path, mtime),
                children,
            ))
        }

        PathKind::DailyPlaylists | PathKind::UserPlaylists => {
            let summaries = match kind {
                PathKind::DailyPlaylists => state.client.daily_playlists().await?,
                _ => state.client.user_playlists().await?,
            };

            let mut children = Vec::with_capacity(summaries.len());
            for summary in &summaries {
                let name = naming::sanitize(&summary.name);
                if name.is_empty() {
                    continue;
                }
                let child_path = format!("{path}/{name}");
                let mtime = fs::dir_mtime(summary.update_time, state.start_of_day);
                children.push(DavEntry::collection(name, &child_path, mtime));
            }

            let root_name = match kind {
                PathKind::DailyPlaylists => naming::DAILY_PLAYLISTS,
                _ => naming::USER_PLAYLISTS,
            };
            Ok((
                DavEntry::collection(root_name, path, state.start_of_day),
                children,
            ))
        }

        PathKind::PlaylistDir { root, name } => {
            let summary = find_playlist(state, *root, name)
                .await?
                .ok_or_else(|| DavError::NotFound(format!("no playlist named '{name}'")))?;

            let snapshot = state.client.playlist_snapshot(&summary.id).await?;
            let songs = state.client.get_songs(&snapshot.track_ids).await?;
            let mtime = fs::dir_mtime(snapshot.update_time, state.start_of_day);

            // Respecter l'ordre du catalogue ; les chansons absentes d'un
            // lot en échec sont simplement omises du listing.
            let mut ordered = Vec::with_capacity(snapshot.track_ids.len());
            for id in &snapshot.track_ids {
                if let Some(song) = songs.get(id) {
                    ordered.push(song.clone());
                } else {
                    debug!("Song {} missing from partial fetch, omitted", id);
                }
            }

            let children =
                song_entries(state, path, &ordered, &snapshot.added_at, mtime).await;
            Ok((DavEntry::collection(name.clone(), path, mtime), children))
        }

        PathKind::Cover { .. } | PathKind::Track { .. } => Err(DavError::BadRequest(
            "cannot list a leaf resource as a directory".to_string(),
        )),
    }
}

/// Construit les entrées de fichiers d'une suite de chansons et alimente le
/// path map
async fn song_entries(
    state: &DavState,
    dir: &str,
    songs: &[Song],
    added_at: &HashMap<String, i64>,
    parent_mtime: chrono::DateTime<chrono::Utc>,
) -> Vec<DavEntry> {
    let mut entries = Vec::with_capacity(songs.len());
    for song in songs {
        let file_name = naming::track_file_name(song, state.quality);
        let child_path = format!("{dir}/{file_name}");

        // Dernière écriture gagnante en cas de collision de noms
        state.vfs.record(&child_path, &song.id).await;

        let mtime = fs::file_mtime(
            added_at.get(&song.id).copied(),
            song.publish_time,
            parent_mtime,
        );
        entries.push(DavEntry::file(
            file_name,
            &child_path,
            mtime,
            state.quality.mime_type(),
        ));
    }
    entries
}

/// Retrouve une playlist par son nom affiché (sanitisé)
pub async fn find_playlist(
    state: &DavState,
    root: PlaylistRoot,
    name: &str,
) -> Result<Option<PlaylistSummary>> {
    let summaries = match root {
        PlaylistRoot::Daily => state.client.daily_playlists().await?,
        PlaylistRoot::User => state.client.user_playlists().await?,
    };

    Ok(summaries
        .into_iter()
        .find(|summary| naming::sanitize(&summary.name) == name))
}

/// Résout un chemin feuille vers un identifiant de chanson
///
/// Le path map est consulté d'abord ; sur absence, le nom de fichier est
/// converti en mots-clés et le meilleur résultat de recherche fait foi
/// (certains clients demandent un fichier sans jamais avoir émis le
/// PROPFIND qui aurait peuplé le map). L'entrée reconstituée est
/// réenregistrée pour les accès suivants.
pub async fn resolve_track(state: &DavState, path: &str, file: &str) -> Result<String> {
    if let Some(id) = state.vfs.resolve(path).await {
        return Ok(id);
    }

    let keywords = naming::search_keywords(file)
        .ok_or_else(|| DavError::NotFound(format!("unresolvable file name '{file}'")))?;

    debug!("Path map miss for {}, searching '{}'", path, keywords);
    match state.client.search_song(&keywords).await? {
        Some(song) => {
            state.vfs.record(path, &song.id).await;
            Ok(song.id)
        }
        None => Err(DavError::NotFound(format!(
            "no catalog match for '{keywords}'"
        ))),
    }
}
