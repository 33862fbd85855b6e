//! Module d'accès au catalogue (chansons, playlists, recommandations, recherche)

use super::NcmApi;
use crate::error::{NcmError, Result};
use crate::models::*;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Réponse chanson telle que livrée par le catalogue
///
/// Les endpoints récents utilisent les clés courtes `ar`/`al`/`dt`, les
/// anciens `artists`/`album`/`duration` ; les alias couvrent les deux.
#[derive(Debug, Deserialize)]
pub(crate) struct SongResponse {
    #[serde(deserialize_with = "crate::models::deserialize_id")]
    id: String,
    name: String,
    #[serde(default, alias = "artists")]
    ar: Vec<ArtistResponse>,
    #[serde(default, alias = "album")]
    al: Option<AlbumResponse>,
    #[serde(default, alias = "duration")]
    dt: u64,
    #[serde(default, rename = "publishTime")]
    publish_time: Option<i64>,
}

/// Réponse artiste
#[derive(Debug, Deserialize)]
pub(crate) struct ArtistResponse {
    #[serde(default, deserialize_with = "crate::models::deserialize_id")]
    id: String,
    #[serde(default)]
    name: String,
}

/// Réponse album
#[derive(Debug, Deserialize)]
pub(crate) struct AlbumResponse {
    #[serde(default, deserialize_with = "crate::models::deserialize_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "picUrl")]
    pic_url: Option<String>,
}

impl From<SongResponse> for Song {
    fn from(resp: SongResponse) -> Self {
        Song {
            id: resp.id,
            name: resp.name,
            artists: resp
                .ar
                .into_iter()
                .map(|a| Artist {
                    id: a.id,
                    name: a.name,
                })
                .collect(),
            album: resp
                .al
                .map(|a| Album {
                    id: Some(a.id),
                    name: a.name,
                    pic_url: a.pic_url,
                })
                .unwrap_or_default(),
            duration_ms: resp.dt,
            publish_time: resp.publish_time,
        }
    }
}

/// Réponse de l'endpoint /song/detail
#[derive(Debug, Deserialize)]
struct SongDetailResponse {
    #[serde(default)]
    songs: Vec<SongResponse>,
}

/// Référence de piste dans /playlist/detail (id + date d'ajout)
#[derive(Debug, Deserialize)]
struct TrackIdResponse {
    #[serde(deserialize_with = "crate::models::deserialize_id")]
    id: String,
    #[serde(default)]
    at: Option<i64>,
}

/// Réponse de l'endpoint /playlist/detail
#[derive(Debug, Deserialize)]
struct PlaylistDetailEnvelope {
    playlist: PlaylistDetailResponse,
}

#[derive(Debug, Deserialize)]
struct PlaylistDetailResponse {
    #[serde(deserialize_with = "crate::models::deserialize_id")]
    id: String,
    name: String,
    #[serde(default, rename = "updateTime")]
    update_time: Option<i64>,
    #[serde(default, rename = "trackIds")]
    track_ids: Vec<TrackIdResponse>,
}

/// Réponse playlist (résumé)
#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistSummaryResponse {
    #[serde(deserialize_with = "crate::models::deserialize_id")]
    id: String,
    name: String,
    #[serde(default, alias = "trackCount", alias = "trackcount")]
    track_count: u32,
    #[serde(default, rename = "updateTime")]
    update_time: Option<i64>,
    #[serde(default, rename = "userId")]
    user_id: Option<i64>,
}

impl From<PlaylistSummaryResponse> for PlaylistSummary {
    fn from(resp: PlaylistSummaryResponse) -> Self {
        PlaylistSummary {
            id: resp.id,
            name: resp.name,
            track_count: resp.track_count,
            update_time: resp.update_time,
            creator_id: resp.user_id.map(|id| id.to_string()),
        }
    }
}

/// Réponse de l'endpoint /user/playlist
#[derive(Debug, Deserialize)]
struct UserPlaylistsResponse {
    #[serde(default)]
    playlist: Vec<PlaylistSummaryResponse>,
}

/// Réponse de l'endpoint /recommend/songs
#[derive(Debug, Deserialize)]
struct DailySongsEnvelope {
    data: DailySongsResponse,
}

#[derive(Debug, Deserialize)]
struct DailySongsResponse {
    #[serde(default, rename = "dailySongs")]
    daily_songs: Vec<SongResponse>,
}

/// Réponse de l'endpoint /recommend/resource
#[derive(Debug, Deserialize)]
struct DailyPlaylistsResponse {
    #[serde(default)]
    recommend: Vec<PlaylistSummaryResponse>,
}

/// Réponse de l'endpoint /cloudsearch
#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    result: Option<SearchSongsResponse>,
}

#[derive(Debug, Deserialize)]
struct SearchSongsResponse {
    #[serde(default)]
    songs: Vec<SongResponse>,
}

/// Réponse de l'endpoint /song/url/v1
#[derive(Debug, Deserialize)]
struct SongUrlEnvelope {
    #[serde(default)]
    data: Vec<SongUrlResponse>,
}

#[derive(Debug, Deserialize)]
struct SongUrlResponse {
    #[serde(deserialize_with = "crate::models::deserialize_id")]
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default, rename = "type")]
    file_type: Option<String>,
}

impl NcmApi {
    /// Récupère les métadonnées d'un lot de chansons
    ///
    /// L'appelant est responsable du découpage en lots ; le catalogue
    /// n'accepte qu'une taille de requête bornée.
    pub async fn song_detail(&self, ids: &[String], credential: &str) -> Result<Vec<Song>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let response: SongDetailResponse = self
            .get("/song/detail", &[("ids", joined.as_str())], Some(credential))
            .await?;

        debug!("Fetched {} song(s) from catalog", response.songs.len());
        Ok(response.songs.into_iter().map(Song::from).collect())
    }

    /// Récupère l'instantané d'une playlist (ordre des pistes + dates d'ajout)
    pub async fn playlist_detail(
        &self,
        playlist_id: &str,
        credential: &str,
    ) -> Result<PlaylistSnapshot> {
        let envelope: PlaylistDetailEnvelope = self
            .get("/playlist/detail", &[("id", playlist_id)], Some(credential))
            .await?;

        let detail = envelope.playlist;
        let mut added_at = HashMap::new();
        let mut track_ids = Vec::with_capacity(detail.track_ids.len());
        for track in detail.track_ids {
            if let Some(at) = track.at {
                added_at.insert(track.id.clone(), at);
            }
            track_ids.push(track.id);
        }

        Ok(PlaylistSnapshot {
            id: detail.id,
            name: detail.name,
            track_ids,
            added_at,
            update_time: detail.update_time,
        })
    }

    /// Liste les playlists d'un utilisateur
    pub async fn user_playlists(
        &self,
        user_id: &str,
        credential: &str,
    ) -> Result<Vec<PlaylistSummary>> {
        let response: UserPlaylistsResponse = self
            .get("/user/playlist", &[("uid", user_id)], Some(credential))
            .await?;

        Ok(response
            .playlist
            .into_iter()
            .map(PlaylistSummary::from)
            .collect())
    }

    /// Récupère les recommandations quotidiennes de chansons
    pub async fn daily_songs(&self, credential: &str) -> Result<Vec<Song>> {
        let envelope: DailySongsEnvelope = self
            .get("/recommend/songs", &[], Some(credential))
            .await?;

        Ok(envelope
            .data
            .daily_songs
            .into_iter()
            .map(Song::from)
            .collect())
    }

    /// Récupère les playlists recommandées du jour
    pub async fn daily_playlists(&self, credential: &str) -> Result<Vec<PlaylistSummary>> {
        let response: DailyPlaylistsResponse = self
            .get("/recommend/resource", &[], Some(credential))
            .await?;

        Ok(response
            .recommend
            .into_iter()
            .map(PlaylistSummary::from)
            .collect())
    }

    /// Recherche des chansons par mots-clés
    pub async fn search_songs(
        &self,
        keywords: &str,
        limit: u32,
        credential: &str,
    ) -> Result<Vec<Song>> {
        let limit = limit.to_string();
        let envelope: SearchEnvelope = self
            .get(
                "/cloudsearch",
                &[
                    ("keywords", keywords),
                    ("type", "1"),
                    ("limit", limit.as_str()),
                ],
                Some(credential),
            )
            .await?;

        Ok(envelope
            .result
            .map(|r| r.songs.into_iter().map(Song::from).collect())
            .unwrap_or_default())
    }

    /// Récupère l'URL de streaming transitoire d'une chanson
    ///
    /// # Errors
    ///
    /// * `NcmError::NotFound` - La chanson n'est pas streamable (URL absente)
    pub async fn song_url(
        &self,
        song_id: &str,
        quality: AudioQuality,
        credential: &str,
    ) -> Result<StreamInfo> {
        let envelope: SongUrlEnvelope = self
            .get(
                "/song/url/v1",
                &[("id", song_id), ("level", quality.as_level())],
                Some(credential),
            )
            .await?;

        let entry = envelope
            .data
            .into_iter()
            .find(|e| e.id == song_id)
            .ok_or_else(|| NcmError::NotFound(format!("no stream data for song {song_id}")))?;

        match entry.url {
            Some(url) if !url.is_empty() => Ok(StreamInfo {
                id: entry.id,
                url,
                level: entry.level,
                size: entry.size,
                file_type: entry.file_type,
            }),
            _ => Err(NcmError::NotFound(format!(
                "song {song_id} has no streamable URL"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_response_short_keys() {
        let json = r#"{
            "id": 347230,
            "name": "海阔天空",
            "ar": [{"id": 11127, "name": "Beyond"}],
            "al": {"id": 34209, "name": "乐与怒", "picUrl": "https://img.example/cover.jpg"},
            "dt": 326000,
            "publishTime": 736185600000
        }"#;
        let resp: SongResponse = serde_json::from_str(json).unwrap();
        let song = Song::from(resp);

        assert_eq!(song.id, "347230");
        assert_eq!(song.artist_names(), "Beyond");
        assert_eq!(song.album.name, "乐与怒");
        assert_eq!(song.cover_url(), Some("https://img.example/cover.jpg"));
        assert_eq!(song.publish_time, Some(736185600000));
    }

    #[test]
    fn test_song_response_legacy_keys() {
        let json = r#"{
            "id": "1",
            "name": "Track",
            "artists": [{"id": 2, "name": "Artist"}],
            "album": {"id": 3, "name": "Album"},
            "duration": 1000
        }"#;
        let resp: SongResponse = serde_json::from_str(json).unwrap();
        let song = Song::from(resp);
        assert_eq!(song.duration_ms, 1000);
        assert_eq!(song.artist_names(), "Artist");
    }

    #[test]
    fn test_playlist_detail_track_ids_keep_order() {
        let json = r#"{
            "playlist": {
                "id": 24381616,
                "name": "My Mix",
                "updateTime": 1639000000000,
                "trackIds": [
                    {"id": 3, "at": 1638000000000},
                    {"id": 1, "at": 1637000000000},
                    {"id": 2}
                ]
            }
        }"#;
        let envelope: PlaylistDetailEnvelope = serde_json::from_str(json).unwrap();
        let detail = envelope.playlist;
        let ids: Vec<&str> = detail.track_ids.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_song_url_empty_is_not_streamable() {
        let json = r#"{"data": [{"id": 5, "url": null, "size": 0}]}"#;
        let envelope: SongUrlEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.data[0].url.is_none());
    }

    #[test]
    fn test_search_without_results() {
        let json = r#"{"code": 200}"#;
        let envelope: SearchEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.result.is_none());
    }
}
