//! Système de cache en mémoire pour les données du catalogue
//!
//! Ce module fournit un cache en mémoire avec TTL pour minimiser les
//! requêtes au pont API. La fraîcheur est purement indicative : une entrée
//! expirée est simplement refetchée, jamais considérée comme corrompue.

use crate::models::{PlaylistSnapshot, PlaylistSummary, Song, StreamInfo};
use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::time::Duration;

/// TTL des résultats de recherche
const SEARCH_TTL: Duration = Duration::from_secs(900);

/// TTL des URLs de streaming (transitoires côté catalogue)
const STREAM_URL_TTL: Duration = Duration::from_secs(300);

/// Cache principal pour les données du catalogue
#[derive(Clone)]
pub struct CatalogCache {
    /// Cache des chansons (TTL long, métadonnées stables)
    songs: Arc<MokaCache<String, Song>>,
    /// Cache des instantanés de playlists (TTL court)
    playlists: Arc<MokaCache<String, PlaylistSnapshot>>,
    /// Cache des listes de playlists ("user:<uid>", "daily") (TTL court)
    playlist_lists: Arc<MokaCache<String, Vec<PlaylistSummary>>>,
    /// Cache des recommandations quotidiennes de chansons (TTL court)
    daily_songs: Arc<MokaCache<String, Vec<Song>>>,
    /// Cache des résultats de recherche
    searches: Arc<MokaCache<String, Vec<Song>>>,
    /// Cache des URLs de streaming
    stream_urls: Arc<MokaCache<String, StreamInfo>>,
}

impl CatalogCache {
    /// Crée un nouveau cache avec les TTL par défaut (24 h / 1 h)
    pub fn new() -> Self {
        Self::with_ttls(Duration::from_secs(86400), Duration::from_secs(3600))
    }

    /// Crée un nouveau cache avec des TTL spécifiques
    ///
    /// # Arguments
    ///
    /// * `song_ttl` - Durée de vie des métadonnées de chansons
    /// * `listing_ttl` - Durée de vie des playlists et listes
    pub fn with_ttls(song_ttl: Duration, listing_ttl: Duration) -> Self {
        Self {
            songs: Arc::new(
                MokaCache::builder()
                    .max_capacity(10_000)
                    .time_to_live(song_ttl)
                    .build(),
            ),
            playlists: Arc::new(
                MokaCache::builder()
                    .max_capacity(500)
                    .time_to_live(listing_ttl)
                    .build(),
            ),
            playlist_lists: Arc::new(
                MokaCache::builder()
                    .max_capacity(50)
                    .time_to_live(listing_ttl)
                    .build(),
            ),
            daily_songs: Arc::new(
                MokaCache::builder()
                    .max_capacity(10)
                    .time_to_live(listing_ttl)
                    .build(),
            ),
            searches: Arc::new(
                MokaCache::builder()
                    .max_capacity(500)
                    .time_to_live(SEARCH_TTL)
                    .build(),
            ),
            stream_urls: Arc::new(
                MokaCache::builder()
                    .max_capacity(500)
                    .time_to_live(STREAM_URL_TTL)
                    .build(),
            ),
        }
    }

    // ============ Chansons ============

    /// Récupère une chanson depuis le cache
    pub async fn get_song(&self, id: &str) -> Option<Song> {
        self.songs.get(id).await
    }

    /// Ajoute une chanson au cache
    pub async fn put_song(&self, song: Song) {
        self.songs.insert(song.id.clone(), song).await;
    }

    // ============ Playlists ============

    /// Récupère un instantané de playlist depuis le cache
    pub async fn get_playlist(&self, id: &str) -> Option<PlaylistSnapshot> {
        self.playlists.get(id).await
    }

    /// Ajoute un instantané de playlist au cache
    pub async fn put_playlist(&self, snapshot: PlaylistSnapshot) {
        self.playlists.insert(snapshot.id.clone(), snapshot).await;
    }

    /// Invalide un instantané de playlist
    pub async fn invalidate_playlist(&self, id: &str) {
        self.playlists.invalidate(id).await;
    }

    // ============ Listes de playlists ============

    /// Récupère une liste de playlists depuis le cache
    pub async fn get_playlist_list(&self, key: &str) -> Option<Vec<PlaylistSummary>> {
        self.playlist_lists.get(key).await
    }

    /// Ajoute une liste de playlists au cache
    pub async fn put_playlist_list(&self, key: String, list: Vec<PlaylistSummary>) {
        self.playlist_lists.insert(key, list).await;
    }

    /// Invalide une liste de playlists
    pub async fn invalidate_playlist_list(&self, key: &str) {
        self.playlist_lists.invalidate(key).await;
    }

    // ============ Recommandations quotidiennes ============

    /// Récupère les chansons du jour depuis le cache
    pub async fn get_daily_songs(&self) -> Option<Vec<Song>> {
        self.daily_songs.get("songs").await
    }

    /// Ajoute les chansons du jour au cache
    pub async fn put_daily_songs(&self, songs: Vec<Song>) {
        self.daily_songs.insert("songs".to_string(), songs).await;
    }

    // ============ Recherches ============

    /// Récupère un résultat de recherche depuis le cache
    pub async fn get_search(&self, keywords: &str) -> Option<Vec<Song>> {
        self.searches.get(keywords).await
    }

    /// Ajoute un résultat de recherche au cache
    pub async fn put_search(&self, keywords: String, songs: Vec<Song>) {
        self.searches.insert(keywords, songs).await;
    }

    // ============ URLs de streaming ============

    /// Récupère une URL de streaming depuis le cache
    pub async fn get_stream_url(&self, key: &str) -> Option<StreamInfo> {
        self.stream_urls.get(key).await
    }

    /// Ajoute une URL de streaming au cache
    pub async fn put_stream_url(&self, key: String, info: StreamInfo) {
        self.stream_urls.insert(key, info).await;
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Album, Artist};

    fn sample_song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            name: "Test Song".to_string(),
            artists: vec![Artist {
                id: "1".to_string(),
                name: "Test Artist".to_string(),
            }],
            album: Album::default(),
            duration_ms: 1000,
            publish_time: None,
        }
    }

    #[tokio::test]
    async fn test_song_cache_roundtrip() {
        let cache = CatalogCache::new();
        cache.put_song(sample_song("42")).await;

        let song = cache.get_song("42").await;
        assert!(song.is_some());
        assert_eq!(song.unwrap().name, "Test Song");
        assert!(cache.get_song("43").await.is_none());
    }

    #[tokio::test]
    async fn test_playlist_invalidation() {
        let cache = CatalogCache::new();
        cache
            .put_playlist(PlaylistSnapshot {
                id: "7".to_string(),
                name: "List".to_string(),
                track_ids: vec!["1".to_string()],
                added_at: Default::default(),
                update_time: None,
            })
            .await;

        assert!(cache.get_playlist("7").await.is_some());
        cache.invalidate_playlist("7").await;
        assert!(cache.get_playlist("7").await.is_none());
    }
}
