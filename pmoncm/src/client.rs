//! Client principal pour interagir avec le catalogue cloud music
//!
//! Ce module fournit un client haut-niveau combinant le pont API, le cache
//! mémoire, le magasin sqlite et le credential de session. La discipline
//! d'accès est toujours la même : moka → sqlite frais → catalogue distant.

use crate::api::NcmApi;
use crate::cache::CatalogCache;
use crate::error::{NcmError, Result};
use crate::models::*;
use crate::session::CredentialStore;
use crate::store::CatalogStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Taille maximale d'un lot de requête song/detail
const SONG_BATCH_SIZE: usize = 50;

/// Namespaces du magasin sqlite
const NS_SONG: &str = "song";
const NS_PLAYLIST: &str = "playlist";
const NS_PLAYLIST_LIST: &str = "playlist_list";
const NS_DAILY: &str = "daily";

/// Client cloud music haut-niveau avec caches
pub struct NcmClient {
    /// API bas-niveau
    api: NcmApi,
    /// Credential de session partagé
    session: Arc<CredentialStore>,
    /// Cache en mémoire
    cache: CatalogCache,
    /// Magasin durable
    store: Arc<CatalogStore>,
    /// TTL des métadonnées de chansons
    song_ttl: Duration,
    /// TTL des playlists et listes
    listing_ttl: Duration,
}

impl NcmClient {
    /// Crée un client avec des TTL explicites
    pub fn new(
        api: NcmApi,
        session: Arc<CredentialStore>,
        store: Arc<CatalogStore>,
        song_ttl: Duration,
        listing_ttl: Duration,
    ) -> Self {
        Self {
            api,
            session,
            cache: CatalogCache::with_ttls(song_ttl, listing_ttl),
            store,
            song_ttl,
            listing_ttl,
        }
    }

    /// Crée un client depuis la configuration globale
    pub fn from_config(
        session: Arc<CredentialStore>,
        store: Arc<CatalogStore>,
    ) -> Result<Self> {
        let config = pmodavconfig::get_config();
        let api = NcmApi::new(config.get_api_base_url())?;
        let song_ttl = Duration::from_secs(config.get_song_ttl_secs());
        let listing_ttl = Duration::from_secs(config.get_listing_ttl_secs());
        Ok(Self::new(api, session, store, song_ttl, listing_ttl))
    }

    /// Retourne le magasin de session
    pub fn session(&self) -> Arc<CredentialStore> {
        self.session.clone()
    }

    /// Retourne le magasin sqlite partagé
    pub fn store(&self) -> Arc<CatalogStore> {
        self.store.clone()
    }

    /// Client HTTP sous-jacent (mode proxy du serveur WebDAV)
    pub fn http_client(&self) -> &reqwest::Client {
        self.api.http_client()
    }

    // ============ Session ============

    /// Valide le credential courant auprès du catalogue
    ///
    /// En cas de succès, l'identifiant utilisateur est mémorisé dans le
    /// magasin de session.
    pub async fn validate_credential(&self) -> Result<AccountInfo> {
        let cookie = self.session.require_cookie().await?;
        let account = self.api.login_status(&cookie).await?;
        self.session.set_user_id(account.user_id.clone()).await;
        Ok(account)
    }

    /// Démarre un flow de login QR : retourne (clé, URL à scanner)
    pub async fn qr_login_start(&self) -> Result<(String, String)> {
        let key = self.api.qr_key().await?;
        let login = self.api.qr_create(&key).await?;
        Ok((key, login.url))
    }

    /// Interroge l'état du login QR pour une clé donnée
    pub async fn qr_login_poll(&self, key: &str) -> Result<QrCheck> {
        self.api.qr_check(key).await
    }

    /// Committe un cookie fraîchement émis puis valide la session
    pub async fn commit_cookie(&self, cookie: String) -> Result<AccountInfo> {
        self.session.commit(cookie).await;
        self.validate_credential().await
    }

    /// Rafraîchit la session courante (rotation éventuelle du cookie)
    pub async fn refresh_credential(&self) -> Result<()> {
        let cookie = self.session.require_cookie().await?;
        if let Some(new_cookie) = self.api.refresh_login(&cookie).await? {
            self.session.commit(new_cookie).await;
        }
        Ok(())
    }

    /// Lance la tâche de fond de rafraîchissement du credential
    ///
    /// La tâche est indépendante du traitement des requêtes : un échec est
    /// loggé et le credential courant conservé jusqu'au tick suivant.
    pub fn spawn_credential_refresh(
        self: &Arc<Self>,
        period: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Le premier tick est immédiat ; on le consomme pour ne pas
            // rafraîchir un credential qui vient d'être validé.
            interval.tick().await;
            loop {
                interval.tick().await;
                match client.refresh_credential().await {
                    Ok(()) => debug!("Credential refresh tick completed"),
                    Err(e) => warn!("Credential refresh failed: {}", e),
                }
            }
        })
    }

    // ============ Chansons ============

    /// Récupère les métadonnées d'un ensemble de chansons
    ///
    /// Les ids frais sont servis depuis les caches ; les manquants sont
    /// récupérés par lots de 50. Un lot en échec est loggé et omis : l'appel
    /// retourne un résultat partiel plutôt qu'une erreur dure, pour qu'un
    /// lot défaillant ne vide pas tout un répertoire.
    pub async fn get_songs(&self, ids: &[String]) -> Result<HashMap<String, Song>> {
        let credential = self.session.require_cookie().await?;

        let mut resolved = HashMap::new();
        let mut missing = Vec::new();

        for id in ids {
            if resolved.contains_key(id) {
                continue;
            }
            if let Some(song) = self.cache.get_song(id).await {
                resolved.insert(id.clone(), song);
                continue;
            }
            match self.store.get_json::<Song>(NS_SONG, id, self.song_ttl) {
                Ok(Some(entry)) if entry.fresh => {
                    self.cache.put_song(entry.value.clone()).await;
                    resolved.insert(id.clone(), entry.value);
                }
                Ok(_) => missing.push(id.clone()),
                Err(e) => {
                    warn!("Catalog store read failed for song {}: {}", id, e);
                    missing.push(id.clone());
                }
            }
        }

        for batch in missing.chunks(SONG_BATCH_SIZE) {
            match self.api.song_detail(batch, &credential).await {
                Ok(songs) => {
                    for song in songs {
                        self.remember_song(&song).await;
                        resolved.insert(song.id.clone(), song);
                    }
                }
                Err(e) => {
                    // Résultat partiel : les autres lots restent servis
                    warn!("Song detail batch of {} failed: {}", batch.len(), e);
                }
            }
        }

        Ok(resolved)
    }

    /// Insère une chanson dans le cache mémoire et le magasin durable
    async fn remember_song(&self, song: &Song) {
        self.cache.put_song(song.clone()).await;
        if let Err(e) = self.store.put_json(NS_SONG, &song.id, song) {
            warn!("Failed to persist song {}: {}", song.id, e);
        }
    }

    // ============ Playlists ============

    /// Récupère l'instantané d'une playlist
    pub async fn playlist_snapshot(&self, playlist_id: &str) -> Result<PlaylistSnapshot> {
        if let Some(snapshot) = self.cache.get_playlist(playlist_id).await {
            debug!("Playlist {} found in cache", playlist_id);
            return Ok(snapshot);
        }

        match self
            .store
            .get_json::<PlaylistSnapshot>(NS_PLAYLIST, playlist_id, self.listing_ttl)
        {
            Ok(Some(entry)) if entry.fresh => {
                self.cache.put_playlist(entry.value.clone()).await;
                return Ok(entry.value);
            }
            Ok(_) => {}
            Err(e) => warn!("Catalog store read failed for playlist {}: {}", playlist_id, e),
        }

        let credential = self.session.require_cookie().await?;
        let snapshot = self.api.playlist_detail(playlist_id, &credential).await?;

        self.cache.put_playlist(snapshot.clone()).await;
        if let Err(e) = self.store.put_json(NS_PLAYLIST, playlist_id, &snapshot) {
            warn!("Failed to persist playlist {}: {}", playlist_id, e);
        }

        Ok(snapshot)
    }

    /// Liste les playlists de l'utilisateur connecté
    pub async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let user_id = self.session.require_user_id().await?;
        let key = format!("user:{user_id}");

        if let Some(list) = self.cache.get_playlist_list(&key).await {
            return Ok(list);
        }

        match self
            .store
            .get_json::<Vec<PlaylistSummary>>(NS_PLAYLIST_LIST, &key, self.listing_ttl)
        {
            Ok(Some(entry)) if entry.fresh => {
                self.cache.put_playlist_list(key, entry.value.clone()).await;
                return Ok(entry.value);
            }
            Ok(_) => {}
            Err(e) => warn!("Catalog store read failed for {}: {}", key, e),
        }

        let credential = self.session.require_cookie().await?;
        let list = self.api.user_playlists(&user_id, &credential).await?;

        self.cache.put_playlist_list(key.clone(), list.clone()).await;
        if let Err(e) = self.store.put_json(NS_PLAYLIST_LIST, &key, &list) {
            warn!("Failed to persist user playlists: {}", e);
        }

        Ok(list)
    }

    /// Invalide la liste des playlists de l'utilisateur connecté
    pub async fn invalidate_user_playlists(&self) {
        if let Some(user_id) = self.session.user_id().await {
            let key = format!("user:{user_id}");
            self.cache.invalidate_playlist_list(&key).await;
            if let Err(e) = self.store.delete(NS_PLAYLIST_LIST, &key) {
                warn!("Failed to drop persisted user playlists: {}", e);
            }
        }
    }

    /// Invalide un instantané de playlist (mémoire + disque)
    pub async fn invalidate_playlist(&self, playlist_id: &str) {
        self.cache.invalidate_playlist(playlist_id).await;
        if let Err(e) = self.store.delete(NS_PLAYLIST, playlist_id) {
            warn!("Failed to drop persisted playlist {}: {}", playlist_id, e);
        }
    }

    // ============ Recommandations ============

    /// Récupère les recommandations quotidiennes de chansons
    pub async fn daily_songs(&self) -> Result<Vec<Song>> {
        if let Some(songs) = self.cache.get_daily_songs().await {
            return Ok(songs);
        }

        match self
            .store
            .get_json::<Vec<Song>>(NS_DAILY, "songs", self.listing_ttl)
        {
            Ok(Some(entry)) if entry.fresh => {
                self.cache.put_daily_songs(entry.value.clone()).await;
                return Ok(entry.value);
            }
            Ok(_) => {}
            Err(e) => warn!("Catalog store read failed for daily songs: {}", e),
        }

        let credential = self.session.require_cookie().await?;
        let songs = self.api.daily_songs(&credential).await?;

        // Les chansons du jour alimentent aussi le cache de métadonnées
        for song in &songs {
            self.remember_song(song).await;
        }

        self.cache.put_daily_songs(songs.clone()).await;
        if let Err(e) = self.store.put_json(NS_DAILY, "songs", &songs) {
            warn!("Failed to persist daily songs: {}", e);
        }

        info!("Fetched {} daily song(s)", songs.len());
        Ok(songs)
    }

    /// Récupère les playlists recommandées du jour
    pub async fn daily_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        if let Some(list) = self.cache.get_playlist_list("daily").await {
            return Ok(list);
        }

        match self
            .store
            .get_json::<Vec<PlaylistSummary>>(NS_DAILY, "playlists", self.listing_ttl)
        {
            Ok(Some(entry)) if entry.fresh => {
                self.cache
                    .put_playlist_list("daily".to_string(), entry.value.clone())
                    .await;
                return Ok(entry.value);
            }
            Ok(_) => {}
            Err(e) => warn!("Catalog store read failed for daily playlists: {}", e),
        }

        let credential = self.session.require_cookie().await?;
        let list = self.api.daily_playlists(&credential).await?;

        self.cache
            .put_playlist_list("daily".to_string(), list.clone())
            .await;
        if let Err(e) = self.store.put_json(NS_DAILY, "playlists", &list) {
            warn!("Failed to persist daily playlists: {}", e);
        }

        Ok(list)
    }

    // ============ Recherche et streaming ============

    /// Recherche une chanson par mots-clés et retourne le meilleur résultat
    ///
    /// Chemin de secours du résolveur de noms de fichiers : heuristique par
    /// nature (matching de chaînes + classement du moteur de recherche).
    pub async fn search_song(&self, keywords: &str) -> Result<Option<Song>> {
        if let Some(songs) = self.cache.get_search(keywords).await {
            return Ok(songs.first().cloned());
        }

        let credential = self.session.require_cookie().await?;
        let songs = self.api.search_songs(keywords, 10, &credential).await?;

        for song in &songs {
            self.remember_song(song).await;
        }
        self.cache.put_search(keywords.to_string(), songs.clone()).await;

        Ok(songs.into_iter().next())
    }

    /// Récupère l'URL de streaming transitoire d'une chanson
    pub async fn stream_url(&self, song_id: &str, quality: AudioQuality) -> Result<StreamInfo> {
        let key = format!("{}:{}", song_id, quality.as_level());
        if let Some(info) = self.cache.get_stream_url(&key).await {
            return Ok(info);
        }

        let credential = self.session.require_cookie().await?;
        let info = self.api.song_url(song_id, quality, &credential).await?;
        self.cache.put_stream_url(key, info.clone()).await;

        Ok(info)
    }

    // ============ Mutation ============

    /// Ajoute une piste à une playlist puis invalide les caches affectés
    ///
    /// La mutation est un unique appel atomique côté catalogue ; il n'existe
    /// pas d'état partiel à rattraper en cas d'échec.
    pub async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let credential = self.session.require_cookie().await?;
        self.api
            .playlist_add_track(playlist_id, track_id, &credential)
            .await?;

        self.invalidate_playlist(playlist_id).await;
        self.invalidate_user_playlists().await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> (tempfile::TempDir, NcmClient) {
        let dir = tempfile::tempdir().unwrap();
        let client = NcmClient::new(
            NcmApi::new("http://127.0.0.1:3000").unwrap(),
            Arc::new(CredentialStore::load(dir.path().join("cookie.txt"))),
            Arc::new(CatalogStore::open_in_memory().unwrap()),
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        (dir, client)
    }

    #[tokio::test]
    async fn test_get_songs_requires_credential() {
        let (_dir, client) = test_client();
        // Pas de cookie chargé : l'appel doit échouer en Unauthorized sans
        // toucher le réseau.
        let err = client
            .get_songs(&["1".to_string()])
            .await
            .expect_err("should require a credential");
        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn test_user_playlists_require_user_id() {
        let (_dir, client) = test_client();
        let err = client
            .user_playlists()
            .await
            .expect_err("should require a user id");
        assert!(err.is_auth_error());
    }
}
