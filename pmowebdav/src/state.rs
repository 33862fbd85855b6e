//! État partagé du serveur WebDAV
//!
//! Construit une fois au démarrage et passé par référence au dispatcher :
//! pas d'état ambiant, les caches sont des objets explicites.

use crate::fs::listing::ListingCache;
use crate::fs::resolver::Vfs;
use chrono::{DateTime, Utc};
use pmoncm::{AudioQuality, NcmClient};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Mode de service des requêtes GET sur les pistes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Redirection 302 vers l'URL transitoire (défaut, faible latence)
    Redirect,
    /// Passthrough des octets via le serveur (clients sans suivi de
    /// redirection, au prix de la bande passante serveur)
    Proxy,
}

impl FromStr for StreamMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redirect" => Ok(StreamMode::Redirect),
            "proxy" => Ok(StreamMode::Proxy),
            other => Err(format!("unknown stream mode '{other}'")),
        }
    }
}

/// État partagé entre toutes les requêtes
#[derive(Clone)]
pub struct DavState {
    /// Client catalogue (caches inclus)
    pub client: Arc<NcmClient>,
    /// Path map persistant
    pub vfs: Arc<Vfs>,
    /// Cache des listings rendus
    pub listings: ListingCache,
    /// Niveau de qualité de streaming configuré
    pub quality: AudioQuality,
    /// Mode de service des GET
    pub stream_mode: StreamMode,
    /// Jour de démarrage du process à minuit UTC : fallback déterministe
    /// des mtime (jamais "maintenant", pour garder les listings
    /// idempotents dans la journée)
    pub start_of_day: DateTime<Utc>,
}

impl DavState {
    /// Construit l'état avec des paramètres explicites
    pub fn new(
        client: Arc<NcmClient>,
        quality: AudioQuality,
        stream_mode: StreamMode,
        listing_ttl: Duration,
    ) -> Self {
        let store = client.store();
        let start_of_day = Utc::now()
            .date_naive()
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();

        Self {
            vfs: Arc::new(Vfs::new(store.clone())),
            listings: ListingCache::new(store, listing_ttl),
            client,
            quality,
            stream_mode,
            start_of_day,
        }
    }

    /// Construit l'état depuis la configuration globale
    pub fn from_config(client: Arc<NcmClient>) -> Self {
        let config = pmodavconfig::get_config();

        let quality = config
            .get_stream_quality()
            .parse::<AudioQuality>()
            .unwrap_or_else(|e| {
                warn!("{}, falling back to default quality", e);
                AudioQuality::default()
            });

        let stream_mode = config
            .get_stream_mode()
            .parse::<StreamMode>()
            .unwrap_or_else(|e| {
                warn!("{}, falling back to redirect mode", e);
                StreamMode::Redirect
            });

        let listing_ttl = Duration::from_secs(config.get_listing_ttl_secs());

        Self::new(client, quality, stream_mode, listing_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_mode_parsing() {
        assert_eq!("redirect".parse::<StreamMode>(), Ok(StreamMode::Redirect));
        assert_eq!("Proxy".parse::<StreamMode>(), Ok(StreamMode::Proxy));
        assert!("tunnel".parse::<StreamMode>().is_err());
    }
}
