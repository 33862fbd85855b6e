//! Cache des listings de répertoires rendus
//!
//! Mémoïse le corps multistatus sérialisé par chemin, pour éviter de
//! redériver et resérialiser l'arbre à chaque polling client. Deux étages :
//! moka en mémoire, puis le magasin sqlite (même TTL). Dans la fenêtre de
//! fraîcheur, un second PROPFIND retourne un payload identique octet pour
//! octet. Un échec de rendu se propage, jamais de fallback sur une entrée
//! périmée.

use crate::error::Result;
use moka::future::Cache as MokaCache;
use pmoncm::CatalogStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Namespace sqlite des listings rendus
const NS_LISTING: &str = "listing";

/// Cache des listings rendus, borné par TTL
#[derive(Clone)]
pub struct ListingCache {
    memory: MokaCache<String, String>,
    store: Arc<CatalogStore>,
    ttl: Duration,
}

impl ListingCache {
    /// Crée le cache avec le TTL de listing configuré
    pub fn new(store: Arc<CatalogStore>, ttl: Duration) -> Self {
        Self {
            memory: MokaCache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
            store,
            ttl,
        }
    }

    /// Retourne le listing mémoïsé, ou invoque le rendu et mémoïse le
    /// résultat
    pub async fn get_or_render<F, Fut>(&self, path: &str, render: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(payload) = self.get(path).await {
            debug!("Listing cache hit for {}", path);
            return Ok(payload);
        }

        let payload = render().await?;
        self.put(path, &payload).await;
        Ok(payload)
    }

    /// Lecture seule : moka, puis entrée sqlite encore fraîche
    pub async fn get(&self, path: &str) -> Option<String> {
        if let Some(payload) = self.memory.get(path).await {
            return Some(payload);
        }

        match self.store.get_json::<String>(NS_LISTING, path, self.ttl) {
            Ok(Some(entry)) if entry.fresh => {
                self.memory
                    .insert(path.to_string(), entry.value.clone())
                    .await;
                Some(entry.value)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Listing store read failed for {}: {}", path, e);
                None
            }
        }
    }

    /// Mémoïse un listing fraîchement rendu (mémoire + disque)
    pub async fn put(&self, path: &str, payload: &str) {
        self.memory
            .insert(path.to_string(), payload.to_string())
            .await;
        if let Err(e) = self
            .store
            .put_json(NS_LISTING, path, &payload.to_string())
        {
            warn!("Failed to persist listing for {}: {}", path, e);
        }
    }

    /// Invalide le listing d'un chemin (mémoire + disque)
    pub async fn invalidate(&self, path: &str) {
        self.memory.invalidate(path).await;
        if let Err(e) = self.store.delete(NS_LISTING, path) {
            warn!("Failed to drop persisted listing for {}: {}", path, e);
        }
    }
}
