//! Persistance sqlite du catalogue
//!
//! Ce module gère l'instantané durable du cache : chaque entrée est un
//! payload JSON horodaté, rangé par namespace ("song", "playlist",
//! "pathmap", "listing", ...). Au redémarrage, les entrées encore fraîches
//! évitent un refetch complet d'un catalogue inchangé.

use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Entrée lue depuis le magasin, avec sa fraîcheur évaluée contre le TTL
/// fourni par l'appelant
#[derive(Debug, Clone)]
pub struct StoreEntry<T> {
    /// Valeur désérialisée
    pub value: T,
    /// Date de récupération côté catalogue
    pub fetched_at: DateTime<Utc>,
    /// Vrai si `now - fetched_at < ttl`
    pub fresh: bool,
}

/// Magasin sqlite du catalogue
#[derive(Debug)]
pub struct CatalogStore {
    conn: Mutex<Connection>,
}

impl CatalogStore {
    /// Ouvre (ou crée) le magasin à l'emplacement donné
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Ouvre un magasin en mémoire (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS catalog (
                ns TEXT NOT NULL,
                key TEXT NOT NULL,
                payload TEXT NOT NULL,
                fetched_at TEXT NOT NULL,
                PRIMARY KEY (ns, key)
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Ajoute ou remplace une entrée, horodatée à maintenant
    pub fn put_json<T: Serialize>(&self, ns: &str, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        let fetched_at = Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO catalog (ns, key, payload, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![ns, key, payload, fetched_at],
        )?;

        debug!("Stored {}:{}", ns, key);
        Ok(())
    }

    /// Lit une entrée et évalue sa fraîcheur contre le TTL fourni
    ///
    /// Une entrée expirée est retournée avec `fresh == false` : la staleness
    /// est indicative, l'appelant décide de refetch ou de servir quand même.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        ns: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<StoreEntry<T>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT payload, fetched_at FROM catalog WHERE ns = ?1 AND key = ?2")?;

        let row = stmt
            .query_row(params![ns, key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some((payload, fetched_at)) = row else {
            return Ok(None);
        };

        let value: T = serde_json::from_str(&payload)?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| DateTime::<Utc>::MIN_UTC);

        let age = Utc::now().signed_duration_since(fetched_at);
        let fresh = age
            .to_std()
            .map(|age| age < ttl)
            .unwrap_or(false);

        Ok(Some(StoreEntry {
            value,
            fetched_at,
            fresh,
        }))
    }

    /// Supprime une entrée
    pub fn delete(&self, ns: &str, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM catalog WHERE ns = ?1 AND key = ?2",
            params![ns, key],
        )?;
        Ok(())
    }

    /// Supprime toutes les entrées d'un namespace dont la clé commence par
    /// un préfixe (invalidation de répertoire du path map)
    pub fn delete_prefix(&self, ns: &str, prefix: &str) -> Result<usize> {
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "DELETE FROM catalog WHERE ns = ?1 AND key LIKE ?2 ESCAPE '\\'",
            params![ns, pattern],
        )?;
        Ok(count)
    }

    /// Charge toutes les entrées d'un namespace (préchargement du path map)
    pub fn load_namespace<T: DeserializeOwned>(&self, ns: &str) -> Result<Vec<(String, T)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key, payload FROM catalog WHERE ns = ?1")?;

        let rows = stmt.query_map(params![ns], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (key, payload) = row?;
            match serde_json::from_str(&payload) {
                Ok(value) => entries.push((key, value)),
                Err(e) => debug!("Skipping undecodable entry {}:{}: {}", ns, key, e),
            }
        }

        Ok(entries)
    }
}
