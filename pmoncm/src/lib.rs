//! # pmoncm - Client catalogue cloud music
//!
//! Ce crate fournit un client complet pour le catalogue cloud music consommé
//! par PMODav, via un pont API HTTP (serveur NeteaseCloudMusicApi) :
//!
//! - Authentification par login QR et cookie de session persisté
//! - Recommandations quotidiennes (chansons et playlists)
//! - Playlists utilisateur et instantanés de contenu
//! - Recherche et URLs de streaming par niveau de qualité
//! - Cache mémoire (TTL) + instantané durable sqlite
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use pmoncm::{CatalogStore, CredentialStore, NcmApi, NcmClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Arc::new(CredentialStore::load("cookie.txt".into()));
//!     let store = Arc::new(CatalogStore::open_in_memory()?);
//!     let api = NcmApi::new("http://127.0.0.1:3000")?;
//!     let client = NcmClient::new(
//!         api,
//!         session,
//!         store,
//!         Duration::from_secs(86400),
//!         Duration::from_secs(3600),
//!     );
//!
//!     let account = client.validate_credential().await?;
//!     println!("Logged in as {:?}", account.nickname);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod models;
pub mod session;
pub mod store;

pub use api::NcmApi;
pub use cache::CatalogCache;
pub use client::NcmClient;
pub use error::{NcmError, Result};
pub use models::{
    AccountInfo, Album, Artist, AudioQuality, PlaylistSnapshot, PlaylistSummary, QrCheck, Song,
    StreamInfo,
};
pub use session::CredentialStore;
pub use store::{CatalogStore, StoreEntry};
