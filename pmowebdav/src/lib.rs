//! # pmowebdav - Vue WebDAV du catalogue cloud music
//!
//! Ce crate expose le catalogue (recommandations quotidiennes, playlists
//! recommandées, playlists utilisateur) comme un système de fichiers
//! virtuel navigable par n'importe quel client WebDAV :
//!
//! - Namespace de chemins stable dérivé des titres/artistes, avec path map
//!   persistant chemin → chanson
//! - Listings PROPFIND mémoïsés (fraîcheur bornée par TTL)
//! - GET/HEAD vers l'URL de streaming (redirection ou proxy d'octets)
//! - COPY/MOVE vers la racine des playlists utilisateur interprété comme
//!   favoritage idempotent
//!
//! ## Exemple
//!
//! ```rust,no_run
//! use pmoncm::NcmClient;
//! use pmowebdav::{router, DavState};
//! use std::sync::Arc;
//!
//! # async fn serve(client: Arc<NcmClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let state = DavState::from_config(client);
//! let app = router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod dav;
pub mod error;
pub mod fs;
pub mod state;

pub use dav::handlers::router;
pub use error::{DavError, Result};
pub use fs::{classify, decode_path, DavEntry, PathKind, PlaylistRoot};
pub use state::{DavState, StreamMode};
