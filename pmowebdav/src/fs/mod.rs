//! Namespace virtuel : classification des chemins et entrées de répertoire
//!
//! Les chemins sont les seuls identifiants visibles des clients WebDAV. Le
//! namespace compte cinq classes syntaxiques : racine, racine des chansons
//! du jour, racines de playlists (avec leurs sous-répertoires), et fichiers
//! feuilles (pistes ou couvertures synthétisées).

pub mod listing;
pub mod naming;
pub mod resolver;

use chrono::{DateTime, TimeZone, Utc};
use naming::{DAILY_PLAYLISTS, DAILY_SONGS, USER_PLAYLISTS};
use percent_encoding::percent_decode_str;

/// Racine de playlists (quotidiennes ou utilisateur)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistRoot {
    /// Playlists recommandées du jour
    Daily,
    /// Playlists de l'utilisateur
    User,
}

impl PlaylistRoot {
    /// Nom du répertoire racine associé
    pub fn dir_name(&self) -> &'static str {
        match self {
            PlaylistRoot::Daily => DAILY_PLAYLISTS,
            PlaylistRoot::User => USER_PLAYLISTS,
        }
    }
}

/// Classe syntaxique d'un chemin virtuel décodé
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    /// `/`
    Root,
    /// `/Daily Songs`
    DailySongs,
    /// `/Daily Playlists`
    DailyPlaylists,
    /// `/My Playlists`
    UserPlaylists,
    /// `/<racine de playlists>/<nom>`
    PlaylistDir { root: PlaylistRoot, name: String },
    /// `cover.jpg` / `folder.jpg` dans un répertoire listable
    Cover { dir: String },
    /// Fichier feuille (piste) dans un répertoire listable
    Track { dir: String, file: String },
}

/// Décode un chemin de requête (percent-encoding) en chemin virtuel
///
/// Retourne None si le chemin n'est pas de l'UTF-8 valide une fois décodé.
pub fn decode_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let trimmed = decoded.trim_end_matches('/');
    if trimmed.is_empty() {
        Some("/".to_string())
    } else {
        Some(trimmed.to_string())
    }
}

/// Classifie un chemin virtuel décodé
///
/// Retourne None pour tout chemin hors du namespace (inconnu ou trop
/// profond) ; l'appelant traduit en Not Found.
pub fn classify(path: &str) -> Option<PathKind> {
    if path == "/" {
        return Some(PathKind::Root);
    }

    let segments: Vec<&str> = path.strip_prefix('/')?.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    match segments.as_slice() {
        [root] if *root == DAILY_SONGS => Some(PathKind::DailySongs),
        [root] if *root == DAILY_PLAYLISTS => Some(PathKind::DailyPlaylists),
        [root] if *root == USER_PLAYLISTS => Some(PathKind::UserPlaylists),
        [root, file] if *root == DAILY_SONGS => {
            let dir = format!("/{DAILY_SONGS}");
            if naming::is_cover_name(file) {
                Some(PathKind::Cover { dir })
            } else {
                Some(PathKind::Track {
                    dir,
                    file: file.to_string(),
                })
            }
        }
        [root, name] if *root == DAILY_PLAYLISTS => Some(PathKind::PlaylistDir {
            root: PlaylistRoot::Daily,
            name: name.to_string(),
        }),
        [root, name] if *root == USER_PLAYLISTS => Some(PathKind::PlaylistDir {
            root: PlaylistRoot::User,
            name: name.to_string(),
        }),
        [root, name, file] if *root == DAILY_PLAYLISTS || *root == USER_PLAYLISTS => {
            let dir = format!("/{root}/{name}");
            if naming::is_cover_name(file) {
                Some(PathKind::Cover { dir })
            } else {
                Some(PathKind::Track {
                    dir,
                    file: file.to_string(),
                })
            }
        }
        _ => None,
    }
}

/// Entrée d'un listing de répertoire
#[derive(Debug, Clone)]
pub struct DavEntry {
    /// Nom affiché
    pub name: String,
    /// Href encodé ; les collections portent un `/` final
    pub href: String,
    /// Vrai pour une collection
    pub collection: bool,
    /// Taille en octets si connue (omise du rendu sinon)
    pub size: Option<u64>,
    /// Date de dernière modification
    pub mtime: DateTime<Utc>,
    /// Type de contenu (fichiers uniquement)
    pub content_type: Option<String>,
}

impl DavEntry {
    /// Construit une entrée de collection
    pub fn collection(name: impl Into<String>, path: &str, mtime: DateTime<Utc>) -> Self {
        let href = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", naming::encode_href(path))
        };
        Self {
            name: name.into(),
            href,
            collection: true,
            size: None,
            mtime,
            content_type: None,
        }
    }

    /// Construit une entrée de fichier
    pub fn file(
        name: impl Into<String>,
        path: &str,
        mtime: DateTime<Utc>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            href: naming::encode_href(path),
            collection: false,
            size: None,
            mtime,
            content_type: Some(content_type.into()),
        }
    }
}

/// Date de modification d'un fichier de piste
///
/// Précédence : date d'ajout à la playlist, puis date de publication de la
/// chanson, puis mtime du répertoire parent.
pub fn file_mtime(
    added_at: Option<i64>,
    publish_time: Option<i64>,
    parent: DateTime<Utc>,
) -> DateTime<Utc> {
    added_at
        .or(publish_time)
        .and_then(millis_to_datetime)
        .unwrap_or(parent)
}

/// Date de modification d'un répertoire de playlist
///
/// La date amont est utilisée quand elle existe ; sinon le fallback
/// déterministe fourni (jour de démarrage du process à minuit), jamais
/// "maintenant".
pub fn dir_mtime(update_time: Option<i64>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    update_time.and_then(millis_to_datetime).unwrap_or(fallback)
}

/// Convertit des millisecondes epoch en DateTime, si représentables
fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/").as_deref(), Some("/"));
        assert_eq!(
            decode_path("/My%20Playlists/").as_deref(),
            Some("/My Playlists")
        );
        assert_eq!(
            decode_path("/Daily%20Songs/A%20-%20B.mp3").as_deref(),
            Some("/Daily Songs/A - B.mp3")
        );
    }

    #[test]
    fn test_classify_roots() {
        assert_eq!(classify("/"), Some(PathKind::Root));
        assert_eq!(classify("/Daily Songs"), Some(PathKind::DailySongs));
        assert_eq!(classify("/Daily Playlists"), Some(PathKind::DailyPlaylists));
        assert_eq!(classify("/My Playlists"), Some(PathKind::UserPlaylists));
        assert_eq!(classify("/Unknown"), None);
    }

    #[test]
    fn test_classify_playlist_dirs() {
        assert_eq!(
            classify("/My Playlists/Road Trip"),
            Some(PathKind::PlaylistDir {
                root: PlaylistRoot::User,
                name: "Road Trip".to_string()
            })
        );
        assert_eq!(
            classify("/Daily Playlists/Morning Mix"),
            Some(PathKind::PlaylistDir {
                root: PlaylistRoot::Daily,
                name: "Morning Mix".to_string()
            })
        );
    }

    #[test]
    fn test_classify_leaves() {
        assert_eq!(
            classify("/Daily Songs/Title - Artist.mp3"),
            Some(PathKind::Track {
                dir: "/Daily Songs".to_string(),
                file: "Title - Artist.mp3".to_string()
            })
        );
        assert_eq!(
            classify("/My Playlists/Mix/Title - Artist.flac"),
            Some(PathKind::Track {
                dir: "/My Playlists/Mix".to_string(),
                file: "Title - Artist.flac".to_string()
            })
        );
        assert_eq!(
            classify("/Daily Songs/cover.jpg"),
            Some(PathKind::Cover {
                dir: "/Daily Songs".to_string()
            })
        );
        assert_eq!(
            classify("/My Playlists/Mix/folder.jpg"),
            Some(PathKind::Cover {
                dir: "/My Playlists/Mix".to_string()
            })
        );
    }

    #[test]
    fn test_classify_rejects_deep_or_foreign_paths() {
        assert_eq!(classify("/My Playlists/Mix/sub/file.mp3"), None);
        assert_eq!(classify("/Daily Songs/sub/file.mp3"), None);
        assert_eq!(classify("/etc/passwd"), None);
    }

    #[test]
    fn test_file_mtime_precedence() {
        let parent = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let added = 1_700_000_000_000;
        let published = 1_600_000_000_000;

        assert_eq!(
            file_mtime(Some(added), Some(published), parent),
            Utc.timestamp_millis_opt(added).unwrap()
        );
        assert_eq!(
            file_mtime(None, Some(published), parent),
            Utc.timestamp_millis_opt(published).unwrap()
        );
        assert_eq!(file_mtime(None, None, parent), parent);
    }

    #[test]
    fn test_dir_mtime_fallback_is_deterministic() {
        let fallback = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(dir_mtime(None, fallback), fallback);
        assert_eq!(
            dir_mtime(Some(1_700_000_000_000), fallback),
            Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
        );
    }
}
