//! Synthèse déterministe des noms du namespace virtuel
//!
//! Les noms de fichiers sont dérivés des titres et artistes du catalogue ;
//! la même entrée produit toujours le même nom.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use pmoncm::{AudioQuality, Song};

/// Racine des recommandations quotidiennes de chansons
pub const DAILY_SONGS: &str = "Daily Songs";

/// Racine des playlists recommandées du jour
pub const DAILY_PLAYLISTS: &str = "Daily Playlists";

/// Racine des playlists de l'utilisateur (cible du favoritage COPY/MOVE)
pub const USER_PLAYLISTS: &str = "My Playlists";

/// Noms de fichiers de couverture synthétisés dans chaque répertoire
pub const COVER_NAMES: [&str; 2] = ["cover.jpg", "folder.jpg"];

/// Caractères illégaux dans les noms de fichiers des systèmes courants
const ILLEGAL_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Jeu de caractères à encoder dans un segment de href
///
/// CONTROLS couvre les caractères de contrôle ; on ajoute ce qui casse un
/// URI dans un segment de chemin.
const HREF_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'%');

/// Remplace les caractères illégaux par `_` et supprime les blancs de bord
///
/// Le jeu remplacé est exactement l'ensemble des caractères interdits par
/// les systèmes de fichiers courants ; la fonction doit rester exhaustive
/// sur cet ensemble pour ne jamais produire un nom inouvrable.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Synthétise le nom de fichier d'une chanson
///
/// Format : `<titre> - <artistes>.<ext>` où l'extension reflète le niveau
/// de qualité configuré, pas le conteneur réel.
pub fn track_file_name(song: &Song, quality: AudioQuality) -> String {
    format!(
        "{} - {}.{}",
        sanitize(&song.name),
        sanitize(&song.artist_names()),
        quality.extension()
    )
}

/// Extrait les mots-clés de recherche d'un nom de fichier de piste
///
/// Inverse approximatif de [`track_file_name`] : `"Titre - Artiste.mp3"`
/// devient `"Titre Artiste"`. Le découpage se fait sur le dernier `" - "`,
/// un titre pouvant lui-même en contenir. Retourne None si le nom ne suit
/// pas le motif.
pub fn search_keywords(file_name: &str) -> Option<String> {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _ext)| stem)
        .unwrap_or(file_name);

    let (title, artist) = stem.rsplit_once(" - ")?;
    if title.is_empty() || artist.is_empty() {
        return None;
    }

    Some(format!("{} {}", title, artist))
}

/// Vrai si le nom correspond à un fichier de couverture synthétisé
pub fn is_cover_name(file_name: &str) -> bool {
    COVER_NAMES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(file_name))
}

/// Encode un chemin décodé en href, segment par segment
///
/// Les répertoires reçoivent leur `/` final chez l'appelant.
pub fn encode_href(path: &str) -> String {
    if path == "/" {
        return "/".to_string();
    }

    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, HREF_SEGMENT).to_string())
        .collect();
    encoded.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmoncm::{Album, Artist};

    fn song(name: &str, artist: &str) -> Song {
        Song {
            id: "1".to_string(),
            name: name.to_string(),
            artists: vec![Artist {
                id: "2".to_string(),
                name: artist.to_string(),
            }],
            album: Album::default(),
            duration_ms: 0,
            publish_time: None,
        }
    }

    #[test]
    fn test_sanitize_is_exhaustive_over_illegal_chars() {
        let dirty = r#"a\b/c:d*e?f"g<h>i|j"#;
        let clean = sanitize(dirty);
        for c in ILLEGAL_CHARS {
            assert!(!clean.contains(c), "illegal char {c:?} survived");
        }
        assert_eq!(clean, "a_b_c_d_e_f_g_h_i_j");
    }

    #[test]
    fn test_sanitize_trims_whitespace() {
        assert_eq!(sanitize("  spaced out  "), "spaced out");
        assert_eq!(sanitize(" /lead "), "_lead");
    }

    #[test]
    fn test_track_file_name_follows_quality() {
        let s = song("Title", "Artist");
        assert_eq!(
            track_file_name(&s, AudioQuality::ExHigh),
            "Title - Artist.mp3"
        );
        assert_eq!(
            track_file_name(&s, AudioQuality::Lossless),
            "Title - Artist.flac"
        );
    }

    #[test]
    fn test_track_file_name_sanitizes_both_parts() {
        let s = song("What?", "AC/DC");
        assert_eq!(
            track_file_name(&s, AudioQuality::Standard),
            "What_ - AC_DC.mp3"
        );
    }

    #[test]
    fn test_search_keywords_pinned_pair() {
        // Paire de référence du chemin de secours
        assert_eq!(
            search_keywords("Song Title - Artist Name.mp3").as_deref(),
            Some("Song Title Artist Name")
        );
    }

    #[test]
    fn test_search_keywords_splits_on_last_separator() {
        assert_eq!(
            search_keywords("Dash - In - Title - Artist.flac").as_deref(),
            Some("Dash - In - Title Artist")
        );
    }

    #[test]
    fn test_search_keywords_rejects_unpatterned_names() {
        assert!(search_keywords("README.txt").is_none());
        assert!(search_keywords("no extension").is_none());
    }

    #[test]
    fn test_cover_names() {
        assert!(is_cover_name("cover.jpg"));
        assert!(is_cover_name("Folder.JPG"));
        assert!(!is_cover_name("cover.png"));
    }

    #[test]
    fn test_encode_href_keeps_slashes_and_encodes_spaces() {
        assert_eq!(
            encode_href("/My Playlists/Road Trip"),
            "/My%20Playlists/Road%20Trip"
        );
        assert_eq!(encode_href("/"), "/");
    }
}
