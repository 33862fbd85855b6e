//! Structures de données pour représenter les objets du catalogue cloud music

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Désérialiseur flexible pour les IDs qui peuvent être des strings ou des integers
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("ID must be a string or number")),
    }
}

/// Représente un artiste
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    /// Identifiant unique de l'artiste
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Nom de l'artiste
    #[serde(default)]
    pub name: String,
}

/// Représente un album (réduit au strict nécessaire pour la vue WebDAV)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Album {
    /// Identifiant unique de l'album
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    /// Nom de l'album
    #[serde(default)]
    pub name: String,
    /// URL de l'image de couverture
    #[serde(default)]
    pub pic_url: Option<String>,
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Représente une chanson du catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    /// Identifiant unique de la chanson
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Titre de la chanson
    pub name: String,
    /// Artistes de la chanson
    #[serde(default)]
    pub artists: Vec<Artist>,
    /// Album contenant la chanson
    #[serde(default)]
    pub album: Album,
    /// Durée en millisecondes
    #[serde(default)]
    pub duration_ms: u64,
    /// Date de publication (millisecondes epoch, peut être négative)
    #[serde(default)]
    pub publish_time: Option<i64>,
}

impl Song {
    /// Retourne les noms d'artistes joints par une virgule
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// URL de la couverture d'album si disponible
    pub fn cover_url(&self) -> Option<&str> {
        self.album.pic_url.as_deref()
    }
}

/// Résumé d'une playlist (liste utilisateur ou recommandation du jour)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    /// Identifiant unique de la playlist
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Nom affiché de la playlist
    pub name: String,
    /// Nombre de pistes
    #[serde(default)]
    pub track_count: u32,
    /// Date de dernière modification côté catalogue (millisecondes epoch)
    #[serde(default)]
    pub update_time: Option<i64>,
    /// Identifiant du propriétaire
    #[serde(default)]
    pub creator_id: Option<String>,
}

/// Instantané du contenu d'une playlist
///
/// `track_ids` fixe l'ordre d'affichage du répertoire ; `added_at` porte la
/// date d'ajout de chaque piste quand le catalogue la fournit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    /// Identifiant de la playlist source
    pub id: String,
    /// Nom affiché
    pub name: String,
    /// Identifiants des pistes, dans l'ordre du catalogue
    pub track_ids: Vec<String>,
    /// Date d'ajout par piste (millisecondes epoch)
    #[serde(default)]
    pub added_at: HashMap<String, i64>,
    /// Date de dernière modification côté catalogue (millisecondes epoch)
    #[serde(default)]
    pub update_time: Option<i64>,
}

/// Informations sur un fichier de streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Identifiant de la chanson
    pub id: String,
    /// URL transitoire de streaming
    pub url: String,
    /// Niveau de qualité effectivement servi
    #[serde(default)]
    pub level: Option<String>,
    /// Taille du fichier en octets si connue
    #[serde(default)]
    pub size: Option<u64>,
    /// Type de conteneur annoncé (ex: "mp3", "flac")
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Niveau de qualité demandé pour le streaming
///
/// Les niveaux sans perte partagent l'extension `flac` ; tous les autres
/// sont exposés en `mp3`. L'extension est un indice de qualité, jamais une
/// inspection du conteneur réel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioQuality {
    /// 128 kbps
    Standard,
    /// 192 kbps
    Higher,
    /// 320 kbps
    ExHigh,
    /// FLAC 16 bit / 44.1 kHz
    Lossless,
    /// FLAC 24 bit
    HiRes,
    /// Effet audio haute définition
    JyEffect,
    /// Audio immersif
    Sky,
    /// Master studio
    JyMaster,
}

impl AudioQuality {
    /// Identifiant du niveau pour l'API de streaming
    pub fn as_level(&self) -> &'static str {
        match self {
            AudioQuality::Standard => "standard",
            AudioQuality::Higher => "higher",
            AudioQuality::ExHigh => "exhigh",
            AudioQuality::Lossless => "lossless",
            AudioQuality::HiRes => "hires",
            AudioQuality::JyEffect => "jyeffect",
            AudioQuality::Sky => "sky",
            AudioQuality::JyMaster => "jymaster",
        }
    }

    /// Vrai pour les niveaux sans perte
    pub fn is_lossless(&self) -> bool {
        matches!(
            self,
            AudioQuality::Lossless
                | AudioQuality::HiRes
                | AudioQuality::JyEffect
                | AudioQuality::Sky
                | AudioQuality::JyMaster
        )
    }

    /// Extension de fichier associée au niveau de qualité
    pub fn extension(&self) -> &'static str {
        if self.is_lossless() { "flac" } else { "mp3" }
    }

    /// Type MIME associé
    pub fn mime_type(&self) -> &'static str {
        if self.is_lossless() {
            "audio/flac"
        } else {
            "audio/mpeg"
        }
    }
}

impl Default for AudioQuality {
    fn default() -> Self {
        AudioQuality::ExHigh
    }
}

impl FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(AudioQuality::Standard),
            "higher" => Ok(AudioQuality::Higher),
            "exhigh" => Ok(AudioQuality::ExHigh),
            "lossless" => Ok(AudioQuality::Lossless),
            "hires" => Ok(AudioQuality::HiRes),
            "jyeffect" => Ok(AudioQuality::JyEffect),
            "sky" => Ok(AudioQuality::Sky),
            "jymaster" => Ok(AudioQuality::JyMaster),
            other => Err(format!("unknown audio quality '{other}'")),
        }
    }
}

/// Clé de session QR émise par l'API de login
#[derive(Debug, Clone, Deserialize)]
pub struct QrKey {
    /// Clé unique à présenter dans le QR code
    pub unikey: String,
}

/// URL à encoder dans le QR code de login
#[derive(Debug, Clone, Deserialize)]
pub struct QrLogin {
    /// URL à scanner depuis l'application mobile
    #[serde(rename = "qrurl")]
    pub url: String,
}

/// État d'un polling de login QR
///
/// Codes retournés par l'API : 800 QR expiré, 801 en attente de scan,
/// 802 scanné (en attente de confirmation), 803 confirmé (cookie émis).
#[derive(Debug, Clone, Deserialize)]
pub struct QrCheck {
    /// Code d'état du polling
    pub code: i64,
    /// Cookie de session, présent uniquement quand code == 803
    #[serde(default)]
    pub cookie: Option<String>,
}

impl QrCheck {
    pub fn is_expired(&self) -> bool {
        self.code == 800
    }

    pub fn is_confirmed(&self) -> bool {
        self.code == 803
    }
}

/// Compte associé à la session courante
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    /// Identifiant utilisateur
    pub user_id: String,
    /// Pseudonyme affiché
    pub nickname: Option<String>,
}
