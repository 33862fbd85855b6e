//! Rendu du corps multistatus (namespace `DAV:`)
//!
//! Structures serde sérialisées par quick-xml. Les collections portent un
//! élément `collection` vide dans `resourcetype` et un `/` final sur leur
//! href ; les fichiers exposent type et taille quand elle est connue.

use crate::error::Result;
use crate::fs::DavEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// En-tête de document XML
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Racine d'un corps multistatus
#[derive(Debug, Serialize)]
#[serde(rename = "D:multistatus")]
pub struct Multistatus {
    #[serde(rename = "@xmlns:D")]
    xmlns: &'static str,

    #[serde(rename = "D:response")]
    responses: Vec<DavResponse>,
}

/// Une réponse par ressource (le répertoire lui-même, puis chaque enfant)
#[derive(Debug, Serialize)]
pub struct DavResponse {
    #[serde(rename = "D:href")]
    href: String,

    #[serde(rename = "D:propstat")]
    propstat: Propstat,
}

#[derive(Debug, Serialize)]
struct Propstat {
    #[serde(rename = "D:prop")]
    prop: Prop,

    #[serde(rename = "D:status")]
    status: String,
}

#[derive(Debug, Serialize)]
struct Prop {
    #[serde(rename = "D:displayname")]
    displayname: String,

    #[serde(rename = "D:resourcetype")]
    resourcetype: ResourceType,

    #[serde(rename = "D:getcontentlength", skip_serializing_if = "Option::is_none")]
    getcontentlength: Option<u64>,

    #[serde(rename = "D:getcontenttype", skip_serializing_if = "Option::is_none")]
    getcontenttype: Option<String>,

    #[serde(rename = "D:getlastmodified")]
    getlastmodified: String,
}

#[derive(Debug, Serialize)]
struct ResourceType {
    #[serde(rename = "D:collection", skip_serializing_if = "Option::is_none")]
    collection: Option<Collection>,
}

#[derive(Debug, Serialize)]
struct Collection;

impl From<&DavEntry> for DavResponse {
    fn from(entry: &DavEntry) -> Self {
        DavResponse {
            href: entry.href.clone(),
            propstat: Propstat {
                prop: Prop {
                    displayname: entry.name.clone(),
                    resourcetype: ResourceType {
                        collection: entry.collection.then_some(Collection),
                    },
                    getcontentlength: if entry.collection { None } else { entry.size },
                    getcontenttype: if entry.collection {
                        None
                    } else {
                        entry.content_type.clone()
                    },
                    getlastmodified: http_date(entry.mtime),
                },
                status: "HTTP/1.1 200 OK".to_string(),
            },
        }
    }
}

/// Formate une date au format RFC 1123 attendu par `getlastmodified`
pub fn http_date(datetime: DateTime<Utc>) -> String {
    datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Rend un corps multistatus : le répertoire lui-même puis ses enfants
pub fn render_multistatus(dir: &DavEntry, children: &[DavEntry]) -> Result<String> {
    let responses = std::iter::once(dir)
        .chain(children.iter())
        .map(DavResponse::from)
        .collect();
    render(responses)
}

/// Rend un corps multistatus pour une ressource feuille isolée
pub fn render_single(entry: &DavEntry) -> Result<String> {
    render(vec![DavResponse::from(entry)])
}

fn render(responses: Vec<DavResponse>) -> Result<String> {
    let multistatus = Multistatus {
        xmlns: "DAV:",
        responses,
    };

    let body = quick_xml::se::to_string(&multistatus)?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mtime() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_http_date_is_rfc1123() {
        assert_eq!(http_date(mtime()), "Fri, 01 Mar 2024 12:30:45 GMT");
    }

    #[test]
    fn test_root_listing_has_one_response_per_entry() {
        let root = DavEntry::collection("/", "/", mtime());
        let children = vec![
            DavEntry::collection("Daily Songs", "/Daily Songs", mtime()),
            DavEntry::collection("Daily Playlists", "/Daily Playlists", mtime()),
            DavEntry::collection("My Playlists", "/My Playlists", mtime()),
        ];

        let xml = render_multistatus(&root, &children).unwrap();

        assert!(xml.starts_with(XML_DECLARATION));
        assert_eq!(xml.matches("<D:response>").count(), 4);
        assert!(xml.contains(r#"<D:multistatus xmlns:D="DAV:">"#));
        assert!(xml.contains("<D:collection/>"));
        // Les hrefs de collections portent le slash final, encodé
        assert!(xml.contains("<D:href>/Daily%20Songs/</D:href>"));
    }

    #[test]
    fn test_file_entry_carries_type_and_optional_length() {
        let mut entry = DavEntry::file(
            "Title - Artist.mp3",
            "/Daily Songs/Title - Artist.mp3",
            mtime(),
            "audio/mpeg",
        );

        let xml = render_single(&entry).unwrap();
        assert!(xml.contains("<D:getcontenttype>audio/mpeg</D:getcontenttype>"));
        // Taille inconnue : getcontentlength est omis, pas mis à zéro
        assert!(!xml.contains("getcontentlength"));
        assert!(!xml.contains("<D:collection/>"));

        entry.size = Some(4_200_000);
        let xml = render_single(&entry).unwrap();
        assert!(xml.contains("<D:getcontentlength>4200000</D:getcontentlength>"));
    }

    #[test]
    fn test_xml_escaping_of_display_names() {
        let entry = DavEntry::collection("Rock & Roll <3", "/My Playlists/Rock & Roll <3", mtime());
        let xml = render_single(&entry).unwrap();
        assert!(xml.contains("Rock &amp; Roll &lt;3"));
        assert!(!xml.contains("<D:displayname>Rock & Roll <3"));
    }

    #[test]
    fn test_collections_omit_content_headers() {
        let entry = DavEntry::collection("Daily Songs", "/Daily Songs", mtime());
        let xml = render_single(&entry).unwrap();
        assert!(!xml.contains("getcontenttype"));
        assert!(!xml.contains("getcontentlength"));
        assert!(xml.contains("<D:getlastmodified>Fri, 01 Mar 2024 12:30:45 GMT</D:getlastmodified>"));
    }
}
