//! Dispatcher des verbes WebDAV
//!
//! Machine à états par requête, pas par connexion : tout l'état partagé vit
//! dans [`DavState`]. Les verbes PROPFIND/COPY/MOVE n'existant pas dans les
//! helpers de routage d'axum, le dispatcher est installé comme service de
//! fallback et aiguille sur le nom de méthode.

use crate::dav::{favorites, xml};
use crate::error::{DavError, Result};
use crate::fs::{self, resolver, DavEntry, PathKind};
use crate::state::{DavState, StreamMode};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use pmoncm::NcmError;
use tracing::{debug, info};

/// Verbes annoncés par OPTIONS
const ALLOWED_METHODS: &str = "OPTIONS, PROPFIND, GET, HEAD, COPY, MOVE";

/// Construit le routeur WebDAV complet
pub fn router(state: DavState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

/// Point d'entrée unique : aiguillage par verbe
async fn dispatch(State(state): State<DavState>, req: Request<Body>) -> Result<Response> {
    let method = req.method().as_str().to_string();
    let path = fs::decode_path(req.uri().path())
        .ok_or_else(|| DavError::BadRequest("undecodable request path".to_string()))?;

    debug!("{} {}", method, path);

    // OPTIONS répond sans credential : un client peut sonder les capacités
    // avant la fin du login.
    if method == "OPTIONS" {
        return options_response();
    }

    if !state.client.session().is_authenticated().await {
        return Err(DavError::Unauthorized);
    }

    match method.as_str() {
        "PROPFIND" => propfind(&state, &path).await,
        "GET" => get_or_head(&state, &path, req.headers(), false).await,
        "HEAD" => get_or_head(&state, &path, req.headers(), true).await,
        "COPY" | "MOVE" => favorites::handle_copy(&state, &path, req.headers()).await,
        other => {
            info!("Rejecting unsupported verb {} on {}", other, path);
            Ok((
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, ALLOWED_METHODS)],
            )
                .into_response())
        }
    }
}

/// Réponse OPTIONS : jeu de verbes supporté + classe DAV
fn options_response() -> Result<Response> {
    Ok((
        StatusCode::OK,
        [
            (header::ALLOW, ALLOWED_METHODS),
            (HeaderName::from_static("dav"), "1"),
        ],
    )
        .into_response())
}

/// PROPFIND : listing de collection ou propriétés d'une feuille
///
/// La profondeur est traitée comme un niveau quel que soit le header Depth.
async fn propfind(state: &DavState, path: &str) -> Result<Response> {
    let kind = fs::classify(path).ok_or_else(|| DavError::NotFound(path.to_string()))?;

    match kind {
        PathKind::Track { ref file, .. } => {
            let song_id = resolver::resolve_track(state, path, file).await?;
            let songs = state.client.get_songs(&[song_id.clone()]).await?;
            let song = songs
                .get(&song_id)
                .ok_or_else(|| DavError::NotFound(path.to_string()))?;

            let mtime = fs::file_mtime(None, song.publish_time, state.start_of_day);
            let entry = DavEntry::file(file.clone(), path, mtime, state.quality.mime_type());
            multistatus_response(xml::render_single(&entry)?)
        }

        PathKind::Cover { .. } => {
            let name = path.rsplit('/').next().unwrap_or("cover.jpg");
            let entry = DavEntry::file(name, path, state.start_of_day, "image/jpeg");
            multistatus_response(xml::render_single(&entry)?)
        }

        dir_kind => {
            let payload = state
                .listings
                .get_or_render(path, || async {
                    let (dir_entry, children) =
                        resolver::list_directory(state, path, &dir_kind).await?;
                    xml::render_multistatus(&dir_entry, &children)
                })
                .await?;
            multistatus_response(payload)
        }
    }
}

/// GET/HEAD sur une feuille : résolution puis streaming ou redirection
async fn get_or_head(
    state: &DavState,
    path: &str,
    headers: &HeaderMap,
    head_only: bool,
) -> Result<Response> {
    let kind = fs::classify(path).ok_or_else(|| DavError::NotFound(path.to_string()))?;

    match kind {
        PathKind::Cover { ref dir } => {
            let song_id = state
                .vfs
                .any_song_in_dir(dir)
                .await
                .ok_or_else(|| DavError::NotFound(format!("no known track under {dir}")))?;

            let songs = state.client.get_songs(&[song_id.clone()]).await?;
            let cover_url = songs
                .get(&song_id)
                .and_then(|song| song.cover_url())
                .ok_or_else(|| DavError::NotFound(format!("no cover for {dir}")))?
                .to_string();

            if head_only {
                Ok((
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "image/jpeg")],
                )
                    .into_response())
            } else {
                redirect_response(&cover_url)
            }
        }

        PathKind::Track { ref file, .. } => {
            let song_id = resolver::resolve_track(state, path, file).await?;

            if head_only {
                return Ok((
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, state.quality.mime_type()),
                        (header::ACCEPT_RANGES, "bytes"),
                    ],
                )
                    .into_response());
            }

            let info = state.client.stream_url(&song_id, state.quality).await?;
            match state.stream_mode {
                StreamMode::Redirect => redirect_response(&info.url),
                StreamMode::Proxy => proxy_stream(state, &info.url, headers).await,
            }
        }

        _ => Err(DavError::NotFound(path.to_string())),
    }
}

/// Réponse 207 avec corps multistatus
fn multistatus_response(payload: String) -> Result<Response> {
    Ok((
        StatusCode::MULTI_STATUS,
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        payload,
    )
        .into_response())
}

/// Redirection 302 vers une URL transitoire amont
fn redirect_response(url: &str) -> Result<Response> {
    let location = HeaderValue::from_str(url)
        .map_err(|_| DavError::BadRequest(format!("unusable redirect target '{url}'")))?;

    let mut response = StatusCode::FOUND.into_response();
    response.headers_mut().insert(header::LOCATION, location);
    Ok(response)
}

/// Mode proxy : passthrough des octets amont vers le client
///
/// Pipe d'E/S pur : le header Range est transmis tel quel à l'amont et les
/// headers de contenu sont relayés. Aucune réécriture de tags.
async fn proxy_stream(state: &DavState, url: &str, headers: &HeaderMap) -> Result<Response> {
    let mut request = state.client.http_client().get(url);
    if let Some(range) = headers.get(header::RANGE) {
        request = request.header(header::RANGE, range.clone());
    }

    let upstream = request.send().await.map_err(NcmError::from)?;
    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut response_headers = HeaderMap::new();
    for name in [
        header::CONTENT_TYPE,
        header::CONTENT_LENGTH,
        header::CONTENT_RANGE,
        header::ACCEPT_RANGES,
    ] {
        if let Some(value) = upstream.headers().get(&name) {
            response_headers.insert(name, value.clone());
        }
    }
    if !response_headers.contains_key(header::CONTENT_TYPE) {
        response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(state.quality.mime_type()),
        );
    }

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((status, response_headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_advertises_dav_and_verbs() {
        let response = options_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ALLOW).unwrap(),
            ALLOWED_METHODS
        );
        assert_eq!(response.headers().get("dav").unwrap(), "1");
    }

    #[test]
    fn test_redirect_response_is_302() {
        let response = redirect_response("https://cdn.example/track.mp3").unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://cdn.example/track.mp3"
        );
    }

    #[test]
    fn test_multistatus_response_content_type() {
        let response = multistatus_response("<xml/>".to_string()).unwrap();
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/xml; charset=utf-8"
        );
    }
}
