use pmoncm::{AudioQuality, CatalogStore, CredentialStore, NcmApi, NcmClient};
use pmowebdav::dav::xml;
use pmowebdav::fs::resolver;
use pmowebdav::{DavState, PathKind, StreamMode};
use std::sync::Arc;
use std::time::Duration;

fn offline_state(dir: &tempfile::TempDir) -> DavState {
    // Aucun serveur n'écoute sur ce port : le test vérifie précisément
    // que le listing racine n'a besoin d'aucun appel amont.
    let api = NcmApi::new("http://127.0.0.1:1").unwrap();
    let session = Arc::new(CredentialStore::load(dir.path().join("cookie.txt")));
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());
    let client = Arc::new(NcmClient::new(
        api,
        session,
        store,
        Duration::from_secs(60),
        Duration::from_secs(60),
    ));

    DavState::new(
        client,
        AudioQuality::ExHigh,
        StreamMode::Redirect,
        Duration::from_secs(60),
    )
}

#[tokio::test]
async fn root_listing_needs_no_upstream_and_has_four_entries() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_state(&dir);

    let (root, children) = resolver::list_directory(&state, "/", &PathKind::Root)
        .await
        .unwrap();

    // Le répertoire lui-même plus les trois racines fixes
    assert_eq!(children.len(), 3);
    let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Daily Songs", "Daily Playlists", "My Playlists"]);
    assert!(children.iter().all(|c| c.collection));

    let xml = xml::render_multistatus(&root, &children).unwrap();
    assert_eq!(xml.matches("<D:response>").count(), 4);
    assert!(xml.contains("<D:href>/</D:href>"));
    assert!(xml.contains("<D:href>/My%20Playlists/</D:href>"));
}

#[tokio::test]
async fn root_mtimes_are_deterministic_within_the_day() {
    let dir = tempfile::tempdir().unwrap();
    let state = offline_state(&dir);

    let (_, first) = resolver::list_directory(&state, "/", &PathKind::Root)
        .await
        .unwrap();
    let (_, second) = resolver::list_directory(&state, "/", &PathKind::Root)
        .await
        .unwrap();

    // Jamais "maintenant" : le fallback est minuit du jour de démarrage
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.mtime, b.mtime);
        assert_eq!(a.mtime, state.start_of_day);
    }
}
