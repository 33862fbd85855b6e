use pmoncm::CatalogStore;
use pmowebdav::fs::resolver::Vfs;
use std::sync::Arc;

#[tokio::test]
async fn record_then_resolve_roundtrip() {
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());
    let vfs = Vfs::new(store);

    vfs.record("/Daily Songs/Title - Artist.mp3", "347230").await;

    assert_eq!(
        vfs.resolve("/Daily Songs/Title - Artist.mp3").await.as_deref(),
        Some("347230")
    );
    assert!(vfs.resolve("/Daily Songs/Other - Artist.mp3").await.is_none());
}

#[tokio::test]
async fn colliding_names_are_last_write_wins() {
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());
    let vfs = Vfs::new(store);

    // Deux chansons d'un même répertoire sanitisées vers le même nom :
    // la seconde écrase silencieusement la première.
    vfs.record("/Daily Songs/Same - Name.mp3", "1").await;
    vfs.record("/Daily Songs/Same - Name.mp3", "2").await;

    assert_eq!(
        vfs.resolve("/Daily Songs/Same - Name.mp3").await.as_deref(),
        Some("2")
    );
}

#[tokio::test]
async fn path_map_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite");

    {
        let store = Arc::new(CatalogStore::open(&path).unwrap());
        let vfs = Vfs::new(store);
        vfs.record("/My Playlists/Mix/A - B.flac", "99").await;
    }

    // Un nouveau Vfs sur le même magasin précharge les entrées persistées
    let store = Arc::new(CatalogStore::open(&path).unwrap());
    let vfs = Vfs::new(store);
    assert_eq!(
        vfs.resolve("/My Playlists/Mix/A - B.flac").await.as_deref(),
        Some("99")
    );
}

#[tokio::test]
async fn invalidate_dir_scopes_to_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite");

    let store = Arc::new(CatalogStore::open(&path).unwrap());
    let vfs = Vfs::new(store);

    vfs.record("/My Playlists/Mix/A - B.mp3", "1").await;
    vfs.record("/My Playlists/Mix/C - D.mp3", "2").await;
    vfs.record("/My Playlists/Other/E - F.mp3", "3").await;
    vfs.record("/Daily Songs/G - H.mp3", "4").await;

    vfs.invalidate_dir("/My Playlists/Mix").await;

    assert!(vfs.resolve("/My Playlists/Mix/A - B.mp3").await.is_none());
    assert!(vfs.resolve("/My Playlists/Mix/C - D.mp3").await.is_none());
    assert_eq!(
        vfs.resolve("/My Playlists/Other/E - F.mp3").await.as_deref(),
        Some("3")
    );
    assert_eq!(vfs.resolve("/Daily Songs/G - H.mp3").await.as_deref(), Some("4"));

    // L'invalidation atteint aussi le magasin persisté
    let store = Arc::new(CatalogStore::open(&path).unwrap());
    let reloaded = Vfs::new(store);
    assert!(reloaded.resolve("/My Playlists/Mix/A - B.mp3").await.is_none());
    assert_eq!(
        reloaded.resolve("/Daily Songs/G - H.mp3").await.as_deref(),
        Some("4")
    );
}

#[tokio::test]
async fn any_song_in_dir_finds_mapped_tracks() {
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());
    let vfs = Vfs::new(store);

    assert!(vfs.any_song_in_dir("/Daily Songs").await.is_none());

    vfs.record("/Daily Songs/Title - Artist.mp3", "42").await;
    assert_eq!(vfs.any_song_in_dir("/Daily Songs").await.as_deref(), Some("42"));

    // Un répertoire voisin partageant le préfixe textuel n'est pas pris
    assert!(vfs.any_song_in_dir("/Daily").await.is_none());
}
