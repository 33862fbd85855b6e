use pmoncm::CatalogStore;
use pmowebdav::error::DavError;
use pmowebdav::fs::listing::ListingCache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn cache_over(store: Arc<CatalogStore>, ttl: Duration) -> ListingCache {
    ListingCache::new(store, ttl)
}

#[tokio::test]
async fn second_listing_within_ttl_is_byte_identical() {
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());
    let cache = cache_over(store, Duration::from_secs(3600));
    let renders = AtomicUsize::new(0);

    let first = cache
        .get_or_render("/Daily Songs", || async {
            renders.fetch_add(1, Ordering::SeqCst);
            Ok("<multistatus v=\"1\"/>".to_string())
        })
        .await
        .unwrap();

    let second = cache
        .get_or_render("/Daily Songs", || async {
            renders.fetch_add(1, Ordering::SeqCst);
            Ok("<multistatus v=\"2\"/>".to_string())
        })
        .await
        .unwrap();

    // Dans la fenêtre de TTL, payload identique octet pour octet et un
    // seul rendu effectué
    assert_eq!(first, second);
    assert_eq!(renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidation_forces_a_new_render() {
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());
    let cache = cache_over(store, Duration::from_secs(3600));

    let first = cache
        .get_or_render("/My Playlists", || async { Ok("v1".to_string()) })
        .await
        .unwrap();
    assert_eq!(first, "v1");

    cache.invalidate("/My Playlists").await;

    let second = cache
        .get_or_render("/My Playlists", || async { Ok("v2".to_string()) })
        .await
        .unwrap();
    assert_eq!(second, "v2");
}

#[tokio::test]
async fn render_failures_are_not_cached() {
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());
    let cache = cache_over(store, Duration::from_secs(3600));
    let renders = AtomicUsize::new(0);

    let failed = cache
        .get_or_render("/Daily Songs", || async {
            renders.fetch_add(1, Ordering::SeqCst);
            Err(DavError::BadRequest("upstream down".to_string()))
        })
        .await;
    assert!(failed.is_err());

    // L'échec se propage sans fallback périmé ; le prochain appel rend à
    // nouveau
    let recovered = cache
        .get_or_render("/Daily Songs", || async {
            renders.fetch_add(1, Ordering::SeqCst);
            Ok("ok".to_string())
        })
        .await
        .unwrap();

    assert_eq!(recovered, "ok");
    assert_eq!(renders.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persisted_listing_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite");

    {
        let store = Arc::new(CatalogStore::open(&path).unwrap());
        let cache = cache_over(store, Duration::from_secs(3600));
        cache.put("/Daily Songs", "<persisted/>").await;
    }

    // Nouveau cache mémoire vide sur le même magasin : l'entrée sqlite
    // encore fraîche est servie sans rendu
    let store = Arc::new(CatalogStore::open(&path).unwrap());
    let cache = cache_over(store, Duration::from_secs(3600));

    let payload = cache
        .get_or_render("/Daily Songs", || async {
            panic!("should be served from the persisted listing")
        })
        .await
        .unwrap();
    assert_eq!(payload, "<persisted/>");
}

#[tokio::test]
async fn expired_persisted_listing_is_rerendered() {
    let store = Arc::new(CatalogStore::open_in_memory().unwrap());

    {
        let cache = cache_over(store.clone(), Duration::from_millis(10));
        cache.put("/Daily Songs", "old").await;
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    let cache = cache_over(store, Duration::from_millis(10));
    let payload = cache
        .get_or_render("/Daily Songs", || async { Ok("new".to_string()) })
        .await
        .unwrap();
    assert_eq!(payload, "new");
}
