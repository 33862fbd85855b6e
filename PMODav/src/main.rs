use anyhow::Context;
use pmodavconfig::Config;
use pmoncm::{CatalogStore, CredentialStore, NcmClient};
use pmowebdav::DavState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Période de polling du login QR
const QR_POLL_PERIOD: Duration = Duration::from_secs(2);

/// Période de rafraîchissement du credential (quotidien)
const CREDENTIAL_REFRESH_PERIOD: Duration = Duration::from_secs(86400);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========

    let config = pmodavconfig::get_config();
    init_logging(&config);

    let catalog_db = config.get_catalog_db_path()?;
    let store = Arc::new(
        CatalogStore::open(&catalog_db)
            .with_context(|| format!("failed to open catalog store {}", catalog_db.display()))?,
    );
    let session = Arc::new(CredentialStore::load(config.get_cookie_path()?));
    let client = Arc::new(NcmClient::from_config(session, store)?);

    // ========== PHASE 2 : Session ==========

    info!("🔑 Checking session credential...");
    ensure_session(&client).await?;
    client.spawn_credential_refresh(CREDENTIAL_REFRESH_PERIOD);

    // ========== PHASE 3 : Serveur WebDAV ==========

    let state = DavState::from_config(client);
    let app = pmowebdav::router(state);

    let port = config.get_http_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    // Seule condition fatale du process : impossible d'ouvrir le port
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind port {port}"))?;

    info!("🌐 PMODav ready at http://{}", addr);
    info!("Press Ctrl+C to stop...");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Initialise le logging (fmt + env-filter, niveau depuis la configuration)
fn init_logging(config: &Config) {
    if !config.get_log_enable_console() {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Garantit une session valide avant de servir
///
/// Le credential persisté est validé auprès du catalogue ; s'il est absent
/// ou révoqué, le flow de login QR prend le relais.
async fn ensure_session(client: &Arc<NcmClient>) -> anyhow::Result<()> {
    match client.validate_credential().await {
        Ok(account) => {
            info!(
                "✅ Logged in as {} ({})",
                account.nickname.as_deref().unwrap_or("unknown"),
                account.user_id
            );
            Ok(())
        }
        Err(e) if e.is_auth_error() => {
            warn!("No valid session ({}), starting QR login", e);
            qr_login(client).await
        }
        Err(e) => Err(anyhow::Error::from(e).context("failed to validate session")),
    }
}

/// Flow de login QR : affiche l'URL à scanner et attend la confirmation
async fn qr_login(client: &Arc<NcmClient>) -> anyhow::Result<()> {
    loop {
        let (key, url) = client.qr_login_start().await?;

        info!("📱 Scan this link with the mobile app to sign in:");
        info!("    {}", url);

        loop {
            tokio::time::sleep(QR_POLL_PERIOD).await;

            let check = client.qr_login_poll(&key).await?;
            if check.is_expired() {
                info!("QR code expired, requesting a new one");
                break;
            }

            if check.is_confirmed() {
                let cookie = check
                    .cookie
                    .context("QR login confirmed but no cookie was issued")?;
                let account = client.commit_cookie(cookie).await?;
                info!(
                    "✅ Logged in as {} ({})",
                    account.nickname.as_deref().unwrap_or("unknown"),
                    account.user_id
                );
                return Ok(());
            }
        }
    }
}

/// Attend Ctrl+C pour un arrêt gracieux
async fn shutdown_signal() {
    signal::ctrl_c().await.expect("failed to listen for ctrl_c");
    info!("Ctrl+C received, shutting down");
}
