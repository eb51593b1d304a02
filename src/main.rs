//! Facegate HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use facegate::assets::FilesystemAssetResolver;
use facegate::cache::DiskEmbeddingCache;
use facegate::config::Config;
use facegate::embedding::{
    EmbeddingBackend, EmbeddingProvider, RemoteEmbeddingProvider, StubEmbeddingProvider,
};
use facegate::gateway::{HandlerState, create_router_with_state};
use facegate::verify::Verifier;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        assets_dir = %config.assets_dir.display(),
        cache_dir = %config.cache_dir.display(),
        threshold = config.threshold,
        operator = %config.match_operator,
        "Facegate starting"
    );

    let provider = match config.remote_provider() {
        Some(remote) => {
            tracing::info!(url = %remote.url, model = %remote.model_id, "Using remote embedding provider");
            EmbeddingBackend::Remote(RemoteEmbeddingProvider::new(remote)?)
        }
        None => {
            tracing::warn!(
                "No FACEGATE_PROVIDER_URL configured, running embedder in stub mode (not for real verification)"
            );
            EmbeddingBackend::Stub(StubEmbeddingProvider::new())
        }
    };
    let embedder_mode = if provider.is_stub() { "stub" } else { "remote" };

    let cache = DiskEmbeddingCache::open(
        config.cache_dir.clone(),
        provider.model_id(),
        provider.dimension(),
        config.memory_cache_capacity,
    )?;

    let resolver = FilesystemAssetResolver::new(config.assets_dir.clone())
        .with_fingerprint_mode(config.fingerprint_mode);
    if !config.assets_dir.is_dir() {
        tracing::warn!(
            path = %config.assets_dir.display(),
            "Assets directory missing; /ready will report not_ready"
        );
    }

    let verifier = Verifier::new(provider, resolver, cache, config.verifier_config())?;
    let state = HandlerState::new(Arc::new(verifier)).with_embedder_mode(embedder_mode);

    let app = create_router_with_state(state, config.max_upload_bytes);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Facegate shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("FACEGATE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(5000);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let Ok(rt) = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    else {
        return 1;
    };

    rt.block_on(async {
        let Ok(client) = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
        else {
            return 1;
        };

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
