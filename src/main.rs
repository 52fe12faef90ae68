//! Atlas HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use atlas::cache::CacheService;
use atlas::config::Config;
use atlas::embedding::HttpEmbeddingClient;
use atlas::gateway::{HandlerState, create_router_with_state};
use atlas::generation::{GenaiCompletionService, GenerativeFallbackWorker};
use atlas::persistence::{FilePersistence, PersistenceQueue};
use atlas::resolver::Resolver;
use atlas::spatial::InMemorySpatialStore;

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
        model = %config.completion_model,
        "Atlas starting"
    );

    let spatial = match &config.seed_path {
        Some(path) => InMemorySpatialStore::load_seed_file(path).await?,
        None => {
            tracing::warn!("No ATLAS_SEED_PATH configured, spatial store starts empty");
            InMemorySpatialStore::new()
        }
    };

    let caches = Arc::new(CacheService::new(
        config.vector_cache_config(),
        config.embedding_cache_config(),
    )?);
    let sweeper = caches.start_sweeper();

    let embedder = HttpEmbeddingClient::new(config.embedding_client_config())?;

    let completion = GenaiCompletionService::new(config.completion_model.clone());
    let worker = GenerativeFallbackWorker::new(Arc::new(completion))
        .with_sampling(config.sampling_config())
        .with_costs(config.cost_model());

    let store = FilePersistence::open(config.storage_path.clone()).await?;
    let persistence = Arc::new(PersistenceQueue::start(Arc::new(store)));

    let resolver = Arc::new(Resolver::new(
        caches.clone(),
        Arc::new(spatial),
        Arc::new(embedder),
        worker,
        persistence.clone(),
        config.resolver_config(),
    )?);

    let app = create_router_with_state(HandlerState::new(resolver));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Draining persistence queue...");
    persistence.shutdown().await;
    for warning in persistence.take_warnings() {
        tracing::warn!(
            interaction_id = %warning.interaction_id,
            stage = ?warning.stage,
            reason = %warning.reason,
            "Unpersisted generation output"
        );
    }

    caches.shutdown();
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Cache sweeper task failed");
    }

    tracing::info!("Atlas shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("ATLAS_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

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
            Ok(mut sig) => {
                sig.recv().await;
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
