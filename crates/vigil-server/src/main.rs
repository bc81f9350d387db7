use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vigil_ingest::IngestService;
use vigil_notify::{Notifier, StubNotifier, WebhookNotifier};
use vigil_processor::ProcessorService;
use vigil_queue::memory::MemoryQueue;
use vigil_server::config::ServerConfig;
use vigil_server::state::AppState;
use vigil_server::{app, banner};
use vigil_store::memory::{
    MemoryAlertRepository, MemoryGroupingRuleRepository, MemoryStateStore, MemoryTenantRepository,
};
use vigil_store::{AlertRepository, GroupingRuleRepository, StateStore, TenantRepository};

#[tokio::main]
async fn main() -> Result<()> {
    vigil_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .init();

    banner::print();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    let queue = Arc::new(MemoryQueue::new(
        config.queue.partitions,
        config.queue.buffer_size,
    ));
    let state_store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
    let alerts: Arc<dyn AlertRepository> = Arc::new(MemoryAlertRepository::new());
    let tenants: Arc<dyn TenantRepository> = Arc::new(MemoryTenantRepository::new());
    let rules: Arc<dyn GroupingRuleRepository> = Arc::new(MemoryGroupingRuleRepository::new());

    let notifier: Arc<dyn Notifier> = match config.notification.mode.as_str() {
        "webhook" => Arc::new(WebhookNotifier::new(Duration::from_secs(
            config.notification.webhook_timeout_secs,
        ))),
        _ => Arc::new(StubNotifier::new()),
    };

    let ingest = Arc::new(IngestService::new(
        queue.clone(),
        tenants.clone(),
        rules.clone(),
    ));
    let processor = Arc::new(ProcessorService::new(
        queue.clone(),
        state_store.clone(),
        alerts.clone(),
        tenants.clone(),
        rules.clone(),
        notifier,
    ));

    let cancel = CancellationToken::new();
    let processor_task = tokio::spawn(processor.clone().run(cancel.clone()));

    let app_state = AppState {
        ingest,
        alerts,
        tenants,
        rules,
        config: Arc::new(config),
        start_time: Utc::now(),
    };
    let app = app::build_http_app(app_state.clone());

    let addr: SocketAddr =
        format!("{}:{}", app_state.config.host, app_state.config.http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    // Shutdown sequence: intake has stopped with the server; cancel the
    // processor's fetch loop, let it finish in-flight work, then close the
    // queue and the state store.
    cancel.cancel();
    queue.shutdown();
    if let Err(error) = processor_task.await? {
        tracing::warn!(error = %error, "processor exited with error");
    }
    state_store.close().await.ok();

    tracing::info!("shutdown complete");
    Ok(())
}
