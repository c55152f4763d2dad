//! Application startup and lifecycle management.

use crate::config::ChatConfig;
use crate::handlers;
use crate::services::{
    AzureProvider, ChatRelay, ConversationStore, GeminiProvider, Providers, TranscriptFile,
    UploadService,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConversationStore>,
    pub relay: ChatRelay,
    pub uploads: UploadService,
}

impl AppState {
    /// Wire the store, providers and upload directory described by `config`.
    pub async fn from_config(config: &ChatConfig) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.provider_timeout_secs);

        let gemini = GeminiProvider::new(config.gemini.clone(), timeout)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let azure = AzureProvider::new(config.azure.clone(), timeout)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

        if config.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not configured - gemini requests will fail");
        }
        if config.azure.endpoint.is_none() {
            tracing::warn!("AZURE_ENDPOINT not configured - azure requests will fail");
        }

        let providers = Providers::new(Arc::new(gemini), Arc::new(azure));

        let store = Arc::new(
            ConversationStore::open(TranscriptFile::new(&config.storage.transcript_path)).await,
        );

        let uploads = UploadService::new(&config.storage.upload_dir)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to initialize upload directory at {}: {}",
                    config.storage.upload_dir.display(),
                    e
                );
                AppError::InternalError(anyhow::anyhow!(e))
            })?;

        Ok(Self {
            relay: ChatRelay::new(providers, store.clone()),
            store,
            uploads,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/chat", post(handlers::send_message))
        .route(
            "/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::disable()),
        )
        .route("/get_chat_history", get(handlers::get_chat_history))
        .route("/new_chat", post(handlers::new_chat))
        .layer(from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    /// Build the application and bind its listener. Port 0 picks a free port.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config).await?;

        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat service listening on port {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.state.store
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
