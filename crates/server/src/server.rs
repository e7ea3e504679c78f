//! HTTP server startup

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use homeboard_core::ServerSettings;

use crate::routes::router;
use crate::service::HomeboardService;

/// HTTP server wrapper
pub struct HttpServer {
    config: ServerSettings,
    service: HomeboardService,
}

impl HttpServer {
    pub fn new(config: ServerSettings, service: HomeboardService) -> Self {
        Self { config, service }
    }

    pub fn service(&self) -> &HomeboardService {
        &self.service
    }

    /// Bind the configured address and serve until `shutdown` fires
    pub async fn start_with_shutdown(&self, shutdown: oneshot::Receiver<()>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.address()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        info!(
            "Starting HTTP server on {} (with graceful shutdown)",
            listener.local_addr()?
        );

        axum::serve(listener, router(self.service.clone()))
            .with_graceful_shutdown(async {
                shutdown.await.ok();
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    pub fn address(&self) -> String {
        self.config.address()
    }
}
