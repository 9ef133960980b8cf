//! Top-level orchestrator.
//!
//! Wires config, downstream manager, registry, and the upstream endpoint
//! together, and ties the whole process to one cancellation token driven
//! by interrupt/terminate signals.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use palisade_types::{GatewayConfig, GatewayError};

use crate::downstream::{Connector, DefaultConnector, DownstreamManager};
use crate::registry::Registry;
use crate::upstream::Upstream;

pub struct Gateway {
    cfg: GatewayConfig,
    connector: Arc<dyn Connector>,
}

impl Gateway {
    pub fn new(cfg: GatewayConfig) -> Self {
        Self {
            cfg,
            connector: Arc::new(DefaultConnector),
        }
    }

    /// Create a gateway with a custom downstream connector (primarily for
    /// testing).
    pub fn with_connector(cfg: GatewayConfig, connector: Arc<dyn Connector>) -> Self {
        Self { cfg, connector }
    }

    /// Run until interrupted or terminated.
    pub async fn run(&self) -> Result<(), GatewayError> {
        let cancel = CancellationToken::new();
        spawn_signal_listener(cancel.clone())?;
        self.run_with_cancel(cancel).await
    }

    /// Run until `cancel` fires: connect downstream, discover tools,
    /// register proxied handlers, and serve the upstream endpoint.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> Result<(), GatewayError> {
        info!("starting gateway");

        let manager = DownstreamManager::start(
            self.cfg.downstream.clone(),
            self.connector.clone(),
            &cancel,
        )
        .await?;

        let registry = Registry::new(manager.clone(), self.cfg.sanitization.clone());
        let router = match registry.discover().await {
            Ok(router) => router,
            Err(e) => {
                manager.close().await;
                return Err(e);
            }
        };
        info!(total = router.tool_count(), "tool discovery complete");

        let upstream = Upstream::new(self.cfg.upstream.clone());
        info!(transport = %self.cfg.upstream.transport, "upstream ready");
        let result = upstream.run(router, cancel.clone()).await;

        manager.close().await;
        result
    }
}

/// Install interrupt/terminate handlers that cancel the root token.
fn spawn_signal_listener(cancel: CancellationToken) -> Result<(), GatewayError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())
            .map_err(|e| GatewayError::Internal(format!("installing signal handler: {e}")))?;
        let mut terminate = signal(SignalKind::terminate())
            .map_err(|e| GatewayError::Internal(format!("installing signal handler: {e}")))?;

        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt.recv() => {}
                _ = terminate.recv() => {}
            }
            info!("shutdown signal received");
            cancel.cancel();
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
            cancel.cancel();
        });
    }

    Ok(())
}
