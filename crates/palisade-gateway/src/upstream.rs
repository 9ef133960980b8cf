//! Upstream transport binding.
//!
//! Serves the gateway's MCP endpoint either over the standard streams or
//! as a streamable HTTP handler mounted on an axum router.

use std::time::Duration;

use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::transport::{stdio, StreamableHttpServerConfig};
use rmcp::{ServerHandler, ServiceExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use palisade_types::{GatewayError, Transport, UpstreamConfig};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The LLM-facing MCP endpoint. Tools are registered on the handler by
/// the registry before `run` is called.
pub struct Upstream {
    cfg: UpstreamConfig,
}

impl Upstream {
    pub fn new(cfg: UpstreamConfig) -> Self {
        Self { cfg }
    }

    /// Serve `handler` on the configured transport, blocking until the
    /// stream closes or `cancel` fires.
    pub async fn run<H>(&self, handler: H, cancel: CancellationToken) -> Result<(), GatewayError>
    where
        H: ServerHandler + Clone + Send + 'static,
    {
        match self.cfg.transport {
            Transport::Stdio => self.run_stdio(handler, cancel).await,
            Transport::Http => self.run_http(handler, cancel).await,
        }
    }

    async fn run_stdio<H>(&self, handler: H, cancel: CancellationToken) -> Result<(), GatewayError>
    where
        H: ServerHandler + Send + 'static,
    {
        info!("starting stdio transport");

        let service = match handler.serve_with_ct(stdio(), cancel.child_token()).await {
            Ok(service) => service,
            // Shutdown before the client ever spoke is a clean exit.
            Err(_) if cancel.is_cancelled() => return Ok(()),
            Err(e) => {
                return Err(GatewayError::Upstream(format!("stdio handshake: {e}")));
            }
        };

        service
            .waiting()
            .await
            .map_err(|e| GatewayError::Upstream(format!("stdio transport: {e}")))?;
        Ok(())
    }

    async fn run_http<H>(&self, handler: H, cancel: CancellationToken) -> Result<(), GatewayError>
    where
        H: ServerHandler + Clone + Send + 'static,
    {
        let addr = normalize_addr(&self.cfg.http.addr);

        let service = StreamableHttpService::new(
            move || Ok(handler.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        );
        let app = axum::Router::new().nest_service(self.cfg.http.path.as_str(), service);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayError::Upstream(format!("listen {addr}: {e}")))?;
        info!(addr = %addr, path = %self.cfg.http.path, "starting HTTP transport");

        let server = axum::serve(listener, app).with_graceful_shutdown({
            let cancel = cancel.clone();
            async move { cancel.cancelled().await }
        });
        let mut handle = tokio::spawn(async move { server.await });

        tokio::select! {
            res = &mut handle => return flatten_serve(res),
            _ = cancel.cancelled() => {}
        }

        info!("shutting down HTTP transport");
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
            Ok(res) => flatten_serve(res),
            Err(_) => {
                warn!("graceful shutdown deadline exceeded, aborting");
                handle.abort();
                Ok(())
            }
        }
    }
}

fn flatten_serve(
    res: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), GatewayError> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(GatewayError::Upstream(format!("http transport: {e}"))),
        Err(e) => Err(GatewayError::Upstream(format!("http transport task: {e}"))),
    }
}

/// Accept `":8080"` style addresses by binding all interfaces.
fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}
