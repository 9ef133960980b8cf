//! Downstream connection management.
//!
//! The [`DownstreamManager`] owns one MCP client session per configured
//! downstream server. Connections that fail at startup are logged and
//! skipped; a background liveness loop pings each server every 30 seconds
//! and reconnects sessions that stopped answering.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{ClientInfo, Implementation};
use rmcp::service::RunningService;
use rmcp::transport::{ConfigureCommandExt, StreamableHttpClientTransport, TokioChildProcess};
use rmcp::{ClientHandler, Peer, RoleClient, ServiceExt};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use palisade_types::{DownstreamConfig, GatewayError, Transport};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// A live client session to one downstream server.
pub type DownstreamSession = RunningService<RoleClient, GatewayClient>;

/// Client handler presenting the gateway's identity to downstream servers.
#[derive(Clone, Default, Debug)]
pub struct GatewayClient;

impl ClientHandler for GatewayClient {
    fn get_info(&self) -> ClientInfo {
        ClientInfo {
            client_info: Implementation {
                name: "palisade".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::default()
            },
            ..ClientInfo::default()
        }
    }
}

/// Creates connected sessions for downstream specs.
///
/// Exists as a seam so tests can inject in-memory servers in place of
/// spawned processes or HTTP endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, spec: &DownstreamConfig) -> Result<DownstreamSession, GatewayError>;
}

/// Production connector: spawns a child process for stdio downstreams and
/// opens a streamable HTTP session for http downstreams.
pub struct DefaultConnector;

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, spec: &DownstreamConfig) -> Result<DownstreamSession, GatewayError> {
        match spec.transport {
            Transport::Stdio => {
                if spec.command.is_empty() {
                    return Err(GatewayError::Connect(format!(
                        "{}: stdio transport requires a command",
                        spec.name
                    )));
                }
                let transport = TokioChildProcess::new(
                    tokio::process::Command::new(&spec.command[0]).configure(|cmd| {
                        cmd.args(&spec.command[1..]);
                    }),
                )
                .map_err(|e| {
                    GatewayError::Connect(format!(
                        "{}: spawning {:?}: {e}",
                        spec.name, spec.command[0]
                    ))
                })?;

                GatewayClient
                    .serve(transport)
                    .await
                    .map_err(|e| GatewayError::Connect(format!("connecting to {}: {e}", spec.name)))
            }
            Transport::Http => {
                if spec.url.is_empty() {
                    return Err(GatewayError::Connect(format!(
                        "{}: http transport requires a url",
                        spec.name
                    )));
                }
                let transport = StreamableHttpClientTransport::from_uri(spec.url.clone());

                GatewayClient
                    .serve(transport)
                    .await
                    .map_err(|e| GatewayError::Connect(format!("connecting to {}: {e}", spec.name)))
            }
        }
    }
}

/// A session together with the config that created it.
struct DownstreamConn {
    session: DownstreamSession,
    spec: DownstreamConfig,
}

/// Snapshot of one live connection, safe to use without holding any lock.
pub struct ConnSnapshot {
    pub name: String,
    pub peer: Peer<RoleClient>,
    pub spec: DownstreamConfig,
}

/// Manages persistent connections to downstream MCP servers with health
/// checking and reconnection.
///
/// Readers (proxy handlers, the liveness loop) take the map read lock for
/// pointwise lookups; reconnect and close are the only writers.
pub struct DownstreamManager {
    conns: RwLock<HashMap<String, DownstreamConn>>,
    specs: Vec<DownstreamConfig>,
    connector: Arc<dyn Connector>,
    cancel: CancellationToken,
    health: Mutex<Option<JoinHandle<()>>>,
}

impl DownstreamManager {
    /// Connect to all configured downstream servers and start the health
    /// loop. Individual connection failures are logged and skipped; only a
    /// fully failed startup is an error.
    pub async fn start(
        specs: Vec<DownstreamConfig>,
        connector: Arc<dyn Connector>,
        parent: &CancellationToken,
    ) -> Result<Arc<Self>, GatewayError> {
        let mut conns = HashMap::with_capacity(specs.len());
        for spec in &specs {
            match connector.connect(spec).await {
                Ok(session) => {
                    info!(server = %spec.name, transport = %spec.transport, "connected");
                    conns.insert(
                        spec.name.clone(),
                        DownstreamConn {
                            session,
                            spec: spec.clone(),
                        },
                    );
                }
                Err(e) => {
                    error!(server = %spec.name, error = %e, "failed to connect");
                }
            }
        }

        if conns.is_empty() {
            return Err(GatewayError::Connect(
                "failed to connect to any downstream server".to_string(),
            ));
        }

        let manager = Arc::new(Self {
            conns: RwLock::new(conns),
            specs,
            connector,
            cancel: parent.child_token(),
            health: Mutex::new(None),
        });

        let handle = tokio::spawn({
            let m = manager.clone();
            async move { m.health_loop().await }
        });
        *manager.health.lock().await = Some(handle);

        Ok(manager)
    }

    /// The active session peer for a named downstream, or `None` if that
    /// server is not currently connected.
    pub async fn session(&self, name: &str) -> Option<Peer<RoleClient>> {
        self.conns
            .read()
            .await
            .get(name)
            .map(|c| c.session.peer().clone())
    }

    /// Snapshot of all active connections; callers iterate without holding
    /// the map lock.
    pub async fn conns(&self) -> Vec<ConnSnapshot> {
        self.conns
            .read()
            .await
            .iter()
            .map(|(name, c)| ConnSnapshot {
                name: name.clone(),
                peer: c.session.peer().clone(),
                spec: c.spec.clone(),
            })
            .collect()
    }

    /// Stop the health loop and close every session. Idempotent.
    pub async fn close(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.health.lock().await.take() {
            let _ = handle.await;
        }

        let mut conns = self.conns.write().await;
        for (name, conn) in conns.drain() {
            if let Err(e) = conn.session.cancel().await {
                error!(server = %name, error = %e, "error closing session");
            }
        }
    }

    async fn health_loop(&self) {
        let mut ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        // The first tick completes immediately; checks start one interval in.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => self.check_now().await,
            }
        }
    }

    /// Run one liveness pass over all configured downstreams: ping each
    /// connected server and reconnect any that fail or are missing.
    pub async fn check_now(&self) {
        for spec in &self.specs {
            if self.cancel.is_cancelled() {
                return;
            }

            let peer = self.session(&spec.name).await;
            if let Some(peer) = peer {
                match tokio::time::timeout(PING_TIMEOUT, Self::probe(&peer)).await {
                    Ok(Ok(())) => continue,
                    Ok(Err(e)) => {
                        warn!(server = %spec.name, error = %e, "health check failed, reconnecting");
                    }
                    Err(_) => {
                        warn!(server = %spec.name, "health check timed out, reconnecting");
                    }
                }

                // Remove the dead session before its replacement goes in so
                // concurrent callers get "not connected" instead of a dead
                // session.
                let old = self.conns.write().await.remove(&spec.name);
                if let Some(old) = old {
                    if let Err(e) = old.session.cancel().await {
                        debug!(server = %spec.name, error = %e, "closing stale session");
                    }
                }
            }

            match self.connector.connect(spec).await {
                Ok(session) => {
                    self.conns.write().await.insert(
                        spec.name.clone(),
                        DownstreamConn {
                            session,
                            spec: spec.clone(),
                        },
                    );
                    info!(server = %spec.name, "reconnected");
                }
                Err(e) => {
                    self.conns.write().await.remove(&spec.name);
                    error!(server = %spec.name, error = %e, "reconnect failed");
                }
            }
        }
    }

    /// Liveness probe. The SDK client peer exposes no dedicated ping
    /// helper, so a minimal tools/list request serves as the round trip.
    async fn probe(peer: &Peer<RoleClient>) -> Result<(), GatewayError> {
        peer.list_tools(None)
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Downstream(e.to_string()))
    }
}
