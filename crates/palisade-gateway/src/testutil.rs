//! In-memory MCP servers and a scriptable connector for tests.
//!
//! Downstream servers in tests are real MCP servers connected over
//! in-process duplex pipes, so discovery, proxying, and sanitization are
//! exercised through genuine protocol sessions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientInfo, Content, ErrorCode, Implementation,
    ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
    ToolsCapability,
};
use rmcp::service::{RequestContext, RunningService};
use rmcp::{ErrorData, RoleClient, RoleServer, ServerHandler, ServiceExt};
use tokio_util::sync::CancellationToken;

use palisade_types::{DownstreamConfig, GatewayError};

use crate::downstream::{Connector, DownstreamSession, GatewayClient};

/// An MCP server answering with canned text per tool.
#[derive(Clone)]
pub struct TestDownstream {
    tools: Vec<(String, String)>,
}

impl TestDownstream {
    /// `(tool name, canned reply)` pairs.
    pub fn new(tools: &[(&str, &str)]) -> Self {
        Self {
            tools: tools
                .iter()
                .map(|(n, r)| (n.to_string(), r.to_string()))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }
}

impl ServerHandler for TestDownstream {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                ..ServerCapabilities::default()
            },
            server_info: Implementation {
                name: "test-downstream".into(),
                version: "0.0.1".into(),
                ..Implementation::default()
            },
            ..ServerInfo::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self
            .tools
            .iter()
            .map(|(name, _)| {
                Tool::new(
                    name.clone(),
                    format!("test tool {name}"),
                    Arc::new(serde_json::Map::new()),
                )
            })
            .collect();
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        match self.tools.iter().find(|(n, _)| *n == params.name.as_ref()) {
            Some((_, reply)) => Ok(CallToolResult::success(vec![Content::text(reply.clone())])),
            None => Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("unknown tool {}", params.name),
                None,
            )),
        }
    }
}

/// Connector producing sessions to in-memory [`TestDownstream`] servers.
pub struct TestConnector {
    servers: Mutex<HashMap<String, TestDownstream>>,
    fail: Mutex<HashSet<String>>,
    connects: AtomicUsize,
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl TestConnector {
    pub fn new<'a>(servers: impl IntoIterator<Item = (&'a str, TestDownstream)>) -> Self {
        Self {
            servers: Mutex::new(
                servers
                    .into_iter()
                    .map(|(n, s)| (n.to_string(), s))
                    .collect(),
            ),
            fail: Mutex::new(HashSet::new()),
            connects: AtomicUsize::new(0),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Mark names whose connection attempts always fail.
    pub fn failing<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        {
            let mut fail = self.fail.lock().unwrap();
            fail.extend(names.into_iter().map(str::to_string));
        }
        self
    }

    /// Make future connection attempts for `name` fail.
    pub fn fail_from_now_on(&self, name: &str) {
        self.fail.lock().unwrap().insert(name.to_string());
    }

    /// Stop the most recently spawned server for `name`, simulating a
    /// downstream dying out-of-band.
    pub fn kill_server(&self, name: &str) {
        if let Some(token) = self.tokens.lock().unwrap().get(name) {
            token.cancel();
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for TestConnector {
    async fn connect(&self, spec: &DownstreamConfig) -> Result<DownstreamSession, GatewayError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        if self.fail.lock().unwrap().contains(&spec.name) {
            return Err(GatewayError::Connect(format!(
                "test connect error for {}",
                spec.name
            )));
        }

        let handler = self
            .servers
            .lock()
            .unwrap()
            .get(&spec.name)
            .cloned()
            .ok_or_else(|| {
                GatewayError::Connect(format!("no test server configured for {}", spec.name))
            })?;

        let (client_io, server_io) = tokio::io::duplex(64 * 1024);

        let ct = CancellationToken::new();
        self.tokens
            .lock()
            .unwrap()
            .insert(spec.name.clone(), ct.clone());

        tokio::spawn(async move {
            let (r, w) = tokio::io::split(server_io);
            if let Ok(service) = handler.serve_with_ct((r, w), ct).await {
                let _ = service.waiting().await;
            }
        });

        let (r, w) = tokio::io::split(client_io);
        GatewayClient
            .serve((r, w))
            .await
            .map_err(|e| GatewayError::Connect(format!("connecting to {}: {e}", spec.name)))
    }
}

/// Serve `handler` in-process and return a connected plain MCP client.
pub async fn connect_client<H>(handler: H) -> RunningService<RoleClient, ()>
where
    H: ServerHandler + Send + 'static,
{
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    tokio::spawn(async move {
        let (r, w) = tokio::io::split(server_io);
        if let Ok(service) = handler.serve((r, w)).await {
            let _ = service.waiting().await;
        }
    });

    let (r, w) = tokio::io::split(client_io);
    ().serve((r, w)).await.expect("client connect")
}

// GatewayClient identity sanity check, kept here with the other protocol
// test plumbing.
#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::ClientHandler;

    #[test]
    fn gateway_client_reports_gateway_identity() {
        let info: ClientInfo = GatewayClient.get_info();
        assert_eq!(info.client_info.name, "palisade");
        assert_eq!(info.client_info.version, env!("CARGO_PKG_VERSION"));
    }
}
