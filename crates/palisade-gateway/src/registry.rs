//! Tool discovery and the proxy router.
//!
//! The [`Registry`] walks the downstream manager's connection snapshot,
//! discovers each server's tool catalog, and produces a [`GatewayRouter`]:
//! an MCP server handler advertising every downstream tool under a
//! namespaced name and forwarding calls through the per-downstream
//! sanitization pipeline.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorCode, Implementation, ListToolsResult,
    PaginatedRequestParam, RawContent, ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use palisade_sanitize::Pipeline;
use palisade_types::config::NAMESPACE_SEP;
use palisade_types::{GatewayError, SanitizeConfig, Verdict};

use crate::downstream::DownstreamManager;

/// One proxied tool: where it lives, what it is really called, the
/// namespaced clone advertised upstream, and the pipeline its responses
/// run through.
struct ProxyTool {
    server: String,
    remote_name: String,
    tool: Tool,
    pipeline: Arc<Pipeline>,
}

/// Discovers downstream tools and builds the proxy router.
pub struct Registry {
    manager: Arc<DownstreamManager>,
    global: SanitizeConfig,
}

impl Registry {
    pub fn new(manager: Arc<DownstreamManager>, global: SanitizeConfig) -> Self {
        Self { manager, global }
    }

    /// Enumerate every connected downstream's tool catalog and build the
    /// routing table. Fails if a catalog cannot be listed, if a pipeline
    /// cannot be built, or if no tools were discovered at all.
    pub async fn discover(&self) -> Result<GatewayRouter, GatewayError> {
        let mut table = HashMap::new();

        for conn in self.manager.conns().await {
            let merged = SanitizeConfig::merge(&self.global, conn.spec.sanitization.as_ref());
            let pipeline =
                Arc::new(Pipeline::from_config(&merged, &conn.name).map_err(|e| {
                    GatewayError::Discovery(format!("building pipeline for {}: {e}", conn.name))
                })?);

            let tools = conn.peer.list_all_tools().await.map_err(|e| {
                GatewayError::Discovery(format!("listing tools for {}: {e}", conn.name))
            })?;

            let count = tools.len();
            for tool in tools {
                let namespaced = format!("{}{}{}", conn.name, NAMESPACE_SEP, tool.name);
                let mut advertised = tool.clone();
                advertised.name = Cow::Owned(namespaced.clone());

                table.insert(
                    namespaced,
                    ProxyTool {
                        server: conn.name.clone(),
                        remote_name: tool.name.to_string(),
                        tool: advertised,
                        pipeline: pipeline.clone(),
                    },
                );
            }

            info!(server = %conn.name, count, "registered tools");
        }

        if table.is_empty() {
            return Err(GatewayError::Discovery(
                "no tools discovered from any downstream server".to_string(),
            ));
        }

        Ok(GatewayRouter {
            tools: Arc::new(table),
            manager: self.manager.clone(),
        })
    }
}

/// MCP server handler for the upstream endpoint.
///
/// The routing table is immutable after discovery; each call re-resolves
/// the downstream session through the manager so reconnected sessions are
/// picked up without rebuilding the table.
#[derive(Clone)]
pub struct GatewayRouter {
    tools: Arc<HashMap<String, ProxyTool>>,
    manager: Arc<DownstreamManager>,
}

impl GatewayRouter {
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

/// Run each text content item of a downstream result through the pipeline.
///
/// A block replaces the whole result with an error-flagged text item and
/// leaves later items unscanned; a modify rewrites the item in place,
/// keeping its annotations. Non-text items pass through untouched.
fn sanitize_result(
    tool: &str,
    pipeline: &Pipeline,
    mut result: CallToolResult,
    cancel: &CancellationToken,
) -> Result<CallToolResult, ErrorData> {
    let items = &mut result.content;

    for i in 0..items.len() {
        let text = match &items[i].raw {
            RawContent::Text(t) => t.text.clone(),
            _ => continue,
        };

        let outcome = pipeline.process(&text, cancel).map_err(|e| {
            ErrorData::internal_error(format!("sanitizing response of {tool}: {e}"), None)
        })?;

        match outcome.final_verdict {
            Verdict::Block => {
                let reason = if outcome.all_threats.is_empty() {
                    "blocked by sanitization".to_string()
                } else {
                    outcome.all_threats.join("; ")
                };
                warn!(tool = %tool, threats = ?outcome.all_threats, "blocked tool response");
                return Ok(CallToolResult::error(vec![Content::text(reason)]));
            }
            Verdict::Modify => {
                let mut item = Content::text(outcome.final_content);
                item.annotations = items[i].annotations.clone();
                items[i] = item;
            }
            Verdict::Pass => {}
        }
    }

    Ok(result)
}

impl ServerHandler for GatewayRouter {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                ..ServerCapabilities::default()
            },
            server_info: Implementation {
                name: "palisade".into(),
                version: env!("CARGO_PKG_VERSION").into(),
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
        let mut tools: Vec<Tool> = self.tools.values().map(|p| p.tool.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = params.name.to_string();
        let Some(entry) = self.tools.get(&name) else {
            return Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("unknown tool: {name}"),
                None,
            ));
        };

        let Some(peer) = self.manager.session(&entry.server).await else {
            return Err(ErrorData::internal_error(
                format!("downstream {} not connected", entry.server),
                None,
            ));
        };

        // Forward under the original tool name; everything else in the
        // request is passed through as-is.
        let mut forward = params;
        forward.name = Cow::Owned(entry.remote_name.clone());

        let result = peer
            .call_tool(forward)
            .await
            .map_err(|e| ErrorData::internal_error(format!("downstream call {name}: {e}"), None))?;

        sanitize_result(&name, &entry.pipeline, result, &context.ct)
    }
}
