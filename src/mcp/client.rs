//! MCP client side: capability discovery and invocation.
//!
//! [`ToolClient`] is the seam the digest pipeline talks to. Two
//! implementations exist:
//! - [`StdioToolClient`] spawns a tool server and speaks JSON-RPC over its
//!   pipes through [`McpClient`]
//! - [`LocalToolClient`] dispatches straight into a [`ToolRegistry`]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::mcp::tools::ToolRegistry;
use crate::mcp::transport::{ProcessTransport, Transport};
use crate::mcp::unpack::RawToolResult;

/// Protocol revision announced during the handshake
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Grace period for a server to exit after its stdin closes
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Errors raised while talking to a tool server
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Spawning, reading or writing failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer sent something that is not a valid response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The tool ran and reported a failure
    #[error("Tool error: {0}")]
    Tool(String),

    /// A request was made before the handshake
    #[error("Client not initialized")]
    NotInitialized,
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

/// A capability advertised by a tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Capability invocation interface used by the digest pipeline
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Capabilities the server offers
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ClientError>;

    /// Invoke a capability and return its opaque result
    async fn call_tool(&self, name: &str, args: Value) -> Result<RawToolResult, ClientError>;
}

/// Information about the connected MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC protocol state for one server connection
#[derive(Debug)]
pub struct McpClient {
    initialized: bool,
    server_info: Option<ServerInfo>,
    next_id: AtomicI64,
}

impl McpClient {
    pub fn new() -> Self {
        Self {
            initialized: false,
            server_info: None,
            next_id: AtomicI64::new(1),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Perform the initialization handshake with the server.
    pub async fn initialize<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<ServerInfo, ClientError> {
        let result = self
            .request(
                transport,
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;

        let server_info = ServerInfo {
            name: result["serverInfo"]["name"]
                .as_str()
                .unwrap_or("unknown")
                .into(),
            version: result["serverInfo"]["version"]
                .as_str()
                .unwrap_or("0.0.0")
                .into(),
            protocol_version: result["protocolVersion"]
                .as_str()
                .unwrap_or(MCP_PROTOCOL_VERSION)
                .into(),
        };

        info!(
            server = %server_info.name,
            version = %server_info.version,
            "MCP client initialized"
        );

        let notification = json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        });
        transport.write_message(&notification.to_string()).await?;

        self.server_info = Some(server_info.clone());
        self.initialized = true;
        Ok(server_info)
    }

    /// List the tools the server offers.
    pub async fn list_tools<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
    ) -> Result<Vec<ToolInfo>, ClientError> {
        if !self.initialized {
            return Err(ClientError::NotInitialized);
        }

        let result = self.request(transport, "tools/list", json!({})).await?;
        let tools = result["tools"]
            .as_array()
            .ok_or_else(|| ClientError::Protocol("tools/list result has no tools array".into()))?
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect::<Vec<ToolInfo>>();

        debug!(count = tools.len(), "Discovered tools from MCP server");
        Ok(tools)
    }

    /// Call a tool and return its raw `tools/call` result.
    pub async fn call_tool<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value, ClientError> {
        if !self.initialized {
            return Err(ClientError::NotInitialized);
        }

        let result = self
            .request(
                transport,
                "tools/call",
                json!({ "name": tool_name, "arguments": arguments }),
            )
            .await
            .map_err(|e| match e {
                ClientError::Protocol(message) => {
                    ClientError::Tool(format!("Tool '{}' failed: {}", tool_name, message))
                }
                other => other,
            })?;

        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(ClientError::Tool(format!(
                "Tool '{}' failed: {}",
                tool_name,
                error_text(&result)
            )));
        }

        Ok(result)
    }

    /// Send a request and wait for the response carrying the same id.
    async fn request<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        method: &str,
        params: Value,
    ) -> Result<Value, ClientError> {
        let id = self.next_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        transport.write_message(&request.to_string()).await?;

        loop {
            let raw = transport.read_message().await?.ok_or_else(|| {
                ClientError::Transport("Transport closed while waiting for response".into())
            })?;

            let message: JsonRpcMessage = serde_json::from_str(&raw).map_err(|e| {
                ClientError::Protocol(format!("Invalid JSON-RPC message: {}", e))
            })?;

            if message.id.as_ref().and_then(Value::as_i64) != Some(id) {
                trace!(method = ?message.method, "Skipping unrelated message");
                continue;
            }

            if let Some(error) = message.error {
                warn!(code = error.code, message = %error.message, "MCP server returned error");
                return Err(ClientError::Protocol(format!(
                    "{} (code {})",
                    error.message, error.code
                )));
            }

            return message
                .result
                .ok_or_else(|| ClientError::Protocol(format!("{} response has no result", method)));
        }
    }
}

impl Default for McpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Text of an `isError` tool result
fn error_text(result: &Value) -> String {
    let text = result["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    if text.is_empty() {
        "unknown error".to_string()
    } else {
        text
    }
}

struct Session {
    client: McpClient,
    transport: Box<dyn Transport>,
    child: Option<Child>,
}

/// Tool client backed by a server speaking MCP over a transport
pub struct StdioToolClient {
    label: String,
    session: Mutex<Session>,
}

impl std::fmt::Debug for StdioToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioToolClient")
            .field("label", &self.label)
            .finish()
    }
}

impl StdioToolClient {
    /// Spawn a tool server process and complete the handshake
    pub async fn spawn(
        label: impl Into<String>,
        command: &str,
        args: &[String],
    ) -> Result<Self, ClientError> {
        let label = label.into();
        debug!(%label, command, ?args, "Spawning tool server");
        let (transport, child) = ProcessTransport::spawn(command, args)?;
        Self::connect_with(label, Box::new(transport), Some(child)).await
    }

    /// Complete the handshake over an existing transport
    pub async fn connect(
        label: impl Into<String>,
        transport: Box<dyn Transport>,
    ) -> Result<Self, ClientError> {
        Self::connect_with(label.into(), transport, None).await
    }

    async fn connect_with(
        label: String,
        mut transport: Box<dyn Transport>,
        child: Option<Child>,
    ) -> Result<Self, ClientError> {
        let mut client = McpClient::new();
        client.initialize(transport.as_mut()).await?;
        Ok(Self {
            label,
            session: Mutex::new(Session {
                client,
                transport,
                child,
            }),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name and version reported by the server
    pub async fn server_info(&self) -> Option<ServerInfo> {
        self.session.lock().await.client.server_info().cloned()
    }

    /// Close the pipes and wait briefly for the server to exit
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let mut session = self.session.lock().await;
        session.transport.close().await?;

        if let Some(mut child) = session.child.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    debug!(label = %self.label, %status, "Tool server exited");
                }
                Err(_) => {
                    warn!(label = %self.label, "Tool server did not exit, killing it");
                    child.kill().await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ToolClient for StdioToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ClientError> {
        let mut guard = self.session.lock().await;
        let session = &mut *guard;
        session.client.list_tools(session.transport.as_mut()).await
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<RawToolResult, ClientError> {
        let mut guard = self.session.lock().await;
        let session = &mut *guard;
        let result = session
            .client
            .call_tool(session.transport.as_mut(), name, args)
            .await?;
        Ok(RawToolResult::from_value(result))
    }
}

/// Tool client dispatching into an in-process registry
#[derive(Debug, Clone)]
pub struct LocalToolClient {
    registry: ToolRegistry,
}

impl LocalToolClient {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolClient for LocalToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ClientError> {
        Ok(self
            .registry
            .all()
            .into_iter()
            .map(|tool| ToolInfo {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<RawToolResult, ClientError> {
        let value = self
            .registry
            .execute(name, args)
            .await
            .map_err(|e| ClientError::Tool(format!("Tool '{}' failed: {}", name, e)))?;

        // Same shape a server would put on the wire: one JSON text block.
        let text = serde_json::to_string(&value)
            .map_err(|e| ClientError::Protocol(format!("Unserializable tool result: {}", e)))?;
        Ok(RawToolResult::text_blocks([text]))
    }
}
