//! MCP (Model Context Protocol) implementation.
//!
//! Server side: [`McpServer`] exposes one source's tools over stdio.
//! Client side: [`ToolClient`] invokes tools either on a spawned server
//! ([`StdioToolClient`]) or in-process ([`LocalToolClient`]), and
//! [`unpack`] normalizes whatever comes back.

pub mod client;
pub mod server;
mod tools;
pub mod transport;
pub mod unpack;

pub use client::{ClientError, LocalToolClient, StdioToolClient, ToolClient, ToolInfo};
pub use server::McpServer;
pub use tools::{
    Tool, ToolHandler, ToolRegistry, ARXIV_SEARCH, DEFAULT_TOOL_RESULTS, OPENALEX_SEARCH_WORKS,
};
pub use unpack::{unpack, RawToolResult, Unpacked};
