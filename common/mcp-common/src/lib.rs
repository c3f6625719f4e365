//! MCP Common - Shared utilities for MCP servers
//!
//! Functionality shared by every MCP server in this workspace:
//!
//! - **Initialization**: [`init_tracing`] for stderr logging (stdout belongs
//!   to the MCP protocol)
//! - **Results**: helpers for building `CallToolResult` responses
//! - **Errors**: conversions into MCP-compatible errors so handlers can
//!   use the `?` operator
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{json_success, McpError};
//! use rmcp::model::CallToolResult;
//!
//! fn my_tool(&self) -> Result<CallToolResult, McpError> {
//!     let data = get_some_data();
//!     json_success(&data)
//! }
//! ```

pub mod error;
pub mod init;
pub mod result;

// Re-export commonly used items at crate root
pub use error::{internal_error, invalid_params, IntoMcpError, McpResult, ResultExt};
pub use init::init_tracing;
pub use result::{json_success, text_success};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content, Tool},
    ErrorData as McpError,
};
