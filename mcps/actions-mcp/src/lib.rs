//! Actions MCP Library
//!
//! MCP server exposing developer-defined project actions and prompts from a
//! declarative YAML config. Actions run as direct child processes, never
//! through a shell; file-path parameters are confined to the project root,
//! env-var parameters stay server-side, and every run carries a hard timeout
//! with sanitized output capture.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use actions_mcp::{ActionsMcpServer, ServerConfig};
//!
//! let config = ServerConfig::load(&config_path, &sandbox)?;
//! let server = ActionsMcpServer::new(config, env, sandbox, false);
//! // Use with in-memory transport or serve via stdio
//! ```

pub mod config;
pub mod env;
pub mod executor;
pub mod handlers;
pub mod prompts;
pub mod resolver;
pub mod sandbox;
pub mod sanitize;
pub mod server;
pub mod template;
pub mod types;

// Re-export main server type
pub use server::ActionsMcpServer;

pub use config::ServerConfig;
pub use env::EnvSnapshot;
pub use sandbox::ProjectSandbox;
