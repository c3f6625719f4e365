//! MCP Server implementation for declarative project actions
//!
//! The tool list is dynamic, one tool per configured action plus the
//! optional prompt retrieval tool, so this implements `ServerHandler`
//! directly instead of the static `#[tool_router]` macro. Everything the
//! handlers share is immutable after construction; the server clones
//! cheaply and serves concurrent requests without locking.

use std::sync::Arc;

use mcp_common::McpError;
use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, GetPromptRequestParam, GetPromptResult,
        ListPromptsResult, ListToolsResult, PaginatedRequestParam, Prompt, PromptArgument,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::json;

use crate::config::{Action, ServerConfig};
use crate::env::EnvSnapshot;
use crate::handlers;
use crate::prompts;
use crate::sandbox::ProjectSandbox;

/// Name of the auxiliary prompt retrieval tool
pub const GET_PROMPT_TOOL: &str = "get_prompt";

/// The Actions MCP Server
#[derive(Clone)]
pub struct ActionsMcpServer {
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) env: EnvSnapshot,
    pub(crate) sandbox: ProjectSandbox,
    pub(crate) disable_prompt_tool: bool,
    tools: Arc<Vec<Tool>>,
}

impl ActionsMcpServer {
    /// Create a server from a validated config and startup environment
    ///
    /// The outward tool list is built here, once; it never changes while
    /// serving.
    pub fn new(
        config: ServerConfig,
        env: EnvSnapshot,
        sandbox: ProjectSandbox,
        disable_prompt_tool: bool,
    ) -> Self {
        let tools = build_tools(&config, disable_prompt_tool);
        Self {
            config: Arc::new(config),
            env,
            sandbox,
            disable_prompt_tool,
            tools: Arc::new(tools),
        }
    }

    /// The tools exposed through discovery
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    fn list_tools_result(&self) -> ListToolsResult {
        ListToolsResult {
            tools: self.tools.as_ref().clone(),
            next_cursor: None,
            meta: None,
        }
    }

    /// The native prompt listing always shows every prompt; the exposure
    /// filter only applies to the retrieval tool.
    fn list_prompts_result(&self) -> ListPromptsResult {
        let prompts = self
            .config
            .prompts
            .iter()
            .map(|p| {
                let arguments: Vec<PromptArgument> = p
                    .arguments
                    .iter()
                    .map(|a| PromptArgument {
                        name: a.name.clone(),
                        title: None,
                        description: a.description.clone(),
                        required: Some(a.required),
                    })
                    .collect();
                Prompt::new(
                    p.name.clone(),
                    Some(p.description.clone()),
                    (!arguments.is_empty()).then_some(arguments),
                )
            })
            .collect();

        ListPromptsResult {
            prompts,
            next_cursor: None,
            meta: None,
        }
    }
}

fn build_tools(config: &ServerConfig, disable_prompt_tool: bool) -> Vec<Tool> {
    let mut tools: Vec<Tool> = config.actions.iter().map(action_tool).collect();

    let exposed = prompts::exposed_prompts(config, disable_prompt_tool);
    if !exposed.is_empty() {
        tools.push(prompt_retrieval_tool(&exposed));
    }

    tools
}

/// Build the outward tool definition for one action
///
/// Only caller-settable parameters appear; env-var parameters are resolved
/// server-side and are deliberately invisible to the caller.
fn action_tool(action: &Action) -> Tool {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for param in action
        .parameters
        .iter()
        .filter(|p| p.kind.caller_settable())
    {
        let mut schema = serde_json::Map::new();
        schema.insert("type".to_string(), json!("string"));
        schema.insert(
            "description".to_string(),
            json!(param
                .description
                .clone()
                .unwrap_or_else(|| format!("Parameter {}", param.name))),
        );
        if let Some(default) = &param.default {
            schema.insert("default".to_string(), json!(default));
        } else {
            required.push(param.name.clone());
        }
        properties.insert(param.name.clone(), serde_json::Value::Object(schema));
    }

    let input_schema = json!({
        "type": "object",
        "properties": properties,
        "required": required,
    });

    Tool::new(
        action.name.clone(),
        action.description.clone(),
        Arc::new(input_schema.as_object().cloned().unwrap_or_default()),
    )
}

fn prompt_retrieval_tool(exposed: &[&crate::config::Prompt]) -> Tool {
    let prompt_list = exposed
        .iter()
        .map(|p| format!("- {}: {}", p.name, p.description))
        .collect::<Vec<_>>()
        .join("\n");
    let description = format!(
        "Get a prompt designed for this codebase. The prompts include:\n{}",
        prompt_list
    );

    let names: Vec<&str> = exposed.iter().map(|p| p.name.as_str()).collect();
    let input_schema = json!({
        "type": "object",
        "properties": {
            "prompt_name": {
                "type": "string",
                "description": "The name of the prompt to retrieve",
                "enum": names,
            }
        },
        "required": ["prompt_name"],
    });

    Tool::new(
        GET_PROMPT_TOOL.to_string(),
        description,
        Arc::new(input_schema.as_object().cloned().unwrap_or_default()),
    )
}

// ============================================================================
// Server Handler Implementation
// ============================================================================

impl rmcp::ServerHandler for ActionsMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "{}. Actions run as direct child processes inside the project \
                 root, never through a shell, with per-action timeouts.",
                self.config.server_description
            )),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(self.list_tools_result())
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        handlers::call_tool(self, request).await
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(self.list_prompts_result())
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        handlers::get_prompt(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Parameter, ParameterType, Prompt as ConfigPrompt,
        PromptArgument as ConfigPromptArgument,
    };
    use crate::template::CommandTemplate;

    fn test_action() -> Action {
        Action {
            name: "one_test".to_string(),
            description: "Run one test".to_string(),
            template: CommandTemplate::parse("pytest $TEST_PATH -k $FILTER").unwrap(),
            parameters: vec![
                Parameter {
                    name: "TEST_PATH".to_string(),
                    kind: ParameterType::ProjectFilePath,
                    description: Some("Test file".to_string()),
                    default: None,
                },
                Parameter {
                    name: "FILTER".to_string(),
                    kind: ParameterType::InsecureString,
                    description: None,
                    default: Some("".to_string()),
                },
                Parameter {
                    name: "API_KEY".to_string(),
                    kind: ParameterType::RequiredEnvVar,
                    description: None,
                    default: None,
                },
            ],
            run_path: None,
            timeout_secs: 60,
        }
    }

    fn test_prompt(name: &str) -> ConfigPrompt {
        ConfigPrompt {
            name: name.to_string(),
            description: "a prompt".to_string(),
            content: "content".to_string(),
            arguments: Vec::new(),
        }
    }

    fn test_config(filter: Option<Vec<String>>) -> ServerConfig {
        ServerConfig {
            server_name: "test".to_string(),
            server_description: "test server".to_string(),
            actions: vec![test_action()],
            prompts: vec![test_prompt("alpha"), test_prompt("beta")],
            get_prompt_tool_filter: filter,
        }
    }

    #[test]
    fn env_parameters_never_appear_in_the_tool_schema() {
        let tools = build_tools(&test_config(None), false);
        let schema = serde_json::to_value(tools[0].input_schema.as_ref()).unwrap();

        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("TEST_PATH"));
        assert!(properties.contains_key("FILTER"));
        assert!(!properties.contains_key("API_KEY"));
    }

    #[test]
    fn parameters_without_defaults_are_required() {
        let tools = build_tools(&test_config(None), false);
        let schema = serde_json::to_value(tools[0].input_schema.as_ref()).unwrap();

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["TEST_PATH"]);
        assert_eq!(
            schema["properties"]["FILTER"]["default"],
            serde_json::json!("")
        );
    }

    #[test]
    fn get_prompt_tool_is_listed_when_prompts_are_exposed() {
        let tools = build_tools(&test_config(None), false);
        assert!(tools.iter().any(|t| t.name == GET_PROMPT_TOOL));
    }

    #[test]
    fn empty_filter_removes_the_get_prompt_tool_from_discovery() {
        // Prompts still exist (and stay natively listed); only the tool goes.
        let tools = build_tools(&test_config(Some(Vec::new())), false);
        assert!(!tools.iter().any(|t| t.name == GET_PROMPT_TOOL));
    }

    #[test]
    fn launcher_flag_removes_the_get_prompt_tool() {
        let tools = build_tools(&test_config(None), true);
        assert!(!tools.iter().any(|t| t.name == GET_PROMPT_TOOL));
    }

    fn test_server(
        filter: Option<Vec<String>>,
        disable_prompt_tool: bool,
    ) -> (tempfile::TempDir, ActionsMcpServer) {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let server = ActionsMcpServer::new(
            test_config(filter),
            EnvSnapshot::default(),
            sandbox,
            disable_prompt_tool,
        );
        (dir, server)
    }

    #[test]
    fn tool_listing_matches_the_precomputed_tools() {
        let (_dir, server) = test_server(None, false);
        let listing = server.list_tools_result();
        assert_eq!(listing.tools.len(), server.tools().len());
        assert!(listing.next_cursor.is_none());
    }

    #[test]
    fn native_prompt_listing_is_never_filtered() {
        // An empty filter removes the retrieval tool, not the native listing.
        let (_dir, server) = test_server(Some(Vec::new()), false);
        let listing = server.list_prompts_result();
        let names: Vec<&str> = listing.prompts.iter().map(|p| p.name.as_ref()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn listed_prompt_arguments_carry_their_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let mut config = test_config(None);
        config.prompts[0].arguments = vec![ConfigPromptArgument {
            name: "FILE".to_string(),
            description: Some("File under review".to_string()),
            required: true,
        }];
        let server = ActionsMcpServer::new(config, EnvSnapshot::default(), sandbox, false);

        let listing = server.list_prompts_result();
        let args = listing.prompts[0].arguments.as_ref().unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].name, "FILE");
        assert_eq!(args[0].required, Some(true));
        assert!(listing.prompts[1].arguments.is_none());
    }

    #[test]
    fn filter_narrows_the_retrieval_tool_enum() {
        let tools = build_tools(&test_config(Some(vec!["beta".to_string()])), false);
        let tool = tools.iter().find(|t| t.name == GET_PROMPT_TOOL).unwrap();
        let schema = serde_json::to_value(tool.input_schema.as_ref()).unwrap();
        let names = schema["properties"]["prompt_name"]["enum"].as_array().unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0], "beta");
    }
}
