//! Request handlers
//!
//! Dispatch for tool calls and the native prompt surface. Every failure here
//! is a structured per-call error; nothing in this module can take the
//! server down.

use mcp_common::{
    internal_error, invalid_params, json_success, text_success, CallToolResult, McpError,
};
use rmcp::model::{
    CallToolRequestParam, GetPromptRequestParam, GetPromptResult, PromptMessage, PromptMessageRole,
};

use crate::executor;
use crate::prompts;
use crate::resolver;
use crate::server::{ActionsMcpServer, GET_PROMPT_TOOL};
use crate::types::{ExecError, ValidationError};

pub async fn call_tool(
    server: &ActionsMcpServer,
    request: CallToolRequestParam,
) -> Result<CallToolResult, McpError> {
    if request.name == GET_PROMPT_TOOL {
        return get_prompt_tool(server, request.arguments.as_ref());
    }

    let Some(action) = server
        .config
        .actions
        .iter()
        .find(|a| a.name == request.name)
    else {
        return Err(invalid_params(format!("unknown tool: {}", request.name)));
    };

    let resolved = resolver::resolve_parameters(
        action,
        request.arguments.as_ref(),
        &server.env,
        &server.sandbox,
    )
    .map_err(validation_to_mcp)?;

    let argv = action.template.render(&resolved);
    let cwd = action
        .run_path
        .clone()
        .unwrap_or_else(|| server.sandbox.root().to_path_buf());

    tracing::info!(action = %action.name, "executing action");

    let output = executor::run_command(&argv, &cwd, &server.env, action.timeout_secs)
        .await
        .map_err(exec_to_mcp)?;

    if output.timed_out {
        tracing::warn!(
            action = %action.name,
            timeout_secs = action.timeout_secs,
            "action timed out"
        );
    }

    json_success(&output)
}

/// The auxiliary single-shot prompt retrieval tool
///
/// Returns raw, unsubstituted prompt text, honoring the exposure filter even
/// though a filtered-out tool should never be called in the first place.
fn get_prompt_tool(
    server: &ActionsMcpServer,
    args: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Result<CallToolResult, McpError> {
    let name = args
        .and_then(|a| a.get("prompt_name"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid_params("'prompt_name' argument is required"))?;

    if !prompts::prompt_retrievable(&server.config, server.disable_prompt_tool, name) {
        return Err(invalid_params(format!(
            "prompt '{}' is not available through the get_prompt tool",
            name
        )));
    }

    let prompt = prompts::find_prompt(&server.config, name)
        .ok_or_else(|| invalid_params(format!("prompt '{}' not found", name)))?;

    Ok(text_success(prompt.content.clone()))
}

/// Native prompt retrieval surface
///
/// Not gated by the exposure filter, and content goes out verbatim; declared
/// arguments are metadata for the caller, never substituted here.
pub fn get_prompt(
    server: &ActionsMcpServer,
    request: GetPromptRequestParam,
) -> Result<GetPromptResult, McpError> {
    let prompt = prompts::find_prompt(&server.config, &request.name)
        .ok_or_else(|| invalid_params(format!("prompt '{}' not found", request.name)))?;

    Ok(GetPromptResult {
        description: Some(prompt.description.clone()),
        messages: vec![PromptMessage::new_text(
            PromptMessageRole::User,
            prompt.content.clone(),
        )],
    })
}

fn validation_to_mcp(err: ValidationError) -> McpError {
    invalid_params(err.to_string())
}

fn exec_to_mcp(err: ExecError) -> McpError {
    internal_error(err.to_string())
}
