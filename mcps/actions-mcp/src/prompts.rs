//! Prompt retrieval and exposure policy
//!
//! Prompt content is loaded once by the config loader; retrieval returns it
//! verbatim. No `{{ARGUMENT}}` substitution happens on the server, that
//! interpretation belongs to the caller. The native prompt listing always
//! shows every prompt; the auxiliary `get_prompt` *tool* is additionally
//! gated by `get_prompt_tool_filter`.

use crate::config::{Prompt, ServerConfig};

/// Look up a prompt by name
pub fn find_prompt<'a>(config: &'a ServerConfig, name: &str) -> Option<&'a Prompt> {
    config.prompts.iter().find(|p| p.name == name)
}

/// Prompts retrievable through the auxiliary `get_prompt` tool
///
/// - no filter: every prompt
/// - empty filter (or the launcher's `--disable-prompt-tool`): none, and the
///   tool is omitted from discovery entirely
/// - non-empty filter: only the named prompts
pub fn exposed_prompts<'a>(
    config: &'a ServerConfig,
    disable_prompt_tool: bool,
) -> Vec<&'a Prompt> {
    if disable_prompt_tool {
        return Vec::new();
    }
    match &config.get_prompt_tool_filter {
        None => config.prompts.iter().collect(),
        Some(filter) => config
            .prompts
            .iter()
            .filter(|p| filter.iter().any(|f| f == &p.name))
            .collect(),
    }
}

/// Call-time enforcement of the exposure policy
///
/// Re-checked even though a filtered tool is not discoverable: discovery and
/// enforcement must not drift apart.
pub fn prompt_retrievable(config: &ServerConfig, disable_prompt_tool: bool, name: &str) -> bool {
    exposed_prompts(config, disable_prompt_tool)
        .iter()
        .any(|p| p.name == name)
}
