//! Declarative configuration loading and validation
//!
//! Parses the YAML schema into an immutable [`ServerConfig`]. Validation is
//! a single pass that aggregates every structural problem into one
//! [`ConfigError`] instead of failing on the first, and command templates
//! are tokenized here, once, so call time never re-parses a raw string.
//! Prompt file references are resolved, boundary-checked against the project
//! root, and read eagerly.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::env::EnvSnapshot;
use crate::sandbox::ProjectSandbox;
use crate::template::CommandTemplate;
use crate::types::{ConfigError, StartupEnvError};

pub const DEFAULT_SERVER_NAME: &str = "ActionsMCP";
pub const DEFAULT_SERVER_DESCRIPTION: &str =
    "Project-specific development tools and prompts exposed via MCP";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const MAX_PROMPT_NAME_LEN: usize = 32;
const MAX_PROMPT_DESCRIPTION_LEN: usize = 256;

// ============================================================================
// Domain Types
// ============================================================================

/// The closed set of parameter types
///
/// Closed on purpose: each variant carries its own validation rule, and a
/// new type has to be added to this enum and matched everywhere before the
/// server will accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// A path validated to exist inside the project root
    ProjectFilePath,
    /// Resolved from the environment snapshot; must be present at startup
    RequiredEnvVar,
    /// Resolved from the environment snapshot; empty or default when absent
    OptionalEnvVar,
    /// Passed through verbatim; made safe by argv placement, not filtering
    InsecureString,
}

impl ParameterType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "project_file_path" => Some(Self::ProjectFilePath),
            "required_env_var" => Some(Self::RequiredEnvVar),
            "optional_env_var" => Some(Self::OptionalEnvVar),
            "insecure_string" => Some(Self::InsecureString),
            _ => None,
        }
    }

    /// Whether the caller may supply a value for this parameter
    ///
    /// Env-var parameters are never caller-settable and never appear in the
    /// outward tool schema.
    pub fn caller_settable(self) -> bool {
        matches!(self, Self::ProjectFilePath | Self::InsecureString)
    }
}

/// A typed, named input substituted into an action's command
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterType,
    pub description: Option<String>,
    pub default: Option<String>,
}

/// A named, invokable command definition
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub description: String,
    pub template: CommandTemplate,
    pub parameters: Vec<Parameter>,
    /// Resolved absolute working directory, inside the project root
    pub run_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

/// Declared argument of a prompt; metadata only, never substituted here
#[derive(Debug, Clone)]
pub struct PromptArgument {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

/// A reusable prompt with its content loaded at config time
#[derive(Debug, Clone)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub content: String,
    pub arguments: Vec<PromptArgument>,
}

/// The immutable action/prompt catalog
///
/// Constructed once at startup and shared by reference across all request
/// handlers; never mutated afterwards, so concurrent reads need no locking.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_name: String,
    pub server_description: String,
    pub actions: Vec<Action>,
    pub prompts: Vec<Prompt>,
    /// Exposure filter for the auxiliary get_prompt tool. `None` exposes all
    /// prompts, an empty list removes the tool from discovery entirely.
    pub get_prompt_tool_filter: Option<Vec<String>>,
}

// ============================================================================
// Raw Schema (serde side)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    server_name: Option<String>,
    server_description: Option<String>,
    #[serde(default)]
    actions: Vec<RawAction>,
    prompts: Option<Vec<RawPrompt>>,
    get_prompt_tool_filter: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    name: Option<String>,
    description: Option<String>,
    command: Option<String>,
    #[serde(default)]
    parameters: Vec<RawParameter>,
    run_path: Option<String>,
    timeout: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParameter {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    default: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPrompt {
    name: Option<String>,
    description: Option<String>,
    prompt: Option<String>,
    #[serde(rename = "prompt-file")]
    prompt_file: Option<String>,
    #[serde(default)]
    arguments: Vec<RawPromptArgument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPromptArgument {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    required: bool,
}

// ============================================================================
// Loading & Validation
// ============================================================================

fn valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn valid_parameter_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ServerConfig {
    /// Load and validate the configuration file
    ///
    /// `sandbox` is the project-root boundary; prompt files and run paths
    /// must resolve inside it. All structural problems are aggregated into
    /// the returned [`ConfigError`].
    pub fn load(config_path: &Path, sandbox: &ProjectSandbox) -> Result<Self, ConfigError> {
        let raw_text = std::fs::read_to_string(config_path).map_err(|e| {
            ConfigError::single(format!(
                "failed to read configuration file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let raw: RawConfig = serde_yaml::from_str(&raw_text).map_err(|e| {
            ConfigError::single(format!(
                "failed to parse YAML file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        Self::validate(raw, config_dir, sandbox)
    }

    fn validate(
        raw: RawConfig,
        config_dir: &Path,
        sandbox: &ProjectSandbox,
    ) -> Result<Self, ConfigError> {
        let mut problems = Vec::new();

        let mut actions = Vec::new();
        let mut action_names = HashSet::new();
        for (i, raw_action) in raw.actions.into_iter().enumerate() {
            // Duplicate detection works off the declared name, so a duplicate
            // is still reported when the entry fails its other checks.
            let declared = raw_action.name.clone();
            let action = validate_action(i, raw_action, sandbox, &mut problems);
            if let Some(name) = declared {
                if !action_names.insert(name.clone()) {
                    problems.push(format!("duplicate action name '{}'", name));
                }
            }
            if let Some(action) = action {
                actions.push(action);
            }
        }

        let mut prompts = Vec::new();
        let mut prompt_names = HashSet::new();
        for (i, raw_prompt) in raw.prompts.unwrap_or_default().into_iter().enumerate() {
            let declared = raw_prompt.name.clone();
            let prompt = validate_prompt(i, raw_prompt, config_dir, sandbox, &mut problems);
            if let Some(name) = declared {
                if !prompt_names.insert(name.clone()) {
                    problems.push(format!("duplicate prompt name '{}'", name));
                }
            }
            if let Some(prompt) = prompt {
                prompts.push(prompt);
            }
        }

        if let Some(filter) = &raw.get_prompt_tool_filter {
            for name in filter {
                if !prompt_names.contains(name) {
                    problems.push(format!(
                        "prompt '{}' in get_prompt_tool_filter not found in prompts list",
                        name
                    ));
                }
            }
        }

        if !problems.is_empty() {
            return Err(ConfigError::new(problems));
        }

        Ok(Self {
            server_name: raw
                .server_name
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            server_description: raw
                .server_description
                .unwrap_or_else(|| DEFAULT_SERVER_DESCRIPTION.to_string()),
            actions,
            prompts,
            get_prompt_tool_filter: raw.get_prompt_tool_filter,
        })
    }

    /// Every `required_env_var` parameter name declared across all actions
    pub fn required_env_vars(&self) -> BTreeSet<&str> {
        self.actions
            .iter()
            .flat_map(|a| a.parameters.iter())
            .filter(|p| p.kind == ParameterType::RequiredEnvVar)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Startup gate: fail before serving if any required variable is absent
    ///
    /// All missing names are reported together.
    pub fn check_required_env(&self, env: &EnvSnapshot) -> Result<(), StartupEnvError> {
        let missing: Vec<String> = self
            .required_env_vars()
            .into_iter()
            .filter(|name| !env.contains(name))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StartupEnvError { missing })
        }
    }
}

fn validate_action(
    index: usize,
    raw: RawAction,
    sandbox: &ProjectSandbox,
    problems: &mut Vec<String>,
) -> Option<Action> {
    let label = match &raw.name {
        Some(name) => format!("action '{}'", name),
        None => format!("action[{}]", index),
    };

    let mut ok = true;

    let name = match raw.name {
        Some(name) if valid_name(&name) => name,
        Some(name) => {
            problems.push(format!(
                "{}: name '{}' contains invalid characters (allowed: letters, digits, '_', '-', starting with a letter)",
                label, name
            ));
            ok = false;
            name
        }
        None => {
            problems.push(format!("{}: 'name' is required", label));
            ok = false;
            String::new()
        }
    };

    let description = match raw.description {
        Some(d) => d,
        None => {
            problems.push(format!("{}: 'description' is required", label));
            ok = false;
            String::new()
        }
    };

    let template = match raw.command.as_deref() {
        Some(command) => match CommandTemplate::parse(command) {
            Ok(template) => Some(template),
            Err(e) => {
                problems.push(format!("{}: invalid command: {}", label, e));
                ok = false;
                None
            }
        },
        None => {
            problems.push(format!("{}: 'command' is required", label));
            ok = false;
            None
        }
    };

    let mut parameters = Vec::new();
    let mut parameter_names = HashSet::new();
    for (pi, raw_param) in raw.parameters.into_iter().enumerate() {
        let param_label = match &raw_param.name {
            Some(name) => format!("{}, parameter '{}'", label, name),
            None => format!("{}, parameter[{}]", label, pi),
        };

        let Some(param_name) = raw_param.name else {
            problems.push(format!("{}: 'name' is required", param_label));
            ok = false;
            continue;
        };
        if !valid_parameter_name(&param_name) {
            problems.push(format!(
                "{}: parameter names must match [A-Za-z_][A-Za-z0-9_]*",
                param_label
            ));
            ok = false;
        }
        if !parameter_names.insert(param_name.clone()) {
            problems.push(format!(
                "{}: duplicate parameter name '{}'",
                label, param_name
            ));
            ok = false;
        }

        let kind = match raw_param.kind.as_deref() {
            Some(kind_str) => match ParameterType::parse(kind_str) {
                Some(kind) => kind,
                None => {
                    problems.push(format!(
                        "{}: invalid type '{}'. Valid types are: project_file_path, required_env_var, optional_env_var, insecure_string",
                        param_label, kind_str
                    ));
                    ok = false;
                    continue;
                }
            },
            None => {
                problems.push(format!("{}: 'type' is required", param_label));
                ok = false;
                continue;
            }
        };

        parameters.push(Parameter {
            name: param_name,
            kind,
            description: raw_param.description,
            default: raw_param.default,
        });
    }

    // Every placeholder in the template must name a declared parameter.
    if let Some(template) = &template {
        for placeholder in template.placeholder_names() {
            if !parameters.iter().any(|p| p.name == placeholder) {
                problems.push(format!(
                    "{}: command references undeclared parameter '${}'",
                    label, placeholder
                ));
                ok = false;
            }
        }
    }

    let timeout_secs = match raw.timeout {
        None => DEFAULT_TIMEOUT_SECS,
        Some(t) if t > 0 => t as u64,
        Some(t) => {
            problems.push(format!("{}: timeout must be positive, got {}", label, t));
            ok = false;
            DEFAULT_TIMEOUT_SECS
        }
    };

    let run_path = match raw.run_path.as_deref() {
        None => None,
        Some(value) => match sandbox.resolve("run_path", value) {
            Ok(resolved) if resolved.is_dir() => Some(resolved),
            Ok(resolved) => {
                problems.push(format!(
                    "{}: run_path '{}' is not a directory",
                    label,
                    resolved.display()
                ));
                ok = false;
                None
            }
            Err(e) => {
                problems.push(format!("{}: {}", label, e));
                ok = false;
                None
            }
        },
    };

    if !ok {
        return None;
    }

    Some(Action {
        name,
        description,
        template: template?,
        parameters,
        run_path,
        timeout_secs,
    })
}

fn validate_prompt(
    index: usize,
    raw: RawPrompt,
    config_dir: &Path,
    sandbox: &ProjectSandbox,
    problems: &mut Vec<String>,
) -> Option<Prompt> {
    let label = match &raw.name {
        Some(name) => format!("prompt '{}'", name),
        None => format!("prompt[{}]", index),
    };

    let mut ok = true;

    let name = match raw.name {
        Some(name) => {
            if !valid_name(&name) {
                problems.push(format!(
                    "{}: name '{}' contains invalid characters",
                    label, name
                ));
                ok = false;
            }
            if name.len() > MAX_PROMPT_NAME_LEN {
                problems.push(format!(
                    "{}: name exceeds {} character limit",
                    label, MAX_PROMPT_NAME_LEN
                ));
                ok = false;
            }
            name
        }
        None => {
            problems.push(format!("{}: 'name' is required", label));
            ok = false;
            String::new()
        }
    };

    let description = match raw.description {
        Some(d) => {
            if d.len() > MAX_PROMPT_DESCRIPTION_LEN {
                problems.push(format!(
                    "{}: description exceeds {} character limit",
                    label, MAX_PROMPT_DESCRIPTION_LEN
                ));
                ok = false;
            }
            d
        }
        None => {
            problems.push(format!("{}: 'description' is required", label));
            ok = false;
            String::new()
        }
    };

    let content = match (raw.prompt, raw.prompt_file) {
        (Some(_), Some(_)) => {
            problems.push(format!(
                "{}: cannot specify both 'prompt' and 'prompt-file'",
                label
            ));
            ok = false;
            None
        }
        (None, None) => {
            problems.push(format!(
                "{}: must specify either 'prompt' or 'prompt-file'",
                label
            ));
            ok = false;
            None
        }
        (Some(text), None) => Some(text),
        (None, Some(file)) => {
            // Resolve relative to the config file, then apply the same
            // project-root boundary as every other path.
            let candidate = if Path::new(&file).is_absolute() {
                file.clone()
            } else {
                config_dir.join(&file).to_string_lossy().into_owned()
            };
            match sandbox.resolve("prompt-file", &candidate) {
                Ok(resolved) => match std::fs::read_to_string(&resolved) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        problems.push(format!(
                            "{}: failed to read prompt file '{}': {}",
                            label, file, e
                        ));
                        ok = false;
                        None
                    }
                },
                Err(e) => {
                    problems.push(format!("{}: {}", label, e));
                    ok = false;
                    None
                }
            }
        }
    };

    let mut arguments = Vec::new();
    for (ai, raw_arg) in raw.arguments.into_iter().enumerate() {
        match raw_arg.name {
            Some(arg_name) => arguments.push(PromptArgument {
                name: arg_name,
                description: raw_arg.description,
                required: raw_arg.required,
            }),
            None => {
                problems.push(format!(
                    "{}, argument[{}]: 'name' is required",
                    label, ai
                ));
                ok = false;
            }
        }
    }

    if !ok {
        return None;
    }

    Some(Prompt {
        name,
        description,
        content: content?,
        arguments,
    })
}
