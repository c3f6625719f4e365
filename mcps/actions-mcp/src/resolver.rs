//! Parameter resolution
//!
//! Turns caller-supplied arguments into the validated name-to-value map a
//! command template renders from. One rule per parameter type; the type set
//! is closed, so adding a new kind means an explicit new match arm here.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::{Action, ParameterType};
use crate::env::EnvSnapshot;
use crate::sandbox::ProjectSandbox;
use crate::types::ValidationError;

/// Resolve every declared parameter of `action`
///
/// Caller arguments are only consulted for caller-settable types; values the
/// caller supplies under an env-var parameter's name are ignored outright.
/// Project file paths come back canonicalized and boundary-checked.
pub fn resolve_parameters(
    action: &Action,
    args: Option<&serde_json::Map<String, Value>>,
    env: &EnvSnapshot,
    sandbox: &ProjectSandbox,
) -> Result<HashMap<String, String>, ValidationError> {
    let mut resolved = HashMap::new();

    for param in &action.parameters {
        let value = match param.kind {
            ParameterType::RequiredEnvVar => {
                // Presence is guaranteed by the startup gate; treat absence
                // as a missing parameter rather than panicking if the gate
                // was somehow bypassed.
                env.get(&param.name)
                    .map(str::to_string)
                    .ok_or_else(|| ValidationError::MissingParameter(param.name.clone()))?
            }
            ParameterType::OptionalEnvVar => env
                .get(&param.name)
                .map(str::to_string)
                .or_else(|| param.default.clone())
                .unwrap_or_default(),
            ParameterType::ProjectFilePath => {
                let raw = caller_value(args, &param.name)
                    .or_else(|| param.default.clone())
                    .ok_or_else(|| ValidationError::MissingParameter(param.name.clone()))?;
                let canonical = sandbox.resolve(&param.name, &raw)?;
                canonical.to_string_lossy().into_owned()
            }
            ParameterType::InsecureString => caller_value(args, &param.name)
                .or_else(|| param.default.clone())
                .ok_or_else(|| ValidationError::MissingParameter(param.name.clone()))?,
        };

        resolved.insert(param.name.clone(), value);
    }

    Ok(resolved)
}

/// Caller-supplied value for `name`, stringified
///
/// JSON strings pass through verbatim; other scalars use their JSON
/// rendering. `null` counts as absent.
fn caller_value(args: Option<&serde_json::Map<String, Value>>, name: &str) -> Option<String> {
    match args?.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Parameter;
    use crate::template::CommandTemplate;
    use serde_json::json;

    fn action_with(parameters: Vec<Parameter>) -> Action {
        Action {
            name: "test".to_string(),
            description: "test action".to_string(),
            template: CommandTemplate::parse("true").unwrap(),
            parameters,
            run_path: None,
            timeout_secs: 60,
        }
    }

    fn param(name: &str, kind: ParameterType, default: Option<&str>) -> Parameter {
        Parameter {
            name: name.to_string(),
            kind,
            description: None,
            default: default.map(str::to_string),
        }
    }

    fn args(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn insecure_string_passes_through_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let action = action_with(vec![param("MSG", ParameterType::InsecureString, None)]);
        let caller = args(json!({"MSG": "anything; $(even) `this`"}));

        let resolved = resolve_parameters(
            &action,
            Some(&caller),
            &EnvSnapshot::default(),
            &sandbox,
        )
        .unwrap();
        assert_eq!(resolved["MSG"], "anything; $(even) `this`");
    }

    #[test]
    fn default_is_used_when_caller_omits_value() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let action = action_with(vec![param(
            "MODE",
            ParameterType::InsecureString,
            Some("fast"),
        )]);

        let resolved =
            resolve_parameters(&action, None, &EnvSnapshot::default(), &sandbox).unwrap();
        assert_eq!(resolved["MODE"], "fast");
    }

    #[test]
    fn missing_parameter_without_default_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let action = action_with(vec![param("MSG", ParameterType::InsecureString, None)]);

        let err =
            resolve_parameters(&action, None, &EnvSnapshot::default(), &sandbox).unwrap_err();
        assert!(matches!(err, ValidationError::MissingParameter(name) if name == "MSG"));
    }

    #[test]
    fn project_file_path_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let action = action_with(vec![param("FILE", ParameterType::ProjectFilePath, None)]);
        let caller = args(json!({"FILE": "./main.rs"}));

        let resolved = resolve_parameters(
            &action,
            Some(&caller),
            &EnvSnapshot::default(),
            &sandbox,
        )
        .unwrap();
        assert!(resolved["FILE"].ends_with("main.rs"));
        assert!(std::path::Path::new(&resolved["FILE"]).is_absolute());
    }

    #[test]
    fn project_file_path_escape_fails() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("project");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(parent.path().join("etc_passwd"), "x").unwrap();
        let sandbox = ProjectSandbox::new(&root).unwrap();
        let action = action_with(vec![param("FILE", ParameterType::ProjectFilePath, None)]);
        let caller = args(json!({"FILE": "../etc_passwd"}));

        let err = resolve_parameters(
            &action,
            Some(&caller),
            &EnvSnapshot::default(),
            &sandbox,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::PathEscapesProject { .. }));
    }

    #[test]
    fn env_parameters_ignore_caller_values() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let action = action_with(vec![param("API_KEY", ParameterType::RequiredEnvVar, None)]);
        let env = EnvSnapshot::from_pairs([("API_KEY", "real-value")]);
        // The caller tries to override; the snapshot wins.
        let caller = args(json!({"API_KEY": "attacker-value"}));

        let resolved = resolve_parameters(&action, Some(&caller), &env, &sandbox).unwrap();
        assert_eq!(resolved["API_KEY"], "real-value");
    }

    #[test]
    fn optional_env_var_falls_back_to_default_then_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();

        let action = action_with(vec![
            param("WITH_DEFAULT", ParameterType::OptionalEnvVar, Some("dft")),
            param("NO_DEFAULT", ParameterType::OptionalEnvVar, None),
        ]);
        let resolved =
            resolve_parameters(&action, None, &EnvSnapshot::default(), &sandbox).unwrap();
        assert_eq!(resolved["WITH_DEFAULT"], "dft");
        assert_eq!(resolved["NO_DEFAULT"], "");

        let env = EnvSnapshot::from_pairs([("WITH_DEFAULT", "from-env")]);
        let resolved = resolve_parameters(&action, None, &env, &sandbox).unwrap();
        assert_eq!(resolved["WITH_DEFAULT"], "from-env");
    }

    #[test]
    fn non_string_scalars_are_stringified() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = ProjectSandbox::new(dir.path()).unwrap();
        let action = action_with(vec![param("COUNT", ParameterType::InsecureString, None)]);
        let caller = args(json!({"COUNT": 42}));

        let resolved = resolve_parameters(
            &action,
            Some(&caller),
            &EnvSnapshot::default(),
            &sandbox,
        )
        .unwrap();
        assert_eq!(resolved["COUNT"], "42");
    }
}
