use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,
    ConfigParseFailed,

    ValidationInvalidArgument,

    PrivilegeRootNotAllowed,

    ToolNotFound,
    ToolNotFunctional,
    NotifierUnavailable,

    GateNotSupportedEnvironment,
    GateTagsNotSatisfied,

    DiscoveryNoContentRoots,

    ProcessTimeout,
    ProcessLaunchFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigParseFailed => "config.parse_failed",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::PrivilegeRootNotAllowed => "privilege.root_not_allowed",

            ErrorCode::ToolNotFound => "tool.not_found",
            ErrorCode::ToolNotFunctional => "tool.not_functional",
            ErrorCode::NotifierUnavailable => "notify.unavailable",

            ErrorCode::GateNotSupportedEnvironment => "gate.not_supported_environment",
            ErrorCode::GateTagsNotSatisfied => "gate.tags_not_satisfied",

            ErrorCode::DiscoveryNoContentRoots => "discovery.no_content_roots",

            ErrorCode::ProcessTimeout => "process.timeout",
            ErrorCode::ProcessLaunchFailed => "process.launch_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// Conditions that stop the whole run before any maintenance happens.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            ErrorCode::PrivilegeRootNotAllowed
                | ErrorCode::ToolNotFound
                | ErrorCode::ToolNotFunctional
                | ErrorCode::GateNotSupportedEnvironment
                | ErrorCode::GateTagsNotSatisfied
                | ErrorCode::DiscoveryNoContentRoots
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigParseFailedDetails {
    pub path: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsNotSatisfiedDetails {
    pub required: Vec<String>,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFailureDetails {
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            value,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = serde_json::json!({
            "path": path.into(),
            "error": err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_parse_failed(
        path: impl Into<String>,
        error: impl Into<String>,
        line: Option<usize>,
    ) -> Self {
        let path = path.into();
        let error = error.into();
        let message = match line {
            Some(line) => format!("Issue loading Apache config {}:{}: {}", path, line, error),
            None => format!("Issue loading Apache config {}: {}", path, error),
        };

        Self::new(
            ErrorCode::ConfigParseFailed,
            message,
            to_details(ConfigParseFailedDetails { path, error, line }),
        )
    }

    pub fn root_not_allowed() -> Self {
        Self::new(
            ErrorCode::PrivilegeRootNotAllowed,
            "Running as root is not allowed. Check --help.",
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Re-run as the site owner, or pass --allow-root if you really mean it")
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        Self::new(
            ErrorCode::ToolNotFound,
            format!("\"{}\" command does not seem to be in PATH", tool),
            serde_json::json!({ "tool": tool }),
        )
        .with_hint("Try --path-to-wpcli to set it manually, or install WP-CLI: https://wp-cli.org/#installing")
    }

    pub fn tool_not_functional(path: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ToolNotFunctional,
            "No executable for wp-cli or provided one is invalid",
            serde_json::json!({ "path": path.into(), "output": output.into() }),
        )
    }

    pub fn notifier_unavailable(command: impl Into<String>) -> Self {
        let command = command.into();
        Self::new(
            ErrorCode::NotifierUnavailable,
            format!("--hume specified but cannot locate the '{}' client", command),
            serde_json::json!({ "command": command }),
        )
        .with_hint("You might need to install and configure humed. Check https://github.com/buanzo/hume/wiki")
    }

    pub fn not_supported_environment(required_field: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GateNotSupportedEnvironment,
            "Required tags only work on DigitalOcean",
            serde_json::json!({ "requiredField": required_field.into() }),
        )
    }

    pub fn tags_not_satisfied(details: TagsNotSatisfiedDetails) -> Self {
        Self::new(
            ErrorCode::GateTagsNotSatisfied,
            "Droplet lacks indicated tag requirements",
            to_details(details),
        )
    }

    pub fn no_content_roots(sources: Vec<String>) -> Self {
        Self::new(
            ErrorCode::DiscoveryNoContentRoots,
            "No Apache2 DocumentRoots found. Check paths.",
            serde_json::json!({ "sources": sources }),
        )
    }

    pub fn process_timeout(details: ProcessFailureDetails) -> Self {
        let message = format!(
            "{} timed out after {}s",
            details.program,
            details.timeout_secs.unwrap_or_default()
        );
        Self::new(ErrorCode::ProcessTimeout, message, to_details(details))
    }

    pub fn process_launch_failed(details: ProcessFailureDetails) -> Self {
        let message = format!(
            "Failed to start {}: {}",
            details.program,
            details.error.as_deref().unwrap_or("unknown error")
        );
        Self::new(ErrorCode::ProcessLaunchFailed, message, to_details(details))
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": error.into(),
            "context": context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in codes::all_codes() {
            assert!(seen.insert(code.as_str()), "duplicate code {}", code.as_str());
        }
    }

    #[test]
    fn tags_not_satisfied_serializes_missing_tags() {
        let err = Error::tags_not_satisfied(TagsNotSatisfiedDetails {
            required: vec!["prod".to_string(), "wp".to_string()],
            present: vec!["prod".to_string()],
            missing: vec!["wp".to_string()],
        });

        assert_eq!(err.code.as_str(), "gate.tags_not_satisfied");
        assert_eq!(err.details["missing"], serde_json::json!(["wp"]));
    }

    #[test]
    fn abort_codes_cover_preflight_failures() {
        assert!(ErrorCode::PrivilegeRootNotAllowed.is_abort());
        assert!(ErrorCode::DiscoveryNoContentRoots.is_abort());
        assert!(!ErrorCode::ProcessTimeout.is_abort());
        assert!(!ErrorCode::ConfigParseFailed.is_abort());
    }

    #[test]
    fn root_not_allowed_carries_hint() {
        let err = Error::root_not_allowed();
        assert_eq!(err.hints.len(), 1);
        assert!(err.hints[0].message.contains("--allow-root"));
    }
}
