//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use serde::Serialize;
use wpkeeper::error::Hint;
use wpkeeper::{Error, ErrorCode, Result};

/// Exit code when `--hume` was requested but the client is missing.
pub const EXIT_NOTIFIER_UNAVAILABLE: i32 = 10;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::NotifierUnavailable => EXIT_NOTIFIER_UNAVAILABLE,

        ErrorCode::PrivilegeRootNotAllowed
        | ErrorCode::ToolNotFound
        | ErrorCode::ToolNotFunctional
        | ErrorCode::GateNotSupportedEnvironment
        | ErrorCode::GateTagsNotSatisfied
        | ErrorCode::DiscoveryNoContentRoots => 1,

        ErrorCode::ConfigParseFailed
        | ErrorCode::ProcessTimeout
        | ErrorCode::ProcessLaunchFailed
        | ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_conditions_exit_with_one() {
        for code in wpkeeper::error::codes::all_codes() {
            if code.is_abort() {
                assert_eq!(exit_code_for_error(*code), 1, "{}", code.as_str());
            }
        }
    }

    #[test]
    fn missing_notifier_has_its_own_exit_code() {
        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(
            Error::notifier_unavailable("hume"),
        ));
        assert_eq!(exit_code, 10);
    }

    #[test]
    fn error_envelope_carries_code_and_hints() {
        let json = CliResponse::<()>::from_error(&Error::root_not_allowed())
            .to_json()
            .unwrap();
        assert!(json.contains("\"code\": \"privilege.root_not_allowed\""));
        assert!(json.contains("--allow-root"));
        assert!(json.contains("\"success\": false"));
    }
}
