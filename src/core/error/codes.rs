use super::ErrorCode;

pub fn all_codes() -> &'static [ErrorCode] {
    &[
        ErrorCode::ConfigInvalidJson,
        ErrorCode::ConfigInvalidValue,
        ErrorCode::ConfigParseFailed,
        ErrorCode::ValidationInvalidArgument,
        ErrorCode::PrivilegeRootNotAllowed,
        ErrorCode::ToolNotFound,
        ErrorCode::ToolNotFunctional,
        ErrorCode::NotifierUnavailable,
        ErrorCode::GateNotSupportedEnvironment,
        ErrorCode::GateTagsNotSatisfied,
        ErrorCode::DiscoveryNoContentRoots,
        ErrorCode::ProcessTimeout,
        ErrorCode::ProcessLaunchFailed,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
        ErrorCode::InternalUnexpected,
    ]
}
