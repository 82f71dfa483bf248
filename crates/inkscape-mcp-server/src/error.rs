use inkscape_mcp::InkscapeError;
use rmcp::model::ErrorData;

pub type McpError = ErrorData;

/// Maps core errors onto JSON-RPC error shapes: anything the caller could
/// have avoided is invalid-params, the rest is an internal error.
pub fn to_mcp_error(err: InkscapeError) -> McpError {
    match err {
        InkscapeError::Validation(_) => ErrorData::invalid_params(err.to_string(), None),
        other => ErrorData::internal_error(other.to_string(), None),
    }
}

pub fn invalid_params(message: impl Into<String>) -> McpError {
    ErrorData::invalid_params(message.into(), None)
}
