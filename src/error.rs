//! Failures surfaced by tool calls.
//!
//! Every variant is recovered at the dispatch boundary and turned into an
//! error envelope; none of them propagate out of a tool call.

use crate::agent::AgentError;
use crate::session::SessionError;
use crate::tools::schema::SchemaError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// Caller supplied arguments that violate the tool's schema.
    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments { tool: String, source: SchemaError },

    /// Not connected / already connected.
    #[error(transparent)]
    Session(SessionError),

    /// The agent failed while running the operation.
    #[error(transparent)]
    Agent(AgentError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The handler task died before producing a result.
    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    /// Stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::Session(SessionError::Agent(_)) | ToolError::Agent(_) => "agent",
            ToolError::Session(_) => "precondition",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Internal(_) => "internal",
        }
    }
}

impl From<SessionError> for ToolError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Agent(agent) => ToolError::Agent(agent),
            other => ToolError::Session(other),
        }
    }
}

impl From<AgentError> for ToolError {
    fn from(e: AgentError) -> Self {
        ToolError::Agent(e)
    }
}
