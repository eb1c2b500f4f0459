//! Error types shared across vidgen crates.

use std::path::PathBuf;

/// Exit status reported when the user declines a destructive run.
pub const EXIT_DECLINED: u8 = 4;

/// Exit status reported when an external tool was terminated by a signal.
pub const EXIT_TOOL_KILLED: u8 = 5;

/// Top-level error type for vidgen operations.
#[derive(Debug, thiserror::Error)]
pub enum VidgenError {
    #[error("Usage error: {message}")]
    Usage { message: String },

    #[error("Document not found: {path}")]
    DocumentNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{tool} failed with {}", describe_status(.status))]
    ExternalTool { tool: String, status: Option<i32> },

    #[error("Run declined by user")]
    Declined,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VidgenError.
pub type VidgenResult<T> = Result<T, VidgenError>;

impl VidgenError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn external_tool(tool: impl Into<String>, status: Option<i32>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            status,
        }
    }

    /// Process exit status for this error.
    ///
    /// External tool failures propagate the tool's own status verbatim so a
    /// wrapping shell sees the same code the encoder returned.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage { .. } => 1,
            Self::DocumentNotFound { .. } => 2,
            Self::Config { .. } | Self::Yaml(_) => 3,
            Self::Declined => EXIT_DECLINED,
            Self::ExternalTool { status, .. } => match status {
                Some(code) => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
                None => EXIT_TOOL_KILLED,
            },
            Self::Io(_) | Self::Json(_) | Self::Other(_) => 1,
        }
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "termination by signal".to_string(),
    }
}
