//! Domain error types.

/// A parse error with position information for strategy expressions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for stratsafe.
#[derive(Debug, thiserror::Error)]
pub enum StratsafeError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("strategy rejected: {reason}")]
    Rejected { reason: String },

    #[error("strategy text is not sanitized: {reason}")]
    Untrusted { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratsafeError> for std::process::ExitCode {
    fn from(err: &StratsafeError) -> Self {
        let code: u8 = match err {
            StratsafeError::Io(_) => 1,
            StratsafeError::ConfigParse { .. }
            | StratsafeError::ConfigMissing { .. }
            | StratsafeError::ConfigInvalid { .. } => 2,
            StratsafeError::Data { .. } | StratsafeError::NoData { .. } => 3,
            StratsafeError::Parse(_)
            | StratsafeError::Rejected { .. }
            | StratsafeError::Untrusted { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
