//! Domain error types.
//!
//! Only fail-fast conditions live here: bad configuration, malformed input
//! data, and unrecoverable provider failures. Sessions without a trade are
//! reported through [`crate::domain::simulator::SkipReason`] instead.

/// Top-level error type for orbtrader.
#[derive(Debug, thiserror::Error)]
pub enum OrbError {
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

    #[error("incomplete OHLCV data, missing columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("unparsable timestamp at row {row}: {value:?}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("invalid {column} value at row {row}: {value:?}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("no bars available from {origin}")]
    EmptySeries { origin: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("provider error: {reason}")]
    Provider { reason: String },

    #[error("provider fetch failed ({primary}); CSV fallback failed ({fallback})")]
    FetchFailed { primary: String, fallback: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OrbError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        OrbError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data(reason: impl Into<String>) -> Self {
        OrbError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&OrbError> for std::process::ExitCode {
    fn from(err: &OrbError) -> Self {
        let code: u8 = match err {
            OrbError::Io(_) => 1,
            OrbError::ConfigParse { .. }
            | OrbError::ConfigMissing { .. }
            | OrbError::ConfigInvalid { .. } => 2,
            OrbError::MissingColumns { .. }
            | OrbError::InvalidTimestamp { .. }
            | OrbError::InvalidValue { .. }
            | OrbError::Data { .. } => 3,
            OrbError::Provider { .. } | OrbError::FetchFailed { .. } => 4,
            OrbError::EmptySeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
