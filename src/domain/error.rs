//! Domain error types.

/// Top-level error type for quantscan.
#[derive(Debug, thiserror::Error)]
pub enum QuantscanError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("computation failed for {code}: {reason}")]
    Computation { code: String, reason: String },

    #[error("analysis of {code} exceeded {secs}s")]
    Timeout { code: String, secs: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantscanError {
    /// Provider-side failures that make a symbol skippable rather than fatal.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            QuantscanError::NoData { .. }
                | QuantscanError::InsufficientData { .. }
                | QuantscanError::Database { .. }
                | QuantscanError::DatabaseQuery { .. }
                | QuantscanError::Io(_)
        )
    }
}

impl From<&QuantscanError> for std::process::ExitCode {
    fn from(err: &QuantscanError) -> Self {
        let code: u8 = match err {
            QuantscanError::Io(_) => 1,
            QuantscanError::ConfigParse { .. }
            | QuantscanError::ConfigMissing { .. }
            | QuantscanError::ConfigInvalid { .. } => 2,
            QuantscanError::Database { .. } | QuantscanError::DatabaseQuery { .. } => 3,
            QuantscanError::NoData { .. } | QuantscanError::InsufficientData { .. } => 5,
            QuantscanError::Computation { .. } | QuantscanError::Timeout { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
