//! Domain error types.

/// Top-level error type for stockdash.
#[derive(Debug, thiserror::Error)]
pub enum StockdashError {
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

    #[error("backend request failed: {reason}")]
    Backend { reason: String },

    #[error("backend returned {status}: {message}")]
    BackendStatus { status: u16, message: String },

    #[error("invalid ticker: {ticker:?}")]
    InvalidTicker { ticker: String },

    #[error("invalid period {value:?}, expected one of: {expected}")]
    InvalidPeriod { value: String, expected: String },

    #[error("invalid interval {value:?}, expected one of: {expected}")]
    InvalidInterval { value: String, expected: String },

    #[error("invalid indicator {spec:?}: {reason}")]
    InvalidIndicator { spec: String, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {candles} candles, need {minimum}")]
    InsufficientData {
        ticker: String,
        candles: usize,
        minimum: usize,
    },

    #[error("CSV error in {file} line {line}: {reason}")]
    Csv {
        file: String,
        line: u64,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockdashError> for std::process::ExitCode {
    fn from(err: &StockdashError) -> Self {
        let code: u8 = match err {
            StockdashError::Io(_) | StockdashError::Csv { .. } => 1,
            StockdashError::ConfigParse { .. }
            | StockdashError::ConfigMissing { .. }
            | StockdashError::ConfigInvalid { .. } => 2,
            StockdashError::Database { .. } | StockdashError::DatabaseQuery { .. } => 3,
            StockdashError::InvalidTicker { .. }
            | StockdashError::InvalidPeriod { .. }
            | StockdashError::InvalidInterval { .. }
            | StockdashError::InvalidIndicator { .. }
            | StockdashError::InvalidParameter { .. } => 4,
            StockdashError::NoData { .. } | StockdashError::InsufficientData { .. } => 5,
            StockdashError::Backend { .. } | StockdashError::BackendStatus { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
