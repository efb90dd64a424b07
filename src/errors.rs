use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Symbol not found: {0}")]
    NotFound(String),

    #[error("Fetch error for {symbol}: {cause}")]
    FetchError {
        symbol: String,
        #[source]
        cause: Box<DashboardError>,
    },

    #[error("Invalid comparison: cannot compare {0} with itself")]
    InvalidComparison(String),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Insufficient data for {0}")]
    InsufficientData(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl DashboardError {
    /// Wraps a transport or parse fault with the symbol it happened for.
    /// `NotFound` and already-wrapped errors pass through unchanged.
    pub fn for_symbol(self, symbol: &str) -> Self {
        match self {
            e @ DashboardError::NotFound(_)
            | e @ DashboardError::FetchError { .. }
            | e @ DashboardError::InvalidSymbol(_) => e,
            other => DashboardError::FetchError {
                symbol: symbol.to_string(),
                cause: Box::new(other),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DashboardError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl From<String> for DashboardError {
    fn from(s: String) -> Self {
        DashboardError::ProviderError(s)
    }
}

impl From<&str> for DashboardError {
    fn from(s: &str) -> Self {
        DashboardError::ProviderError(s.to_string())
    }
}
