//! Error taxonomy for the acquisition and reconciliation pipeline.
//!
//! Per-city failures (`ExtractionFailure`, `ElementNotFound`,
//! `NavigationTimeout`, `Navigation`, `UnsupportedCity`, `ApiRequestFailed`)
//! are contained by the batch loops. `BrowserUnavailable` is the only error
//! that aborts a whole web batch.

/// All errors produced by the `wxcheck` library.
#[derive(thiserror::Error, Debug)]
pub enum WxError {
    /// Text could not be normalised to a plausible Celsius value.
    #[error("extraction failure: {0}")]
    ExtractionFailure(String),

    /// Every selector in the fallback chain missed.
    #[error("no temperature element matched within {timeout_ms}ms (tried: {tried})")]
    ElementNotFound { tried: String, timeout_ms: u64 },

    /// The page never reached a quiescent state.
    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    /// Navigation failed for a reason other than a timeout.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// The city has no entry in the resolution table.
    #[error("unsupported city: {0}")]
    UnsupportedCity(String),

    /// Non-2xx response or malformed body from the weather API.
    #[error("API request for {city} failed: {reason}")]
    ApiRequestFailed { city: String, reason: String },

    /// The browser session itself could not be acquired.
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WxError {
    /// Whether a web extraction attempt that failed with this error should
    /// be repeated from the fetch step.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WxError::ExtractionFailure(_)
                | WxError::ElementNotFound { .. }
                | WxError::NavigationTimeout { .. }
                | WxError::Navigation(_)
        )
    }
}

impl From<csv::Error> for WxError {
    fn from(e: csv::Error) -> Self {
        WxError::Report(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WxError>;
