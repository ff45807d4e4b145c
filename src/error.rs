use thiserror::Error;

/// Errors that abort a scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// The geocoding API rejected a request.
    #[error("geocoding '{query}' failed with status {status}: {message}")]
    Geocode {
        query: String,
        status: String,
        message: String,
    },

    #[error("{0}")]
    Config(String),

    #[error("too many tables for '{prefix}', try dropping some tables")]
    TooManyTables { prefix: String },
}

/// Broad classes of failure, used for the top-level message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    FileSystem,
    Database,
    Geocoding,
    Configuration,
    Unexpected,
}

impl ErrorCategory {
    pub fn message(self) -> &'static str {
        match self {
            ErrorCategory::Network => "Looks like something went wrong with the requests operation...",
            ErrorCategory::FileSystem => "Looks like something went wrong with the file operation...",
            ErrorCategory::Database => "Looks like something went wrong with the database operation...",
            ErrorCategory::Geocoding => "Looks like something went wrong with the geocoding operation...",
            ErrorCategory::Configuration => "Looks like the configuration is incomplete...",
            ErrorCategory::Unexpected => "Unexpected error.",
        }
    }
}

impl ScrapeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScrapeError::Http { .. } | ScrapeError::Status { .. } => ErrorCategory::Network,
            ScrapeError::Io(_) => ErrorCategory::FileSystem,
            ScrapeError::Database(_) | ScrapeError::TooManyTables { .. } => ErrorCategory::Database,
            ScrapeError::Geocode { .. } => ErrorCategory::Geocoding,
            ScrapeError::Config(_) => ErrorCategory::Configuration,
            ScrapeError::Json(_) | ScrapeError::Url(_) => ErrorCategory::Unexpected,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
