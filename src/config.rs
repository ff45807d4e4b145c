use crate::cli::{Args, OutputFormat};
use crate::error::{Result, ScrapeError};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub what: String,
    pub location: String,
    pub base_url: Url,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_pages: Option<usize>,
    pub page_delay: Duration,
    pub geocoder: Option<GeocoderSettings>,
    pub output: OutputTarget,
}

/// Exponential backoff for transient request failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct GeocoderSettings {
    pub api_key: String,
    pub endpoint: Url,
    pub region: String,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    Json { dir: PathBuf },
    Sqlite { path: PathBuf },
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let what = args.what.trim().to_string();
        let location = args.location.trim().to_string();
        if what.is_empty() || location.is_empty() {
            return Err(ScrapeError::Config(
                "both a search term and a location are required".to_string(),
            ));
        }

        if args.max_retries == 0 {
            return Err(ScrapeError::Config(
                "--max-retries must be at least 1".to_string(),
            ));
        }

        if args.max_pages == Some(0) {
            return Err(ScrapeError::Config(
                "--max-pages must be at least 1".to_string(),
            ));
        }

        let geocoder = if args.geocode {
            let api_key = args
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    ScrapeError::Config(
                        "Environment variable API_KEY must be set to a Google Maps credential for geocoding."
                            .to_string(),
                    )
                })?;
            Some(GeocoderSettings {
                api_key,
                endpoint: Url::parse(GEOCODE_ENDPOINT)?,
                region: "uk".to_string(),
                delay: Duration::from_millis(200),
            })
        } else {
            None
        };

        let output = match args.output {
            OutputFormat::Json => OutputTarget::Json {
                dir: PathBuf::from(&args.out_dir),
            },
            OutputFormat::Sqlite => OutputTarget::Sqlite {
                path: PathBuf::from(&args.db),
            },
        };

        Ok(Config {
            what,
            location,
            base_url: Url::parse(&args.base_url)?,
            request_timeout: Duration::from_secs(args.timeout),
            retry: RetryPolicy::new(args.max_retries),
            max_pages: args.max_pages,
            page_delay: Duration::from_millis(args.page_delay_ms),
            geocoder,
            output,
        })
    }
}
