use clap::{Parser, ValueEnum};

/// jobscrape - Scrape job vacancies from Indeed UK into JSON or SQLite
#[derive(Parser, Debug, Clone)]
#[command(name = "jobscrape")]
#[command(author = "Zack Adlington")]
#[command(version = "0.1.0")]
#[command(about = "A web scraper for Indeed.co.uk", long_about = None)]
pub struct Args {
    /// String to search for, e.g. "Python developer"
    #[arg(required = true, value_name = "WHAT")]
    pub what: String,

    /// City or location to search in, e.g. "London"
    #[arg(required = true, value_name = "WHERE")]
    pub location: String,

    /// Attempt to find the location of each vacancy by company name, location and city
    #[arg(short, long, default_value_t = false)]
    pub geocode: bool,

    /// Google Maps credential used for geocoding
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Where to write the results
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Directory for the JSON report
    #[arg(long, default_value = ".")]
    pub out_dir: String,

    /// SQLite database path
    #[arg(long, default_value = "jobs.db")]
    pub db: String,

    /// Root of the job site
    #[arg(long, default_value = "https://www.indeed.co.uk")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[arg(short = 't', long, default_value_t = 5)]
    pub timeout: u64,

    /// Attempts per request before giving up
    #[arg(long, default_value_t = 5)]
    pub max_retries: u32,

    /// Stop after this many result pages
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Pause between result pages in milliseconds
    #[arg(long, default_value_t = 500)]
    pub page_delay_ms: u64,

    /// Verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Sqlite,
}

pub fn parse_args() -> Args {
    Args::parse()
}
