use crate::error::Result;
use crate::listing::Listing;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

lazy_static::lazy_static! {
    static ref NON_WORD_REGEX: Regex = Regex::new(r"[\W_]+").unwrap();
}

/// Query metadata plus every collected listing
#[derive(Debug, Serialize, Deserialize)]
pub struct Report {
    pub what: String,
    #[serde(rename = "where")]
    pub location: String,
    pub datetime: String,
    pub content: Vec<Listing>,
}

impl Report {
    pub fn new(what: &str, location: &str, started: DateTime<Local>, content: Vec<Listing>) -> Self {
        Report {
            what: what.to_string(),
            location: location.to_string(),
            datetime: started.to_rfc3339(),
            content,
        }
    }
}

/// Strip everything but letters and digits, for file and table names.
pub fn sanitize_identifier(term: &str) -> String {
    NON_WORD_REGEX.replace_all(term, "").into_owned()
}

/// Write the report to `{date}_{what}_{where}_{n}.json` in `dir`, picking
/// the first `n` that does not exist yet. Returns the path written.
pub fn write_report(report: &Report, dir: &Path, started: DateTime<Local>) -> Result<PathBuf> {
    let stem = format!(
        "{}_{}_{}",
        started.format("%Y%m%d"),
        sanitize_identifier(&report.what),
        sanitize_identifier(&report.location)
    );

    std::fs::create_dir_all(dir)?;

    let mut counter = 0;
    loop {
        let path = dir.join(format!("{}_{}.json", stem, counter));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                serde_json::to_writer(&mut writer, report)?;
                writer.flush()?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("{} exists, trying next suffix", path.display());
                counter += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
