use crate::error::{Result, ScrapeError};
use crate::listing::Listing;
use crate::output::sanitize_identifier;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

/// Attempts at finding an unused table name before giving up
const MAX_TABLE_SUFFIX: u32 = 20;

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a SQLite database
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init()?;
        Ok(db)
    }

    #[cfg(test)]
    fn in_memory() -> Result<Self> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.init()?;
        Ok(db)
    }

    /// Initialize the metadata table
    fn init(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                q_what TEXT NOT NULL,
                q_where TEXT NOT NULL,
                table_name TEXT NOT NULL UNIQUE,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(())
    }

    /// Create a fresh `{what}_{where}_{n}` table for this search and record
    /// it in the metadata table. Returns the table name.
    pub fn create_listing_table(&mut self, what: &str, location: &str) -> Result<String> {
        let prefix = table_prefix(what, location);

        for counter in 0..MAX_TABLE_SUFFIX {
            let table = format!("{}{}", prefix, counter);
            if self.table_exists(&table)? {
                debug!("Table {} exists, trying next suffix", table);
                continue;
            }

            // A dropped table can leave its metadata row behind.
            let tx = self.conn.transaction()?;
            tx.execute(&create_table_sql(&table), [])?;
            tx.execute("DELETE FROM metadata WHERE table_name = ?1", params![table])?;
            tx.execute(
                "INSERT INTO metadata (q_what, q_where, table_name) VALUES (?1, ?2, ?3)",
                params![what, location, table],
            )?;
            tx.commit()?;
            return Ok(table);
        }

        Err(ScrapeError::TooManyTables { prefix })
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let count: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert all listings into `table` in one transaction
    pub fn insert_listings(&mut self, table: &str, listings: &[Listing]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (
                    title, company, salary_raw, salary_min, salary_max, salary_mid,
                    location, latitude, longitude, url, description
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                table
            ))?;

            for listing in listings {
                stmt.execute(params![
                    listing.title,
                    listing.company,
                    listing.raw_salary,
                    listing.min_salary,
                    listing.max_salary,
                    listing.mid_salary,
                    listing.raw_location,
                    listing.geocoded_location.map(|c| c.latitude),
                    listing.geocoded_location.map(|c| c.longitude),
                    listing.detail_url,
                    listing.description,
                ])?;
            }
        }
        tx.commit()?;
        Ok(listings.len())
    }

    /// Get count of rows in a listing table
    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let count: u64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", table),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// `{what}_{where}_` with both terms reduced to letters and digits
fn table_prefix(what: &str, location: &str) -> String {
    let what = sanitize_identifier(what);
    let location = sanitize_identifier(location);
    format!(
        "{}_{}_",
        if what.is_empty() { "jobs" } else { &what },
        if location.is_empty() { "anywhere" } else { &location }
    )
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE \"{}\" (
            job_id INTEGER PRIMARY KEY,
            title TEXT,
            company TEXT,
            salary_raw TEXT,
            salary_min REAL,
            salary_max REAL,
            salary_mid REAL,
            location TEXT,
            latitude REAL,
            longitude REAL,
            url TEXT UNIQUE,
            description TEXT
        )",
        table
    )
}
