use crate::salary::SalaryRange;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One scraped job vacancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub company: Option<String>,
    pub raw_location: String,
    pub raw_salary: Option<String>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub mid_salary: Option<f64>,
    pub detail_url: String,
    pub description: String,
    pub search_term_what: String,
    pub search_term_where: String,
    pub geocoded_location: Option<Coordinates>,
}

impl Listing {
    pub fn new(title: String, detail_url: String, what: &str, location_term: &str) -> Self {
        Self {
            title,
            company: None,
            raw_location: String::new(),
            raw_salary: None,
            min_salary: None,
            max_salary: None,
            mid_salary: None,
            detail_url,
            description: String::new(),
            search_term_what: what.to_string(),
            search_term_where: location_term.to_string(),
            geocoded_location: None,
        }
    }

    pub fn set_salary(&mut self, range: SalaryRange) {
        self.min_salary = range.min;
        self.max_salary = range.max;
        self.mid_salary = range.mid;
    }
}
