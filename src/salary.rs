use regex::Regex;
use thiserror::Error;

lazy_static::lazy_static! {
    // First run of digits, optionally with thousands separators and a decimal part
    static ref AMOUNT_REGEX: Regex = Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap();
}

const RANGE_DELIMITERS: [&str; 2] = [" - ", " – "];

/// Annualised salary derived from the raw text on a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mid: Option<f64>,
}

impl SalaryRange {
    fn annual(low: f64, high: f64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        SalaryRange {
            min: Some(low),
            max: Some(high),
            mid: Some(low + (high - low) / 2.0),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SalaryParseError {
    #[error("no amount found in '{0}'")]
    MissingAmount(String),
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
}

/// Normalise a salary string into an annual range.
///
/// Only annual figures are kept; hourly, daily, weekly and monthly rates
/// yield an empty range rather than being converted.
pub fn parse_salary(raw: Option<&str>) -> Result<SalaryRange, SalaryParseError> {
    let Some(raw) = raw else {
        return Ok(SalaryRange::default());
    };

    if !raw.contains("year") {
        return Ok(SalaryRange::default());
    }

    let split = RANGE_DELIMITERS
        .iter()
        .find_map(|delimiter| raw.split_once(delimiter));

    match split {
        Some((low, high)) => Ok(SalaryRange::annual(parse_amount(low)?, parse_amount(high)?)),
        None => {
            let amount = parse_amount(raw)?;
            Ok(SalaryRange::annual(amount, amount))
        }
    }
}

/// Extract the first amount from text like "£25,000" or "£30,000 a year".
pub fn parse_amount(text: &str) -> Result<f64, SalaryParseError> {
    let token = AMOUNT_REGEX
        .find(text)
        .ok_or_else(|| SalaryParseError::MissingAmount(text.trim().to_string()))?;

    let token = token.as_str().trim_end_matches(',');
    let integral = token.split('.').next().unwrap_or(token);
    if integral.contains(',') && !has_thousands_grouping(integral) {
        return Err(SalaryParseError::InvalidAmount(token.to_string()));
    }

    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| SalaryParseError::InvalidAmount(token.to_string()))
}

fn has_thousands_grouping(integral: &str) -> bool {
    let mut groups = integral.split(',');
    let leading = groups.next().unwrap_or_default();
    (1..=3).contains(&leading.len()) && groups.all(|group| group.len() == 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annual_range() {
        let range = parse_salary(Some("£25,000 - £30,000 a year")).unwrap();
        assert_eq!(range.min, Some(25000.0));
        assert_eq!(range.max, Some(30000.0));
        assert_eq!(range.mid, Some(27500.0));
    }

    #[test]
    fn test_annual_range_with_en_dash() {
        let range = parse_salary(Some("£40,000 – £45,500 a year")).unwrap();
        assert_eq!(range.min, Some(40000.0));
        assert_eq!(range.max, Some(45500.0));
        assert_eq!(range.mid, Some(42750.0));
    }

    #[test]
    fn test_single_annual_amount() {
        let range = parse_salary(Some("£32,000 a year")).unwrap();
        assert_eq!(range.min, Some(32000.0));
        assert_eq!(range.max, Some(32000.0));
        assert_eq!(range.mid, Some(32000.0));
    }

    #[test]
    fn test_prefixed_single_amount() {
        let range = parse_salary(Some("Up to £55,000 a year")).unwrap();
        assert_eq!(range.mid, Some(55000.0));
    }

    #[test]
    fn test_decimal_amount() {
        let range = parse_salary(Some("£21,500.50 a year")).unwrap();
        assert_eq!(range.min, Some(21500.5));
    }

    #[test]
    fn test_non_annual_periods_are_discarded() {
        for raw in [
            "£12 an hour",
            "£350 a day",
            "£500 - £600 a week",
            "£2,000 a month",
            "Competitive",
        ] {
            assert_eq!(parse_salary(Some(raw)).unwrap(), SalaryRange::default(), "{}", raw);
        }
    }

    #[test]
    fn test_absent_salary() {
        assert_eq!(parse_salary(None).unwrap(), SalaryRange::default());
    }

    #[test]
    fn test_inverted_range_is_ordered() {
        let range = parse_salary(Some("£30,000 - £25,000 a year")).unwrap();
        assert_eq!(range.min, Some(25000.0));
        assert_eq!(range.max, Some(30000.0));
        assert_eq!(range.mid, Some(27500.0));
    }

    #[test]
    fn test_malformed_amount_fails() {
        assert_eq!(
            parse_salary(Some("£ negotiable a year")),
            Err(SalaryParseError::MissingAmount("£ negotiable a year".to_string()))
        );
        assert!(parse_salary(Some("£25,000 - DOE a year")).is_err());
    }

    #[test]
    fn test_bad_thousands_grouping_fails() {
        assert_eq!(
            parse_amount("£25,00"),
            Err(SalaryParseError::InvalidAmount("25,00".to_string()))
        );
        assert_eq!(parse_amount("£1,250,000"), Ok(1_250_000.0));
        assert_eq!(parse_amount("£30,000, plus benefits"), Ok(30000.0));
    }

    #[test]
    fn test_mid_lies_between_min_and_max() {
        for (low, high) in [(18000, 22000), (1, 1_000_000), (45000, 45001), (60000, 60000)] {
            let raw = format!("£{} - £{} a year", low, high);
            let range = parse_salary(Some(&raw)).unwrap();
            let (min, mid, max) = (range.min.unwrap(), range.mid.unwrap(), range.max.unwrap());
            assert_eq!(min, low as f64);
            assert_eq!(max, high as f64);
            assert_eq!(mid, (low + high) as f64 / 2.0);
            assert!(min <= mid && mid <= max);
        }
    }
}
