use crate::config::Config;
use crate::error::Result;
use crate::extractor::{extract_description, JobCard, ResultsPage};
use crate::fetcher::PageSource;
use crate::listing::Listing;
use crate::progress::{progress_bar, set_known_length};
use crate::salary::parse_salary;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Offset step between result pages
pub const PAGE_SIZE: usize = 10;

/// Walks the result pages of one search and collects every listing
pub struct Crawler<'a, S: PageSource> {
    source: &'a S,
    base_url: Url,
    what: String,
    location: String,
    max_pages: Option<usize>,
    page_delay: Duration,
}

/// Where the loop stands after finishing a page
#[derive(Debug, Clone, Copy)]
struct PageOutcome {
    collected: usize,
    total: Option<usize>,
    has_next: bool,
    new_listings: usize,
    pages_fetched: usize,
}

impl PageOutcome {
    fn is_last(&self, max_pages: Option<usize>) -> bool {
        if let Some(total) = self.total {
            if self.collected >= total {
                debug!("Reached reported total of {}", total);
                return true;
            }
        }
        if !self.has_next {
            debug!("No next page");
            return true;
        }
        if self.new_listings == 0 {
            debug!("Page produced no new listings");
            return true;
        }
        max_pages.is_some_and(|max| self.pages_fetched >= max)
    }
}

impl<'a, S: PageSource> Crawler<'a, S> {
    pub fn new(source: &'a S, config: &Config) -> Self {
        Crawler {
            source,
            base_url: config.base_url.clone(),
            what: config.what.clone(),
            location: config.location.clone(),
            max_pages: config.max_pages,
            page_delay: config.page_delay,
        }
    }

    /// Run the pagination loop to completion.
    pub async fn run(&self) -> Result<Vec<Listing>> {
        let mut listings: Vec<Listing> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut total: Option<usize> = None;
        let mut start = 0;
        let mut pages_fetched = 0;

        let progress = progress_bar(None, "Scraping");

        loop {
            let url = search_url(&self.base_url, &self.what, &self.location, start)?;
            debug!("Fetching results page {}", url);

            let html = self.source.fetch_html(&url).await?;
            let page = ResultsPage::parse(&html, &self.base_url);
            pages_fetched += 1;

            if total.is_none() {
                if let Some(reported) = page.total_results {
                    info!("Site reports {} vacancies", reported);
                    set_known_length(&progress, reported as u64);
                    total = Some(reported);
                }
            }

            if page.cards.is_empty() {
                debug!("Results page at offset {} has no listings", start);
                break;
            }

            let mut new_listings = 0;
            for card in page.cards {
                if !seen.insert(card.detail_url.to_string()) {
                    debug!("Already collected {}", card.detail_url);
                    continue;
                }
                listings.push(self.build_listing(card).await?);
                new_listings += 1;
                progress.inc(1);
            }

            let outcome = PageOutcome {
                collected: listings.len(),
                total,
                has_next: page.has_next,
                new_listings,
                pages_fetched,
            };
            if outcome.is_last(self.max_pages) {
                break;
            }

            start += PAGE_SIZE;
            self.pause().await;
        }

        progress.finish_and_clear();
        info!(
            "Collected {} listings from {} result pages",
            listings.len(),
            pages_fetched
        );
        Ok(listings)
    }

    async fn build_listing(&self, card: JobCard) -> Result<Listing> {
        let mut listing = Listing::new(
            card.title,
            card.detail_url.to_string(),
            &self.what,
            &self.location,
        );
        listing.company = card.company;
        listing.raw_location = card.location;

        match parse_salary(card.salary.as_deref()) {
            Ok(range) => listing.set_salary(range),
            Err(e) => warn!(
                "Salary unavailable for '{}' ({:?}): {}",
                listing.title, card.salary, e
            ),
        }
        listing.raw_salary = card.salary;

        let detail_html = self.source.fetch_html(&card.detail_url).await?;
        match extract_description(&detail_html) {
            Some(description) => listing.description = description,
            None => warn!("No description found at {}", card.detail_url),
        }

        Ok(listing)
    }

    async fn pause(&self) {
        if self.page_delay.is_zero() {
            return;
        }
        let base = self.page_delay.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        tokio::time::sleep(Duration::from_millis(base + jitter)).await;
    }
}

/// Build `{base}/jobs?q={what}&l={where}&start={start}`.
pub fn search_url(base: &Url, what: &str, location: &str, start: usize) -> Result<Url> {
    let mut url = base.join("/jobs")?;
    url.query_pairs_mut()
        .append_pair("q", what)
        .append_pair("l", location)
        .append_pair("start", &start.to_string());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::error::ScrapeError;
    use clap::Parser;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const BASE: &str = "https://www.indeed.co.uk";

    /// Serves canned pages and records every request
    struct FakeSite {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSite {
        fn new() -> Self {
            FakeSite {
                pages: HashMap::new(),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn results(mut self, start: usize, html: String) -> Self {
            let url = search_url(&Url::parse(BASE).unwrap(), "rust", "Bristol", start).unwrap();
            self.pages.insert(url.to_string(), html);
            self
        }

        fn detail(mut self, jk: &str, description: &str) -> Self {
            self.pages.insert(
                format!("{}/viewjob?jk={}", BASE, jk),
                format!(r#"<div id="jobDescriptionText"><p>{}</p></div>"#, description),
            );
            self
        }

        fn result_requests(&self) -> usize {
            self.requests
                .borrow()
                .iter()
                .filter(|url| url.contains("/jobs?"))
                .count()
        }
    }

    impl PageSource for FakeSite {
        async fn fetch_html(&self, url: &Url) -> Result<String> {
            self.requests.borrow_mut().push(url.to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| ScrapeError::Status {
                    url: url.to_string(),
                    status: reqwest::StatusCode::NOT_FOUND,
                })
        }
    }

    fn card(jk: &str, title: &str, salary: Option<&str>) -> String {
        let salary = salary
            .map(|s| format!(r#"<span class="salaryText">{}</span>"#, s))
            .unwrap_or_default();
        format!(
            r#"<div class="jobsearch-SerpJobCard">
                <h2 class="title"><a class="jobtitle" href="/viewjob?jk={jk}" title="{title}">{title}</a></h2>
                <div class="sjcl"><span class="company">Acme</span><span class="location">Bristol</span></div>
                {salary}
            </div>"#
        )
    }

    fn results_page(total: Option<usize>, cards: &[String], has_next: bool) -> String {
        let count = total
            .map(|t| format!(r#"<div id="searchCountPages">Page 1 of {} jobs</div>"#, t))
            .unwrap_or_default();
        let next = if has_next {
            r#"<span class="np">Next »</span>"#
        } else {
            ""
        };
        format!("<html><body>{}{}{}</body></html>", count, cards.join("\n"), next)
    }

    fn config(extra: &[&str]) -> Config {
        let mut argv = vec!["jobscrape", "rust", "Bristol", "--page-delay-ms", "0"];
        argv.extend_from_slice(extra);
        Config::from_args(&Args::try_parse_from(argv).unwrap()).unwrap()
    }

    #[test]
    fn test_search_url_encodes_terms() {
        let url = search_url(&Url::parse(BASE).unwrap(), "python developer", "St Albans", 20).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.indeed.co.uk/jobs?q=python+developer&l=St+Albans&start=20"
        );
    }

    #[tokio::test]
    async fn test_stops_when_reported_total_reached() {
        let site = FakeSite::new()
            .results(0, results_page(Some(3), &[card("a", "A", None), card("b", "B", None)], true))
            .results(10, results_page(Some(3), &[card("c", "C", None)], true))
            .detail("a", "first")
            .detail("b", "second")
            .detail("c", "third");

        let config = config(&[]);
        let listings = Crawler::new(&site, &config).run().await.unwrap();

        assert_eq!(listings.len(), 3);
        assert_eq!(site.result_requests(), 2);
        assert_eq!(listings[2].description, "third");
    }

    #[tokio::test]
    async fn test_stops_without_next_affordance() {
        let site = FakeSite::new()
            .results(0, results_page(None, &[card("a", "A", None)], true))
            .results(10, results_page(None, &[card("b", "B", None)], false))
            .detail("a", "x")
            .detail("b", "y");

        let config = config(&[]);
        let listings = Crawler::new(&site, &config).run().await.unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(site.result_requests(), 2);
    }

    #[tokio::test]
    async fn test_stops_when_site_repeats_last_page() {
        // Site keeps offering "Next" and claims more results than it serves.
        let repeated = results_page(Some(50), &[card("a", "A", None)], true);
        let site = FakeSite::new()
            .results(0, repeated.clone())
            .results(10, repeated)
            .detail("a", "x");

        let config = config(&[]);
        let listings = Crawler::new(&site, &config).run().await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(site.result_requests(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_detail_urls_collected_once() {
        let site = FakeSite::new()
            .results(0, results_page(None, &[card("a", "A", None), card("b", "B", None)], true))
            .results(10, results_page(None, &[card("b", "B", None), card("c", "C", None)], false))
            .detail("a", "x")
            .detail("b", "y")
            .detail("c", "z");

        let config = config(&[]);
        let listings = Crawler::new(&site, &config).run().await.unwrap();

        let urls: Vec<&str> = listings.iter().map(|l| l.detail_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.indeed.co.uk/viewjob?jk=a",
                "https://www.indeed.co.uk/viewjob?jk=b",
                "https://www.indeed.co.uk/viewjob?jk=c",
            ]
        );
    }

    #[tokio::test]
    async fn test_max_pages_limit() {
        let site = FakeSite::new()
            .results(0, results_page(None, &[card("a", "A", None)], true))
            .results(10, results_page(None, &[card("b", "B", None)], true))
            .detail("a", "x")
            .detail("b", "y");

        let config = config(&["--max-pages", "1"]);
        let listings = Crawler::new(&site, &config).run().await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(site.result_requests(), 1);
    }

    #[tokio::test]
    async fn test_salary_and_fields_populated() {
        let site = FakeSite::new()
            .results(
                0,
                results_page(
                    Some(3),
                    &[
                        card("a", "Annual", Some("£30,000 - £40,000 a year")),
                        card("b", "Hourly", Some("£15 an hour")),
                        card("c", "Broken", Some("£ DOE a year")),
                    ],
                    false,
                ),
            )
            .detail("a", "x")
            .detail("b", "y")
            .detail("c", "z");

        let config = config(&[]);
        let listings = Crawler::new(&site, &config).run().await.unwrap();

        assert_eq!(listings[0].company.as_deref(), Some("Acme"));
        assert_eq!(listings[0].raw_location, "Bristol");
        assert_eq!(listings[0].min_salary, Some(30000.0));
        assert_eq!(listings[0].mid_salary, Some(35000.0));
        assert_eq!(listings[0].search_term_what, "rust");

        assert_eq!(listings[1].raw_salary.as_deref(), Some("£15 an hour"));
        assert_eq!(listings[1].mid_salary, None);

        assert_eq!(listings[2].raw_salary.as_deref(), Some("£ DOE a year"));
        assert_eq!(listings[2].min_salary, None);
    }

    #[tokio::test]
    async fn test_failed_detail_fetch_aborts() {
        let site = FakeSite::new()
            .results(0, results_page(Some(1), &[card("a", "A", None)], false));

        let config = config(&[]);
        let result = Crawler::new(&site, &config).run().await;

        assert!(matches!(result, Err(ScrapeError::Status { .. })));
    }

    #[tokio::test]
    async fn test_stops_on_page_without_listings() {
        let site = FakeSite::new()
            .results(0, results_page(None, &[card("a", "A", None)], true))
            .results(10, results_page(None, &[], true))
            .results(20, results_page(None, &[card("b", "B", None)], false))
            .detail("a", "x")
            .detail("b", "y");

        let config = config(&[]);
        let listings = Crawler::new(&site, &config).run().await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(site.result_requests(), 2);
    }

    #[tokio::test]
    async fn test_failed_results_page_aborts() {
        // Page 10 is never served, so its fetch fails.
        let site = FakeSite::new()
            .results(0, results_page(Some(20), &[card("a", "A", None)], true))
            .detail("a", "x");

        let config = config(&[]);
        let result = Crawler::new(&site, &config).run().await;

        match result {
            Err(ScrapeError::Status { url, .. }) => assert!(url.contains("start=10")),
            other => panic!("expected a status error, got {:?}", other.map(|l| l.len())),
        }
        assert_eq!(site.result_requests(), 2);
    }
}
