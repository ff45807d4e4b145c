use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

lazy_static::lazy_static! {
    static ref CARD_SELECTOR: Selector = Selector::parse("div.jobsearch-SerpJobCard").unwrap();
    static ref TITLE_SELECTOR: Selector = Selector::parse("a.jobtitle").unwrap();
    static ref LINK_SELECTOR: Selector = Selector::parse(".title a[href]").unwrap();
    static ref COMPANY_SELECTOR: Selector = Selector::parse(".sjcl .company").unwrap();
    static ref LOCATION_SELECTOR: Selector = Selector::parse(".location").unwrap();
    static ref SALARY_SELECTOR: Selector = Selector::parse(".salaryText").unwrap();
    static ref COUNT_SELECTOR: Selector = Selector::parse("#searchCountPages").unwrap();
    static ref NEXT_SELECTOR: Selector = Selector::parse("span.np").unwrap();
    static ref DESCRIPTION_SELECTOR: Selector = Selector::parse("#jobDescriptionText").unwrap();
}

/// Summary fields of a listing as shown on a results page
#[derive(Debug, Clone, PartialEq)]
pub struct JobCard {
    pub title: String,
    pub company: Option<String>,
    pub location: String,
    pub salary: Option<String>,
    pub detail_url: Url,
}

/// Everything the pagination loop needs from one results page
#[derive(Debug, Clone, Default)]
pub struct ResultsPage {
    pub total_results: Option<usize>,
    pub has_next: bool,
    pub cards: Vec<JobCard>,
}

impl ResultsPage {
    /// Parse a results page. Cards without a title or a detail link are dropped.
    pub fn parse(html: &str, base_url: &Url) -> Self {
        let document = Html::parse_document(html);

        let cards = document
            .select(&CARD_SELECTOR)
            .filter_map(|card| {
                let parsed = parse_card(card, base_url);
                if parsed.is_none() {
                    warn!("Skipping result card without a title or detail link");
                }
                parsed
            })
            .collect();

        ResultsPage {
            total_results: extract_total_results(&document),
            has_next: has_next_page(&document),
            cards,
        }
    }
}

fn parse_card(card: ElementRef, base_url: &Url) -> Option<JobCard> {
    let title = card.select(&TITLE_SELECTOR).next().and_then(|link| {
        link.value()
            .attr("title")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| non_empty_text(link))
    })?;

    let href = card
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|link| link.value().attr("href"))?;
    let detail_url = match base_url.join(href) {
        Ok(url) => url,
        Err(e) => {
            debug!("Unusable detail link {}: {}", href, e);
            return None;
        }
    };

    Some(JobCard {
        title,
        company: card.select(&COMPANY_SELECTOR).next().and_then(non_empty_text),
        location: card
            .select(&LOCATION_SELECTOR)
            .next()
            .and_then(non_empty_text)
            .unwrap_or_default(),
        salary: card.select(&SALARY_SELECTOR).next().and_then(non_empty_text),
        detail_url,
    })
}

/// Read the total from text like "Page 1 of 1,234 jobs".
fn extract_total_results(document: &Html) -> Option<usize> {
    let text = document
        .select(&COUNT_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>())?;

    let count = text.split_whitespace().nth(3)?.replace(',', "");
    match count.parse() {
        Ok(total) => Some(total),
        Err(_) => {
            warn!("Unreadable result count: {:?}", text.trim());
            None
        }
    }
}

fn has_next_page(document: &Html) -> bool {
    document
        .select(&NEXT_SELECTOR)
        .any(|el| el.text().any(|t| t.contains("Next")))
}

/// Extract the full description text from a listing's detail page
pub fn extract_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let description = document.select(&DESCRIPTION_SELECTOR).next()?;

    let text = description
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Some(text)
}

fn non_empty_text(element: ElementRef) -> Option<String> {
    let text = element.text().collect::<String>().trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
