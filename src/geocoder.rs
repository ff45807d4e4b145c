use crate::config::{GeocoderSettings, RetryPolicy};
use crate::error::{Result, ScrapeError};
use crate::fetcher::with_retries;
use crate::listing::{Coordinates, Listing};
use crate::progress::progress_bar;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves free-text places to coordinates
pub trait GeocodeBackend {
    /// `Ok(None)` means the service had no match.
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>>;
}

/// Google Maps Geocoding API client
pub struct GoogleGeocoder {
    client: Client,
    settings: GeocoderSettings,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
    pub fn new(client: Client, settings: GeocoderSettings, retry: RetryPolicy) -> Self {
        GoogleGeocoder {
            client,
            settings,
            retry,
        }
    }

    async fn request(&self, query: &str) -> Result<GeocodeResponse> {
        let mut url = self.settings.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", query)
            .append_pair("region", &self.settings.region)
            .append_pair("key", &self.settings.api_key);

        // The request URL carries the key, so it is stripped from errors.
        let http_err = |source: reqwest::Error| ScrapeError::Http {
            url: self.settings.endpoint.to_string(),
            source: source.without_url(),
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: self.settings.endpoint.to_string(),
                status,
            });
        }

        response.json::<GeocodeResponse>().await.map_err(http_err)
    }
}

impl GeocodeBackend for GoogleGeocoder {
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>> {
        debug!("Geocoding {:?}", query);
        let response = with_retries(&self.retry, query, || self.request(query)).await?;
        interpret_response(query, response)
    }
}

fn interpret_response(query: &str, response: GeocodeResponse) -> Result<Option<Coordinates>> {
    match response.status.as_str() {
        "OK" => Ok(response.results.first().map(|result| Coordinates {
            latitude: result.geometry.location.lat,
            longitude: result.geometry.location.lng,
        })),
        "ZERO_RESULTS" => Ok(None),
        _ => Err(ScrapeError::Geocode {
            query: query.to_string(),
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        }),
    }
}

/// Which strategy placed a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Company,
    Location,
    Region,
    Unresolved,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeocodeStats {
    pub by_company: usize,
    pub by_location: usize,
    pub by_region: usize,
    pub unresolved: usize,
}

impl GeocodeStats {
    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Company => self.by_company += 1,
            Resolution::Location => self.by_location += 1,
            Resolution::Region => self.by_region += 1,
            Resolution::Unresolved => self.unresolved += 1,
        }
    }
}

/// Attaches coordinates to listings, from most to least specific query
pub struct Enricher<'a, G: GeocodeBackend> {
    backend: &'a G,
    delay: Duration,
}

impl<'a, G: GeocodeBackend> Enricher<'a, G> {
    pub fn new(backend: &'a G, delay: Duration) -> Self {
        Enricher { backend, delay }
    }

    /// Geocode every listing. Only a failure to query the search region
    /// itself is fatal; per-listing failures fall through to coarser queries.
    pub async fn enrich(&self, listings: &mut [Listing], region: &str) -> Result<GeocodeStats> {
        let region_coordinates = self.backend.lookup(region).await?;
        if region_coordinates.is_none() {
            warn!("Search region {:?} could not be geocoded, no fallback coordinate", region);
        }

        let mut stats = GeocodeStats::default();
        let count = listings.len();
        let progress = progress_bar(Some(count as u64), "Geocoding");

        for (i, listing) in listings.iter_mut().enumerate() {
            let (coordinates, resolution) = self.locate(listing, region_coordinates).await;
            listing.geocoded_location = coordinates;
            stats.record(resolution);
            progress.inc(1);

            if i + 1 < count && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        progress.finish_and_clear();
        info!(
            "Geocoded {} by company, {} by location, {} by region, {} unresolved",
            stats.by_company, stats.by_location, stats.by_region, stats.unresolved
        );
        Ok(stats)
    }

    async fn locate(
        &self,
        listing: &Listing,
        region: Option<Coordinates>,
    ) -> (Option<Coordinates>, Resolution) {
        let location = listing.raw_location.trim();

        if let Some(company) = listing.company.as_deref() {
            let query = format!("{} {}", company, location);
            if let Some(found) = self.attempt(query.trim()).await {
                return (Some(found), Resolution::Company);
            }
        }

        if !location.is_empty() {
            if let Some(found) = self.attempt(location).await {
                return (Some(found), Resolution::Location);
            }
        }

        match region {
            Some(coordinates) => (Some(coordinates), Resolution::Region),
            None => (None, Resolution::Unresolved),
        }
    }

    async fn attempt(&self, query: &str) -> Option<Coordinates> {
        match self.backend.lookup(query).await {
            Ok(Some(coordinates)) => Some(coordinates),
            Ok(None) => {
                debug!("No geocoding match for {:?}", query);
                None
            }
            Err(e) => {
                warn!("Geocode failed on input {:?}: {}", query, e);
                None
            }
        }
    }
}
