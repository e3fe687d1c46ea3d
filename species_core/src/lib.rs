use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Error: {0}")]
    UpstreamStatus(u16),
    #[error("Observation fetch error: {0}")]
    Fetch(String),
    #[error("Invalid observation data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, SurveyError>;

/// One recent-observation record as returned by the eBird API.
///
/// Only `speciesCode` is required; every other documented field is optional
/// and unknown fields are skipped during deserialization. Aggregation reads
/// nothing but the species code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    #[serde(rename = "speciesCode")]
    pub species_code: String,

    #[serde(rename = "comName", skip_serializing_if = "Option::is_none")]
    pub com_name: Option<String>,

    #[serde(rename = "sciName", skip_serializing_if = "Option::is_none")]
    pub sci_name: Option<String>,

    #[serde(rename = "locName", skip_serializing_if = "Option::is_none")]
    pub loc_name: Option<String>,

    /// Observation timestamp as reported by eBird ("YYYY-MM-DD HH:MM").
    #[serde(rename = "obsDt", skip_serializing_if = "Option::is_none")]
    pub obs_dt: Option<String>,

    #[serde(rename = "howMany", skip_serializing_if = "Option::is_none")]
    pub how_many: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    #[serde(rename = "locationPrivate", skip_serializing_if = "Option::is_none")]
    pub location_private: Option<bool>,
}

/// Search parameters for a recent-nearby observation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in miles. Passed through to the API unvalidated; the
    /// service may cap it.
    pub radius_miles: i64,
    /// Result-count hint forwarded to the API.
    pub max_results: i64,
}

/// Capability for fetching recent observations near a point.
///
/// The HTTP client implements this; tests substitute a fake so aggregation
/// can be exercised deterministically.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn recent_nearby(&self, query: &NearbyQuery) -> Result<Vec<Observation>>;
}

/// Per-species observation counts, built by iterating sightings.
///
/// First-seen insertion order is preserved so that ranking's stable sort
/// leaves equal-count species in the order they were first observed. That
/// tie order is implementation-defined, not a contract.
#[derive(Debug, Clone, Default)]
pub struct SpeciesTally {
    counts: HashMap<String, u64>,
    order: Vec<String>,
}

impl SpeciesTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut tally = Self::new();
        for obs in observations {
            tally.record(&obs.species_code);
        }
        tally
    }

    pub fn record(&mut self, species_code: &str) {
        match self.counts.get_mut(species_code) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(species_code.to_string(), 1);
                self.order.push(species_code.to_string());
            }
        }
    }

    pub fn count(&self, species_code: &str) -> u64 {
        self.counts.get(species_code).copied().unwrap_or(0)
    }

    /// Number of distinct species recorded.
    pub fn distinct_species(&self) -> usize {
        self.order.len()
    }

    /// Sum of all counts, equal to the number of recorded observations.
    pub fn total_observations(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries in first-observed order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, u64)> {
        self.order
            .iter()
            .map(|code| (code.as_str(), self.counts[code]))
    }
}

/// Rank species codes by descending observation count and keep the top N.
///
/// Equal counts keep first-observed order (stable sort). A zero or negative
/// `top_n` yields an empty list; a `top_n` beyond the number of distinct
/// species yields all of them.
pub fn rank_top_species(tally: &SpeciesTally, top_n: i64) -> Vec<String> {
    if top_n <= 0 {
        return Vec::new();
    }

    let mut entries: Vec<(&str, u64)> = tally.entries().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    entries
        .into_iter()
        .take(top_n as usize)
        .map(|(code, _)| code.to_string())
        .collect()
}

/// Fetch recent nearby observations once, tally by species, and return the
/// top `top_n` species codes by descending count.
///
/// Upstream failures surface as a tagged error rather than an empty list, so
/// callers can tell "no sightings" apart from "request failed".
pub async fn fetch_top_species<S: ObservationSource>(
    source: &S,
    query: &NearbyQuery,
    top_n: i64,
) -> Result<Vec<String>> {
    let observations = source.recent_nearby(query).await?;
    debug!(
        observations = observations.len(),
        "tallying species from recent observations"
    );

    let tally = SpeciesTally::from_observations(&observations);
    debug!(
        distinct_species = tally.distinct_species(),
        "ranking species tally"
    );

    Ok(rank_top_species(&tally, top_n))
}
