use anyhow::Result;
use async_trait::async_trait;
use config_manager::EbirdConfig;
use reqwest::Client;
use species_core::{NearbyQuery, Observation, ObservationSource, SurveyError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum EbirdError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Error: {0}")]
    Status(u16),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<EbirdError> for SurveyError {
    fn from(err: EbirdError) -> Self {
        match err {
            // Non-200 statuses are reported uniformly; 401/429/500 are not
            // distinguished from each other.
            EbirdError::Status(code) => SurveyError::UpstreamStatus(code),
            EbirdError::InvalidResponse(msg) => SurveyError::InvalidData(msg),
            other => SurveyError::Fetch(other.to_string()),
        }
    }
}

/// eBird API client for the recent-nearby-observations endpoint.
#[derive(Debug, Clone)]
pub struct EbirdClient {
    config: EbirdConfig,
    http_client: Client,
}

impl EbirdClient {
    pub fn new(config: EbirdConfig, api_key: String) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            config: EbirdConfig { api_key, ..config },
            http_client,
        })
    }

    pub fn config(&self) -> &EbirdConfig {
        &self.config
    }

    /// Fetch recent observations near a point.
    ///
    /// Issues one GET to `/data/obs/geo/recent` with the credential in the
    /// `X-eBirdApiToken` header. Coordinates and radius are passed through
    /// without local range validation; the service decides how to treat
    /// out-of-range values.
    pub async fn recent_observations(
        &self,
        query: &NearbyQuery,
    ) -> std::result::Result<Vec<Observation>, EbirdError> {
        let url = format!("{}/data/obs/geo/recent", self.config.api_base_url);

        debug!(
            lat = query.latitude,
            lng = query.longitude,
            radius_miles = query.radius_miles,
            "Fetching recent observations from eBird"
        );

        let response = self
            .http_client
            .get(&url)
            .header("X-eBirdApiToken", &self.config.api_key)
            .query(&[
                ("lat", query.latitude.to_string()),
                ("lng", query.longitude.to_string()),
                ("maxDistance", query.radius_miles.to_string()),
                ("numResults", query.max_results.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EbirdError::Status(status.as_u16()));
        }

        let observations: Vec<Observation> = response.json().await?;
        info!(
            "Retrieved {} recent observations from eBird",
            observations.len()
        );
        Ok(observations)
    }
}

#[async_trait]
impl ObservationSource for EbirdClient {
    async fn recent_nearby(
        &self,
        query: &NearbyQuery,
    ) -> std::result::Result<Vec<Observation>, SurveyError> {
        self.recent_observations(query).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EbirdConfig {
        EbirdConfig {
            api_key: String::new(),
            api_base_url: "https://api.ebird.org/v2".to_string(),
            request_timeout_seconds: 30,
        }
    }

    #[test]
    fn test_client_keeps_provided_api_key() {
        let client = EbirdClient::new(test_config(), "test-key".to_string()).unwrap();
        assert_eq!(client.config().api_key, "test-key");
        assert_eq!(client.config().api_base_url, "https://api.ebird.org/v2");
    }

    #[test]
    fn test_status_error_carries_numeric_code() {
        let err = EbirdError::Status(403);
        assert!(err.to_string().contains("403"));

        match SurveyError::from(EbirdError::Status(403)) {
            SurveyError::UpstreamStatus(code) => assert_eq!(code, 403),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_statuses_map_uniformly() {
        for code in [401u16, 429, 500] {
            match SurveyError::from(EbirdError::Status(code)) {
                SurveyError::UpstreamStatus(mapped) => assert_eq!(mapped, code),
                other => panic!("unexpected mapping for {code}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_observation_array() {
        let json = r#"[
            {"speciesCode": "amecro", "comName": "American Crow", "obsDt": "2025-08-14 09:12", "howMany": 2},
            {"speciesCode": "blujay", "comName": "Blue Jay", "obsDt": "2025-08-14 09:30"}
        ]"#;
        let observations: Vec<Observation> = serde_json::from_str(json).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].species_code, "amecro");
        assert_eq!(observations[1].how_many, None);
    }
}
