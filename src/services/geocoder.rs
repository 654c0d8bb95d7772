use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::{Coordinate, LocationSource, ResolvedLocation};
use crate::reference::{extract_zip, ReferenceData};
use crate::services::cache::CacheKey;

/// Errors that can occur while resolving a location
///
/// The [`Geocoder`] logs these and moves on to the next strategy; they never
/// reach its callers.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// One step of the resolution chain
///
/// `Ok(None)` means "no answer here, try the next one", the same as an error
/// except that nothing gets logged.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, query: &str) -> Result<Option<ResolvedLocation>, GeocodeError>;
}

/// Geocoding provider connection settings
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    /// Results near this point rank higher
    pub proximity: Coordinate,
    pub country: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

/// Mapbox-style places API
pub struct ProviderResolver {
    config: GeocoderConfig,
    access_token: String,
    client: Client,
    memo: moka::future::Cache<String, ResolvedLocation>,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Deserialize)]
struct PlaceFeature {
    /// `[lng, lat]`
    center: [f64; 2],
    #[serde(default)]
    place_name: String,
}

impl ProviderResolver {
    /// `None` when no access token is configured
    pub fn new(config: GeocoderConfig) -> Result<Option<Self>, GeocodeError> {
        let Some(access_token) = config.access_token.clone().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let client = Client::builder().timeout(config.timeout).build()?;
        let memo = moka::future::CacheBuilder::new(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Some(Self {
            config,
            access_token,
            client,
            memo,
        }))
    }

    async fn query_provider(&self, query: &str) -> Result<Option<ResolvedLocation>, GeocodeError> {
        let url = format!(
            "{}/geocoding/v5/mapbox.places/{}.json",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(query)
        );
        let proximity = format!("{},{}", self.config.proximity.lng, self.config.proximity.lat);

        tracing::debug!("Geocoding '{}' via provider", query);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("proximity", proximity.as_str()),
                ("country", self.config.country.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::ApiError(format!(
                "Geocoding request failed: {}",
                response.status()
            )));
        }

        let body: PlacesResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        let Some(feature) = body.features.into_iter().next() else {
            return Ok(None);
        };

        let [lng, lat] = feature.center;
        let coordinate = Coordinate::new(lat, lng);
        if !coordinate.is_valid() {
            return Err(GeocodeError::InvalidResponse(format!(
                "Provider returned out-of-range center [{}, {}]",
                lng, lat
            )));
        }

        let label = if feature.place_name.is_empty() {
            query.to_string()
        } else {
            feature.place_name
        };

        Ok(Some(ResolvedLocation {
            coordinate,
            label,
            source: LocationSource::Provider,
        }))
    }
}

#[async_trait]
impl LocationResolver for ProviderResolver {
    fn name(&self) -> &'static str {
        "provider"
    }

    async fn resolve(&self, query: &str) -> Result<Option<ResolvedLocation>, GeocodeError> {
        if query.is_empty() {
            return Ok(None);
        }

        let key = CacheKey::geocode(query);
        if let Some(hit) = self.memo.get(&key).await {
            tracing::trace!("Geocode memo hit: {}", key);
            return Ok(Some(hit));
        }

        let resolved = self.query_provider(query).await?;
        if let Some(location) = &resolved {
            self.memo.insert(key, location.clone()).await;
        }
        Ok(resolved)
    }
}

/// City-name then ZIP lookup in the static tables
pub struct StaticTableResolver {
    data: &'static ReferenceData,
}

impl StaticTableResolver {
    pub fn new(data: &'static ReferenceData) -> Self {
        Self { data }
    }

    pub fn lookup(&self, query: &str) -> Option<ResolvedLocation> {
        if let Some(place) = self.data.find_city(query) {
            return Some(ResolvedLocation {
                coordinate: place.coordinate(),
                label: place.label.clone(),
                source: LocationSource::CityTable,
            });
        }

        let zip = extract_zip(query)?;
        self.data.find_zip(zip).map(|place| ResolvedLocation {
            coordinate: place.coordinate(),
            label: place.label.clone(),
            source: LocationSource::ZipTable,
        })
    }
}

impl Default for StaticTableResolver {
    fn default() -> Self {
        Self::new(ReferenceData::embedded())
    }
}

#[async_trait]
impl LocationResolver for StaticTableResolver {
    fn name(&self) -> &'static str {
        "static-table"
    }

    async fn resolve(&self, query: &str) -> Result<Option<ResolvedLocation>, GeocodeError> {
        Ok(self.lookup(query))
    }
}

/// Best-effort free-text geocoder
///
/// Tries each resolver in order and returns the first answer. Failures are
/// logged and absorbed, so the only outcome a caller sees is a location or
/// `None`.
pub struct Geocoder {
    resolvers: Vec<Box<dyn LocationResolver>>,
    timeout: Duration,
}

impl Geocoder {
    /// Provider (when a token is configured) followed by the static tables
    pub fn new(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let timeout = config.timeout;
        let mut resolvers: Vec<Box<dyn LocationResolver>> = Vec::new();

        match ProviderResolver::new(config)? {
            Some(provider) => resolvers.push(Box::new(provider)),
            None => tracing::info!("No geocoding token configured, using static tables only"),
        }
        resolvers.push(Box::new(StaticTableResolver::default()));

        Ok(Self::with_resolvers(resolvers, timeout))
    }

    pub fn with_resolvers(resolvers: Vec<Box<dyn LocationResolver>>, timeout: Duration) -> Self {
        Self { resolvers, timeout }
    }

    /// Static tables only
    pub fn offline() -> Self {
        Self::with_resolvers(vec![Box::new(StaticTableResolver::default())], Duration::from_secs(5))
    }

    pub async fn geocode(&self, text: &str) -> Option<ResolvedLocation> {
        self.geocode_with_cancel(text, &CancellationToken::new()).await
    }

    /// Resolve `text`, returning `None` early if `cancel` fires
    pub async fn geocode_with_cancel(&self, text: &str, cancel: &CancellationToken) -> Option<ResolvedLocation> {
        let query = text.trim();

        for resolver in &self.resolvers {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Geocoding '{}' cancelled", query);
                    return None;
                }
                result = tokio::time::timeout(self.timeout, resolver.resolve(query)) => result,
            };

            match attempt {
                Ok(Ok(Some(location))) => {
                    tracing::debug!("Resolved '{}' via {} to {}", query, resolver.name(), location.label);
                    return Some(location);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => tracing::warn!("Geocoder {} failed for '{}': {}", resolver.name(), query, e),
                Err(_) => tracing::warn!(
                    "Geocoder {} timed out after {:?} for '{}'",
                    resolver.name(),
                    self.timeout,
                    query
                ),
            }
        }

        tracing::info!("Could not resolve location '{}'", query);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingResolver;

    #[async_trait]
    impl LocationResolver for FailingResolver {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn resolve(&self, _query: &str) -> Result<Option<ResolvedLocation>, GeocodeError> {
            Err(GeocodeError::ApiError("503 Service Unavailable".into()))
        }
    }

    struct SlowResolver;

    #[async_trait]
    impl LocationResolver for SlowResolver {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn resolve(&self, _query: &str) -> Result<Option<ResolvedLocation>, GeocodeError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_davidson_resolves_offline() {
        let location = Geocoder::offline().geocode("Davidson").await.unwrap();
        assert_eq!(location.label, "Davidson, NC");
        assert_eq!(location.coordinate, Coordinate::new(35.4993, -80.8481));
        assert_eq!(location.source, LocationSource::CityTable);
    }

    #[tokio::test]
    async fn test_zip_fallback() {
        let location = Geocoder::offline().geocode("somewhere 28115").await.unwrap();
        assert_eq!(location.label, "Mooresville, NC 28115");
        assert_eq!(location.source, LocationSource::ZipTable);
    }

    #[tokio::test]
    async fn test_unresolvable_and_empty() {
        let geocoder = Geocoder::offline();
        assert!(geocoder.geocode("Nowhere Junction").await.is_none());
        assert!(geocoder.geocode("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_failure_falls_through_chain() {
        let geocoder = Geocoder::with_resolvers(
            vec![Box::new(FailingResolver), Box::new(StaticTableResolver::default())],
            Duration::from_secs(1),
        );
        let location = geocoder.geocode("charlotte, nc").await.unwrap();
        assert_eq!(location.label, "Charlotte, NC");
    }

    #[tokio::test]
    async fn test_timeout_falls_through_chain() {
        let geocoder = Geocoder::with_resolvers(
            vec![Box::new(SlowResolver), Box::new(StaticTableResolver::default())],
            Duration::from_millis(100),
        );
        let location = geocoder.geocode("Davidson").await.unwrap();
        assert_eq!(location.source, LocationSource::CityTable);
    }

    #[tokio::test]
    async fn test_cancelled_returns_none() {
        let geocoder = Geocoder::with_resolvers(vec![Box::new(SlowResolver)], Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(geocoder.geocode_with_cancel("Davidson", &cancel).await.is_none());
    }

    #[test]
    fn test_provider_requires_token() {
        let config = GeocoderConfig {
            base_url: "https://api.mapbox.com".to_string(),
            access_token: Some(String::new()),
            proximity: Coordinate::new(35.4993, -80.8481),
            country: "us".to_string(),
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 100,
        };
        assert!(ProviderResolver::new(config).unwrap().is_none());
    }
}
