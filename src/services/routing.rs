use geo::{Coord, LineString};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::models::Coordinate;

/// Errors that can occur when talking to the routing provider
///
/// These never reach callers of [`RouteClient::fetch_route`]; they are logged
/// and turned into missing fields.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,
}

/// What the routing provider could tell us about a trip
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteResult {
    pub geometry: Option<LineString<f64>>,
    pub distance_miles: Option<f64>,
}

/// Routing provider connection settings
#[derive(Debug, Clone)]
pub struct RouteClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Client for the mileage and path reports of the routing provider
pub struct RouteClient {
    config: RouteClientConfig,
    client: Client,
}

impl RouteClient {
    pub fn new(config: RouteClientConfig) -> Result<Self, RouteError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// Fetch driving geometry and mileage through `waypoints`, in visit order
    ///
    /// Returns `None` when neither report could be obtained.
    pub async fn fetch_route(&self, waypoints: &[Coordinate]) -> Option<RouteResult> {
        self.fetch_route_with_cancel(waypoints, &CancellationToken::new()).await
    }

    /// Like [`RouteClient::fetch_route`], giving up as soon as `cancel` fires
    pub async fn fetch_route_with_cancel(
        &self,
        waypoints: &[Coordinate],
        cancel: &CancellationToken,
    ) -> Option<RouteResult> {
        if waypoints.len() < 2 {
            tracing::debug!("Route needs at least two waypoints, got {}", waypoints.len());
            return None;
        }

        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            tracing::debug!("Routing provider not configured, skipping route fetch");
            return None;
        };

        let stops = serialize_waypoints(waypoints);

        let (mileage, path) = tokio::join!(
            self.guarded(self.fetch_mileage(api_key, &stops), cancel),
            self.guarded(self.fetch_path(api_key, &stops), cancel),
        );

        let distance_miles = mileage
            .map_err(|e| tracing::warn!("Mileage report unavailable: {}", e))
            .ok()
            .flatten();
        let geometry = path
            .map_err(|e| tracing::warn!("Route path unavailable: {}", e))
            .ok()
            .flatten();

        if distance_miles.is_none() && geometry.is_none() {
            return None;
        }

        Some(RouteResult {
            geometry,
            distance_miles,
        })
    }

    /// Apply the configured timeout and the caller's cancellation
    async fn guarded<T, F>(&self, request: F, cancel: &CancellationToken) -> Result<T, RouteError>
    where
        F: std::future::Future<Output = Result<T, RouteError>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RouteError::Cancelled),
            result = tokio::time::timeout(self.config.timeout, request) => {
                result.map_err(|_| RouteError::Timeout(self.config.timeout))?
            }
        }
    }

    async fn fetch_mileage(&self, api_key: &str, stops: &str) -> Result<Option<f64>, RouteError> {
        let url = format!("{}/route/routeReports", self.config.base_url.trim_end_matches('/'));
        let json = self
            .get_json(&url, api_key, &[("stops", stops), ("reports", "Mileage")])
            .await?;
        Ok(extract_total_miles(&json))
    }

    async fn fetch_path(&self, api_key: &str, stops: &str) -> Result<Option<LineString<f64>>, RouteError> {
        let url = format!("{}/route/routePath", self.config.base_url.trim_end_matches('/'));
        let json = self.get_json(&url, api_key, &[("stops", stops)]).await?;
        Ok(extract_line(&json))
    }

    async fn get_json(&self, url: &str, api_key: &str, query: &[(&str, &str)]) -> Result<Value, RouteError> {
        tracing::debug!("Requesting route report from: {}", url);

        let response = self
            .client
            .get(url)
            .query(query)
            .header("Authorization", api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RouteError::ApiError(format!(
                "Route request failed: {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RouteError::InvalidResponse(e.to_string()))
    }
}

/// `lng,lat` pairs joined by `;`, in visit order
pub fn serialize_waypoints(waypoints: &[Coordinate]) -> String {
    waypoints
        .iter()
        .map(|c| format!("{},{}", c.lng, c.lat))
        .collect::<Vec<_>>()
        .join(";")
}

/// Straight segments between the waypoints, for display when no path is known
pub fn straight_line(waypoints: &[Coordinate]) -> LineString<f64> {
    waypoints
        .iter()
        .map(|c| Coord { x: c.lng, y: c.lat })
        .collect()
}

/// Total trip miles from a mileage report
///
/// Accepts a list of reports, a single report object, a `Reports` wrapper or a
/// flat object; the figure is the `TMiles` of the last report line.
pub fn extract_total_miles(json: &Value) -> Option<f64> {
    match json {
        Value::Array(items) => items.iter().rev().find_map(extract_total_miles),
        Value::Object(map) => {
            if let Some(lines) = map.get("ReportLines").and_then(Value::as_array) {
                return lines.last().and_then(|line| line.get("TMiles")).and_then(as_miles);
            }
            if let Some(reports) = map.get("Reports").or_else(|| map.get("reports")) {
                return extract_total_miles(reports);
            }
            map.get("TMiles").and_then(as_miles)
        }
        _ => None,
    }
}

fn as_miles(value: &Value) -> Option<f64> {
    let miles = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }?;
    (miles.is_finite() && miles >= 0.0).then_some(miles)
}

/// A single line from a GeoJSON path response
///
/// FeatureCollection features, a lone Feature and bare geometries are all
/// accepted; every line part is concatenated in order.
pub fn extract_line(json: &Value) -> Option<LineString<f64>> {
    let mut coords = Vec::new();
    collect_line_coords(json, &mut coords);
    (coords.len() >= 2).then(|| LineString::new(coords))
}

fn collect_line_coords(json: &Value, out: &mut Vec<Coord<f64>>) {
    match json.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            if let Some(features) = json.get("features").and_then(Value::as_array) {
                for feature in features {
                    collect_line_coords(feature, out);
                }
            }
        }
        Some("Feature") => {
            if let Some(geometry) = json.get("geometry") {
                collect_line_coords(geometry, out);
            }
        }
        Some("GeometryCollection") => {
            if let Some(geometries) = json.get("geometries").and_then(Value::as_array) {
                for geometry in geometries {
                    collect_line_coords(geometry, out);
                }
            }
        }
        Some("LineString") => {
            if let Some(points) = json.get("coordinates").and_then(Value::as_array) {
                out.extend(points.iter().filter_map(position));
            }
        }
        Some("MultiLineString") => {
            if let Some(parts) = json.get("coordinates").and_then(Value::as_array) {
                for part in parts.iter().filter_map(Value::as_array) {
                    out.extend(part.iter().filter_map(position));
                }
            }
        }
        _ => {}
    }
}

/// `[lng, lat, ...]` → coordinate
fn position(value: &Value) -> Option<Coord<f64>> {
    let pair = value.as_array()?;
    let x = pair.first()?.as_f64()?;
    let y = pair.get(1)?.as_f64()?;
    Some(Coord { x, y })
}
