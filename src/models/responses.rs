use serde::{Deserialize, Serialize};

use crate::core::CorridorRings;
use crate::models::domain::{Opportunity, ResolvedLocation};
use crate::services::cache::{CacheStats, DistanceSource};

/// Response for find opportunities endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOpportunitiesResponse {
    pub search_id: String,
    pub final_stop: ResolvedLocation,
    pub direct_return_miles: f64,
    /// Loads considered before any filtering
    pub total_candidates: usize,
    /// Inline records dropped because they did not parse
    #[serde(default)]
    pub skipped_loads: usize,
    pub opportunities: Vec<Opportunity>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub loads: usize,
    pub corridor_cache: CacheStats,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResponse {
    pub location: ResolvedLocation,
}

/// Route and corridor between two points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorResponse {
    /// `[lng, lat]` pairs
    pub route: Vec<[f64; 2]>,
    pub route_is_fallback: bool,
    pub corridor: Option<CorridorRings>,
    pub distance_miles: f64,
    pub distance_source: DistanceSource,
    pub width_miles: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestLoadsResponse {
    pub received: usize,
    pub inserted: usize,
    /// Records dropped because they did not parse
    pub skipped: usize,
    pub total: usize,
}
