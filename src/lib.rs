//! Backhaul Finder - return-load matching for trucks heading home
//!
//! This library provides the core of the backhaul service: distance math,
//! best-effort geocoding and routing, route corridors with a memoizing cache,
//! and the matching engine that ranks candidate loads by their economics.

pub mod config;
pub mod core;
pub mod models;
pub mod reference;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{build_corridor, find_opportunities, haversine_distance, point_in_corridor, Corridor, MatchError, Matcher};
pub use models::{CandidateLoad, Coordinate, EquipmentProfile, MatchRequest, Opportunity, RateStructure, RoutingMode, TrailerType};
pub use services::{CorridorCache, CorridorService, Geocoder, InMemoryLoadRepository, RouteClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let miles = haversine_distance(35.2271, -80.8431, 35.4993, -80.8481);
        assert!(miles > 18.0 && miles < 19.5);
    }
}
