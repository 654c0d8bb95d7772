// Core algorithm exports
pub mod corridor;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use corridor::{build_corridor, build_corridor_within, point_in_corridor, Corridor, CorridorRings};
pub use distance::{distance_miles, haversine_distance, straight_line_miles};
pub use filters::{is_eligible, matches_equipment, validate_request, within_radius, MatchError};
pub use matcher::{find_opportunities, MatchResult, Matcher};
pub use scoring::{calculate_economics, out_of_route_miles, LoadEconomics};
