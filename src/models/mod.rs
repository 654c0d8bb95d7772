// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateLoad, Coordinate, EquipmentProfile, LoadStatus, LocationSource, MatchRequest, Opportunity,
    RateStructure, ResolvedLocation, RoutingMode, Stop, TrailerType,
};
pub use requests::{
    parse_loads, CorridorRequest, FindOpportunitiesRequest, GeocodeRequest, IngestLoadsRequest, StopInput,
};
pub use responses::{
    CorridorResponse, ErrorResponse, FindOpportunitiesResponse, GeocodeResponse, HealthResponse, IngestLoadsResponse,
};
