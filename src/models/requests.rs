use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::models::domain::{CandidateLoad, Coordinate, EquipmentProfile, RoutingMode};

/// A stop given either as a coordinate or as free text to geocode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopInput {
    Coordinate(Coordinate),
    Label { label: String },
}

fn validate_stop_input(stop: &StopInput) -> Result<(), ValidationError> {
    match stop {
        StopInput::Coordinate(coordinate) if !coordinate.is_valid() => Err(ValidationError::new("invalid_coordinate")),
        StopInput::Label { label } if label.trim().is_empty() => Err(ValidationError::new("empty_label")),
        _ => Ok(()),
    }
}

/// Request to find backhaul opportunities
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FindOpportunitiesRequest {
    #[validate(custom(function = "validate_stop_input"))]
    #[serde(alias = "final_stop")]
    pub final_stop: StopInput,
    #[validate(nested)]
    #[serde(alias = "fleet_home")]
    pub fleet_home: Coordinate,
    pub equipment: EquipmentProfile,
    #[validate(range(min = 0.0, max = 3000.0))]
    #[serde(alias = "search_radius_miles")]
    pub search_radius_miles: f64,
    #[serde(default, alias = "routing_mode")]
    pub routing_mode: RoutingMode,
    /// Match against these instead of the repository; see [`parse_loads`]
    #[serde(default)]
    pub loads: Option<Vec<Value>>,
    #[validate(range(min = 1))]
    #[serde(default)]
    pub limit: Option<usize>,
    /// Restrict pickups to the final stop → fleet home corridor
    #[validate(range(min = 0.1, max = 500.0))]
    #[serde(default, alias = "corridor_width_miles")]
    pub corridor_width_miles: Option<f64>,
}

/// Free-text geocode lookup
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeocodeRequest {
    #[validate(length(min = 1, max = 256))]
    pub query: String,
}

/// Request to build the corridor between two points
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CorridorRequest {
    #[validate(nested)]
    pub origin: Coordinate,
    #[validate(nested)]
    pub destination: Coordinate,
    #[validate(range(min = 0.1, max = 500.0))]
    #[serde(default, alias = "width_miles")]
    pub width_miles: Option<f64>,
}

/// Batch of scraped load-board records, decoded one by one with [`parse_loads`]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestLoadsRequest {
    #[validate(length(min = 1, max = 10000))]
    pub loads: Vec<Value>,
}

/// Decode raw load records, skipping any that don't parse
///
/// Returns the parsed loads and how many records were dropped.
pub fn parse_loads(raw: Vec<Value>) -> (Vec<CandidateLoad>, usize) {
    let mut loads = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (index, record) in raw.into_iter().enumerate() {
        let id = record.get("id").and_then(Value::as_str).map(str::to_string);
        match serde_json::from_value::<CandidateLoad>(record) {
            Ok(load) => loads.push(load),
            Err(e) => {
                tracing::warn!(
                    "Skipping malformed load #{} ({}): {}",
                    index,
                    id.as_deref().unwrap_or("no id"),
                    e
                );
                skipped += 1;
            }
        }
    }

    (loads, skipped)
}
