use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Coordinate {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within the valid latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A coordinate with a display label, e.g. "Charlotte, NC"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default)]
    pub label: String,
}

impl Stop {
    pub fn new(label: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            coordinate: Coordinate::new(lat, lng),
            label: label.into(),
        }
    }
}

/// Where a geocoded location came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Provider,
    CityTable,
    ZipTable,
    /// Caller gave a coordinate, nothing was looked up
    Supplied,
    /// Nothing resolved, the fleet home stands in
    FleetHome,
}

/// Result of resolving free text to a place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub label: String,
    pub source: LocationSource,
}

impl ResolvedLocation {
    pub fn to_stop(&self) -> Stop {
        Stop {
            coordinate: self.coordinate,
            label: self.label.clone(),
        }
    }
}

/// Trailer equipment classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailerType {
    DryVan,
    Reefer,
    Flatbed,
    StepDeck,
    PowerOnly,
    Conestoga,
    Hotshot,
    /// Anything the load board reports that we don't recognise
    #[serde(other)]
    Unknown,
}

/// Equipment constraints of the truck looking for a backhaul
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentProfile {
    pub trailer_type: TrailerType,
    pub trailer_length_ft: u32,
    pub weight_limit_lbs: u32,
}

/// How the truck gets from the backhaul delivery back to base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// final stop → pickup → delivery → home
    #[default]
    Direct,
    /// final stop → pickup → home → delivery → home
    Relay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    #[default]
    Available,
    Booked,
    Expired,
    #[serde(other)]
    Unknown,
}

/// How a load pays
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rateType", rename_all = "snake_case")]
pub enum RateStructure {
    PerMile {
        rate: f64,
        #[serde(rename = "fuelSurchargePerMile", default)]
        fuel_surcharge_per_mile: f64,
    },
    Flat {
        rate: f64,
        #[serde(rename = "fuelSurcharge", default)]
        fuel_surcharge: f64,
    },
}

impl RateStructure {
    /// Revenue for hauling the load over `linehaul_miles`
    pub fn revenue(&self, linehaul_miles: f64) -> f64 {
        match *self {
            RateStructure::PerMile {
                rate,
                fuel_surcharge_per_mile,
            } => (rate + fuel_surcharge_per_mile) * linehaul_miles,
            RateStructure::Flat {
                rate,
                fuel_surcharge,
            } => rate + fuel_surcharge,
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            RateStructure::PerMile {
                rate,
                fuel_surcharge_per_mile,
            } => rate.is_finite() && fuel_surcharge_per_mile.is_finite(),
            RateStructure::Flat {
                rate,
                fuel_surcharge,
            } => rate.is_finite() && fuel_surcharge.is_finite(),
        }
    }
}

/// A freight record supplied by the load repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateLoad {
    pub id: String,
    #[serde(default)]
    pub status: LoadStatus,
    pub pickup: Stop,
    pub delivery: Stop,
    pub equipment_type: TrailerType,
    pub trailer_length_ft: u32,
    pub weight_lbs: u32,
    pub linehaul_miles: f64,
    pub rate: RateStructure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freight_type: Option<String>,
}

impl CandidateLoad {
    /// Precomputed total if the board supplied one, otherwise derived from the rate
    pub fn total_revenue(&self) -> f64 {
        self.total_revenue
            .unwrap_or_else(|| self.rate.revenue(self.linehaul_miles))
    }
}

/// A candidate load that passed every filter, with its computed economics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub load: CandidateLoad,
    pub final_to_pickup_miles: f64,
    pub out_of_route_miles: f64,
    pub direct_return_miles: f64,
    pub additional_miles: f64,
    pub total_revenue: f64,
    pub revenue_per_mile: f64,
    pub score: f64,
}

/// Inputs of a single matching run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRequest {
    pub final_stop: Coordinate,
    pub fleet_home: Coordinate,
    pub equipment: EquipmentProfile,
    pub search_radius_miles: f64,
    pub routing_mode: RoutingMode,
}
