use crate::models::{CandidateLoad, EquipmentProfile, LoadStatus, MatchRequest, TrailerType};
use thiserror::Error;

/// Errors raised at the matching boundary
#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Reject requests that would otherwise silently produce zero results
pub fn validate_request(request: &MatchRequest) -> Result<(), MatchError> {
    if !request.final_stop.is_valid() {
        return Err(MatchError::InvalidInput(format!(
            "final stop has invalid coordinates ({}, {})",
            request.final_stop.lat, request.final_stop.lng
        )));
    }

    if !request.fleet_home.is_valid() {
        return Err(MatchError::InvalidInput(format!(
            "fleet home has invalid coordinates ({}, {})",
            request.fleet_home.lat, request.fleet_home.lng
        )));
    }

    if !request.search_radius_miles.is_finite() || request.search_radius_miles < 0.0 {
        return Err(MatchError::InvalidInput(format!(
            "search radius must be a non-negative number of miles, got {}",
            request.search_radius_miles
        )));
    }

    let equipment = &request.equipment;
    if equipment.trailer_type == TrailerType::Unknown {
        return Err(MatchError::InvalidInput("trailer type is not recognised".into()));
    }
    if equipment.trailer_length_ft == 0 {
        return Err(MatchError::InvalidInput("trailer length must be positive".into()));
    }
    if equipment.weight_limit_lbs == 0 {
        return Err(MatchError::InvalidInput("weight limit must be positive".into()));
    }

    Ok(())
}

/// Loads the engine can compute on: available, with sane coordinates and money
#[inline]
pub fn is_eligible(load: &CandidateLoad) -> bool {
    if load.status != LoadStatus::Available {
        return false;
    }

    if !load.pickup.coordinate.is_valid() || !load.delivery.coordinate.is_valid() {
        return false;
    }

    if !load.linehaul_miles.is_finite() || load.linehaul_miles < 0.0 {
        return false;
    }

    if !load.rate.is_finite() {
        return false;
    }

    load.total_revenue.map_or(true, f64::is_finite)
}

/// Equipment type, trailer length and weight checks, in that order
#[inline]
pub fn matches_equipment(load: &CandidateLoad, profile: &EquipmentProfile) -> bool {
    // Exact match only; a reefer can't stand in for a dry van here
    if load.equipment_type != profile.trailer_type {
        return false;
    }

    if load.trailer_length_ft > profile.trailer_length_ft {
        return false;
    }

    load.weight_lbs <= profile.weight_limit_lbs
}

#[inline]
pub fn within_radius(final_to_pickup_miles: f64, search_radius_miles: f64) -> bool {
    final_to_pickup_miles <= search_radius_miles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, RateStructure, RoutingMode, Stop};

    fn create_test_load(equipment: TrailerType, length: u32, weight: u32) -> CandidateLoad {
        CandidateLoad {
            id: "load".to_string(),
            status: LoadStatus::Available,
            pickup: Stop::new("Charlotte, NC", 35.2271, -80.8431),
            delivery: Stop::new("Statesville, NC", 35.7826, -80.8873),
            equipment_type: equipment,
            trailer_length_ft: length,
            weight_lbs: weight,
            linehaul_miles: 45.0,
            rate: RateStructure::PerMile {
                rate: 2.5,
                fuel_surcharge_per_mile: 0.4,
            },
            total_revenue: None,
            pickup_date: None,
            delivery_date: None,
            broker: None,
            shipper: None,
            freight_type: None,
        }
    }

    fn create_test_profile() -> EquipmentProfile {
        EquipmentProfile {
            trailer_type: TrailerType::DryVan,
            trailer_length_ft: 53,
            weight_limit_lbs: 45000,
        }
    }

    fn create_test_request() -> MatchRequest {
        MatchRequest {
            final_stop: Coordinate::new(35.2271, -80.8431),
            fleet_home: Coordinate::new(35.4993, -80.8481),
            equipment: create_test_profile(),
            search_radius_miles: 100.0,
            routing_mode: RoutingMode::Direct,
        }
    }

    #[test]
    fn test_equipment_match() {
        let load = create_test_load(TrailerType::DryVan, 53, 45000);
        assert!(matches_equipment(&load, &create_test_profile()));
    }

    #[test]
    fn test_equipment_type_mismatch() {
        let load = create_test_load(TrailerType::Reefer, 53, 20000);
        assert!(!matches_equipment(&load, &create_test_profile()));
    }

    #[test]
    fn test_trailer_too_long() {
        let load = create_test_load(TrailerType::DryVan, 57, 20000);
        assert!(!matches_equipment(&load, &create_test_profile()));
    }

    #[test]
    fn test_too_heavy() {
        let load = create_test_load(TrailerType::DryVan, 48, 45001);
        assert!(!matches_equipment(&load, &create_test_profile()));
    }

    #[test]
    fn test_booked_load_not_eligible() {
        let mut load = create_test_load(TrailerType::DryVan, 53, 20000);
        assert!(is_eligible(&load));
        load.status = LoadStatus::Booked;
        assert!(!is_eligible(&load));
    }

    #[test]
    fn test_malformed_load_not_eligible() {
        let mut load = create_test_load(TrailerType::DryVan, 53, 20000);
        load.linehaul_miles = f64::NAN;
        assert!(!is_eligible(&load));

        let mut load = create_test_load(TrailerType::DryVan, 53, 20000);
        load.pickup.coordinate.lat = 123.0;
        assert!(!is_eligible(&load));

        let mut load = create_test_load(TrailerType::DryVan, 53, 20000);
        load.total_revenue = Some(f64::INFINITY);
        assert!(!is_eligible(&load));
    }

    #[test]
    fn test_radius_is_inclusive() {
        assert!(within_radius(100.0, 100.0));
        assert!(!within_radius(100.01, 100.0));
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request(&create_test_request()).is_ok());

        let mut request = create_test_request();
        request.search_radius_miles = -1.0;
        assert!(matches!(validate_request(&request), Err(MatchError::InvalidInput(_))));

        let mut request = create_test_request();
        request.final_stop = Coordinate::new(f64::NAN, -80.0);
        assert!(validate_request(&request).is_err());

        let mut request = create_test_request();
        request.equipment.trailer_type = TrailerType::Unknown;
        assert!(validate_request(&request).is_err());
    }
}
