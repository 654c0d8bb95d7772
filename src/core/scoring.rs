use crate::core::distance::distance_miles;
use crate::models::{CandidateLoad, Coordinate, RoutingMode};

/// Computed economics of hauling one candidate load home
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadEconomics {
    pub out_of_route_miles: f64,
    pub additional_miles: f64,
    pub total_revenue: f64,
    pub revenue_per_mile: f64,
    pub score: f64,
}

/// Total miles driven from the final stop to base when taking this load
///
/// Direct:  final → pickup → delivery → home
/// Relay:   final → pickup → home → delivery → home
pub fn out_of_route_miles(
    load: &CandidateLoad,
    fleet_home: &Coordinate,
    routing_mode: RoutingMode,
    final_to_pickup_miles: f64,
) -> f64 {
    let pickup = &load.pickup.coordinate;
    let delivery = &load.delivery.coordinate;

    match routing_mode {
        RoutingMode::Direct => {
            final_to_pickup_miles + load.linehaul_miles + distance_miles(delivery, fleet_home)
        }
        RoutingMode::Relay => {
            final_to_pickup_miles
                + distance_miles(pickup, fleet_home)
                + distance_miles(fleet_home, delivery)
                + distance_miles(delivery, fleet_home)
        }
    }
}

/// Calculate revenue, efficiency and ranking score for a load
///
/// Scoring formula:
/// score = revenue_per_mile * total_revenue
///
/// Returns `None` when the trip has no length, since revenue per mile is
/// undefined there.
pub fn calculate_economics(
    load: &CandidateLoad,
    fleet_home: &Coordinate,
    routing_mode: RoutingMode,
    final_to_pickup_miles: f64,
    direct_return_miles: f64,
) -> Option<LoadEconomics> {
    let total_revenue = load.total_revenue();
    let out_of_route_miles =
        out_of_route_miles(load, fleet_home, routing_mode, final_to_pickup_miles);

    if out_of_route_miles <= 0.0 || !out_of_route_miles.is_finite() {
        return None;
    }

    let revenue_per_mile = total_revenue / out_of_route_miles;
    let score = revenue_per_mile * total_revenue;

    if !score.is_finite() {
        return None;
    }

    Some(LoadEconomics {
        out_of_route_miles,
        additional_miles: out_of_route_miles - direct_return_miles,
        total_revenue,
        revenue_per_mile,
        score,
    })
}
