use crate::core::{
    corridor::Corridor,
    distance::distance_miles,
    filters::{is_eligible, matches_equipment, validate_request, within_radius, MatchError},
    scoring::calculate_economics,
};
use crate::models::{CandidateLoad, Coordinate, EquipmentProfile, MatchRequest, Opportunity, RoutingMode};

/// Result of the matching process
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub opportunities: Vec<Opportunity>,
    pub total_candidates: usize,
    pub direct_return_miles: f64,
}

/// Main matching orchestrator - implements the backhaul filtering pipeline
///
/// # Pipeline Stages
/// 1. Eligibility (status, well-formed record)
/// 2. Equipment, trailer length and weight
/// 3. Search radius around the final stop
/// 4. Optional corridor restriction on the pickup
/// 5. Economics and ranking
///
/// The matcher holds no state between runs, so a single instance can be
/// shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Matcher;

impl Matcher {
    pub fn new() -> Self {
        Self
    }

    /// Find and rank backhaul opportunities for a truck at `request.final_stop`
    ///
    /// # Returns
    /// Opportunities sorted by score, highest first. Loads with equal scores
    /// keep their input order.
    pub fn find_opportunities(
        &self,
        request: &MatchRequest,
        candidates: &[CandidateLoad],
    ) -> Result<MatchResult, MatchError> {
        self.run(request, candidates, None)
    }

    /// Same as [`Matcher::find_opportunities`], additionally requiring each
    /// pickup to lie inside `corridor`
    pub fn find_opportunities_in_corridor(
        &self,
        request: &MatchRequest,
        candidates: &[CandidateLoad],
        corridor: &Corridor,
    ) -> Result<MatchResult, MatchError> {
        self.run(request, candidates, Some(corridor))
    }

    fn run(
        &self,
        request: &MatchRequest,
        candidates: &[CandidateLoad],
        corridor: Option<&Corridor>,
    ) -> Result<MatchResult, MatchError> {
        validate_request(request)?;

        let direct_return_miles = distance_miles(&request.final_stop, &request.fleet_home);

        let mut opportunities: Vec<Opportunity> = candidates
            .iter()
            // Stage 1: skip anything we can't or shouldn't compute on
            .filter(|load| {
                let eligible = is_eligible(load);
                if !eligible {
                    tracing::trace!("Skipping ineligible load {}", load.id);
                }
                eligible
            })
            // Stage 2: equipment compatibility
            .filter(|load| matches_equipment(load, &request.equipment))
            // Stage 3: search radius
            .filter_map(|load| {
                let final_to_pickup_miles =
                    distance_miles(&request.final_stop, &load.pickup.coordinate);
                within_radius(final_to_pickup_miles, request.search_radius_miles)
                    .then_some((load, final_to_pickup_miles))
            })
            // Stage 4: corridor
            .filter(|(load, _)| {
                corridor.map_or(true, |c| {
                    c.contains(load.pickup.coordinate.lat, load.pickup.coordinate.lng)
                })
            })
            // Stage 5: economics
            .filter_map(|(load, final_to_pickup_miles)| {
                let economics = calculate_economics(
                    load,
                    &request.fleet_home,
                    request.routing_mode,
                    final_to_pickup_miles,
                    direct_return_miles,
                );

                match economics {
                    Some(economics) => Some(Opportunity {
                        load: load.clone(),
                        final_to_pickup_miles,
                        out_of_route_miles: economics.out_of_route_miles,
                        direct_return_miles,
                        additional_miles: economics.additional_miles,
                        total_revenue: economics.total_revenue,
                        revenue_per_mile: economics.revenue_per_mile,
                        score: economics.score,
                    }),
                    None => {
                        tracing::debug!("Skipping load {} with zero out-of-route miles", load.id);
                        None
                    }
                }
            })
            .collect();

        // Stable: equal scores keep candidate order
        opportunities.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            "Matched {} of {} candidates (direct return {:.1} mi)",
            opportunities.len(),
            candidates.len(),
            direct_return_miles
        );

        Ok(MatchResult {
            opportunities,
            total_candidates: candidates.len(),
            direct_return_miles,
        })
    }
}

/// Convenience wrapper over [`Matcher::find_opportunities`]
pub fn find_opportunities(
    final_stop: Coordinate,
    fleet_home: Coordinate,
    equipment: EquipmentProfile,
    search_radius_miles: f64,
    routing_mode: RoutingMode,
    candidates: &[CandidateLoad],
) -> Result<Vec<Opportunity>, MatchError> {
    let request = MatchRequest {
        final_stop,
        fleet_home,
        equipment,
        search_radius_miles,
        routing_mode,
    };

    Matcher::new()
        .find_opportunities(&request, candidates)
        .map(|result| result.opportunities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corridor::build_corridor;
    use crate::models::{LoadStatus, RateStructure, Stop, TrailerType};
    use geo::LineString;

    fn create_candidate(id: &str, pickup: (f64, f64), delivery: (f64, f64), rate: f64) -> CandidateLoad {
        CandidateLoad {
            id: id.to_string(),
            status: LoadStatus::Available,
            pickup: Stop::new(format!("pickup {}", id), pickup.0, pickup.1),
            delivery: Stop::new(format!("delivery {}", id), delivery.0, delivery.1),
            equipment_type: TrailerType::DryVan,
            trailer_length_ft: 53,
            weight_lbs: 30000,
            linehaul_miles: 100.0,
            rate: RateStructure::PerMile {
                rate,
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

    fn create_request() -> MatchRequest {
        MatchRequest {
            final_stop: Coordinate::new(35.2271, -80.8431), // Charlotte
            fleet_home: Coordinate::new(35.4993, -80.8481), // Davidson
            equipment: EquipmentProfile {
                trailer_type: TrailerType::DryVan,
                trailer_length_ft: 53,
                weight_limit_lbs: 45000,
            },
            search_radius_miles: 75.0,
            routing_mode: RoutingMode::Direct,
        }
    }

    #[test]
    fn test_find_opportunities_basic() {
        let matcher = Matcher::new();
        let mut reefer = create_candidate("2", (35.26, -81.19), (35.78, -80.89), 2.5);
        reefer.equipment_type = TrailerType::Reefer;

        let candidates = vec![
            create_candidate("1", (35.26, -81.19), (35.78, -80.89), 2.5), // Gastonia → Statesville
            reefer,
            create_candidate("3", (33.75, -84.39), (35.78, -80.89), 2.5), // Atlanta, too far
        ];

        let result = matcher.find_opportunities(&create_request(), &candidates).unwrap();

        assert_eq!(result.total_candidates, 3);
        assert_eq!(result.opportunities.len(), 1);
        assert_eq!(result.opportunities[0].load.id, "1");
    }

    #[test]
    fn test_sorted_by_score() {
        let matcher = Matcher::new();
        let candidates = vec![
            create_candidate("low", (35.26, -81.19), (35.78, -80.89), 1.5),
            create_candidate("high", (35.26, -81.19), (35.78, -80.89), 3.5),
            create_candidate("mid", (35.26, -81.19), (35.78, -80.89), 2.5),
        ];

        let result = matcher.find_opportunities(&create_request(), &candidates).unwrap();
        let ids: Vec<&str> = result.opportunities.iter().map(|o| o.load.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let matcher = Matcher::new();
        let candidates: Vec<CandidateLoad> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| create_candidate(id, (35.26, -81.19), (35.78, -80.89), 2.5))
            .collect();

        let result = matcher.find_opportunities(&create_request(), &candidates).unwrap();
        let ids: Vec<&str> = result.opportunities.iter().map(|o| o.load.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_relay_mode_costs_more_miles() {
        let matcher = Matcher::new();
        let candidates = vec![create_candidate("1", (35.26, -81.19), (34.92, -81.03), 2.5)];

        let direct = matcher.find_opportunities(&create_request(), &candidates).unwrap();
        let mut relay_request = create_request();
        relay_request.routing_mode = RoutingMode::Relay;
        let relay = matcher.find_opportunities(&relay_request, &candidates).unwrap();

        let direct = &direct.opportunities[0];
        let relay = &relay.opportunities[0];
        assert_eq!(direct.total_revenue, relay.total_revenue);
        assert_eq!(relay.final_to_pickup_miles, direct.final_to_pickup_miles);

        let home = relay_request.fleet_home;
        let pickup = candidates[0].pickup.coordinate;
        let delivery = candidates[0].delivery.coordinate;
        let expected = relay.final_to_pickup_miles
            + distance_miles(&pickup, &home)
            + distance_miles(&home, &delivery)
            + distance_miles(&delivery, &home);
        assert!((relay.out_of_route_miles - expected).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_radius_rejected() {
        let mut request = create_request();
        request.search_radius_miles = -5.0;

        let result = Matcher::new().find_opportunities(&request, &[]);
        assert!(matches!(result, Err(MatchError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_candidates() {
        let result = Matcher::new().find_opportunities(&create_request(), &[]).unwrap();
        assert!(result.opportunities.is_empty());
        assert_eq!(result.total_candidates, 0);
        assert!(result.direct_return_miles > 18.0 && result.direct_return_miles < 20.0);
    }

    #[test]
    fn test_corridor_restricts_pickups() {
        let matcher = Matcher::new();
        let request = create_request();
        let route = LineString::from(vec![
            (request.final_stop.lng, request.final_stop.lat),
            (request.fleet_home.lng, request.fleet_home.lat),
        ]);
        let corridor = build_corridor(&route, 5.0, false).unwrap();

        let candidates = vec![
            create_candidate("on-route", (35.41, -80.84), (35.78, -80.89), 2.5), // Huntersville
            create_candidate("off-route", (35.26, -81.19), (35.78, -80.89), 2.5), // Gastonia
        ];

        let result = matcher
            .find_opportunities_in_corridor(&request, &candidates, &corridor)
            .unwrap();
        assert_eq!(result.opportunities.len(), 1);
        assert_eq!(result.opportunities[0].load.id, "on-route");
    }
}
