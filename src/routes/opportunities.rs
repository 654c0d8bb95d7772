use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::config::Settings;
use crate::core::{MatchError, Matcher};
use crate::models::{
    CorridorRequest, CorridorResponse, ErrorResponse, FindOpportunitiesRequest, FindOpportunitiesResponse,
    parse_loads, GeocodeRequest, GeocodeResponse, HealthResponse, IngestLoadsRequest, IngestLoadsResponse,
    LocationSource, MatchRequest, ResolvedLocation, StopInput,
};
use crate::services::{CorridorService, Geocoder, InMemoryLoadRepository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub geocoder: Arc<Geocoder>,
    pub corridors: Arc<CorridorService>,
    pub loads: Arc<InMemoryLoadRepository>,
    pub matcher: Matcher,
    pub settings: Arc<Settings>,
}

/// Configure all opportunity-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/opportunities/find", web::post().to(find_opportunities))
        .route("/geocode", web::post().to(geocode))
        .route("/corridor", web::post().to(corridor))
        .route("/loads", web::post().to(ingest_loads));
}

fn bad_request(error: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        loads: state.loads.len(),
        corridor_cache: state.corridors.cache().stats(),
    })
}

/// Turn the request's final stop into a coordinate, falling back to fleet home
async fn resolve_final_stop(state: &AppState, request: &FindOpportunitiesRequest) -> ResolvedLocation {
    match &request.final_stop {
        StopInput::Coordinate(coordinate) => ResolvedLocation {
            coordinate: *coordinate,
            label: format!("{:.4}, {:.4}", coordinate.lat, coordinate.lng),
            source: LocationSource::Supplied,
        },
        StopInput::Label { label } => match state.geocoder.geocode(label).await {
            Some(location) => location,
            None => {
                tracing::warn!("Could not geocode final stop '{}', using fleet home", label);
                ResolvedLocation {
                    coordinate: request.fleet_home,
                    label: label.clone(),
                    source: LocationSource::FleetHome,
                }
            }
        },
    }
}

/// Find opportunities endpoint
///
/// POST /api/v1/opportunities/find
///
/// Request body:
/// ```json
/// {
///   "finalStop": {"label": "Charlotte, NC"},
///   "fleetHome": {"lat": 35.4993, "lng": -80.8481},
///   "equipment": {"trailerType": "dry_van", "trailerLengthFt": 53, "weightLimitLbs": 45000},
///   "searchRadiusMiles": 75,
///   "routingMode": "direct",
///   "limit": 25,
///   "corridorWidthMiles": 20
/// }
/// ```
async fn find_opportunities(
    state: web::Data<AppState>,
    req: web::Json<FindOpportunitiesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_opportunities request: {:?}", errors);
        return bad_request("Validation failed", errors.to_string());
    }

    let final_stop = resolve_final_stop(&state, &req).await;

    let match_request = MatchRequest {
        final_stop: final_stop.coordinate,
        fleet_home: req.fleet_home,
        equipment: req.equipment,
        search_radius_miles: req.search_radius_miles,
        routing_mode: req.routing_mode,
    };

    let (candidates, skipped_loads) = match &req.loads {
        Some(raw) => parse_loads(raw.clone()),
        None => (state.loads.available(), 0),
    };

    tracing::info!(
        "Finding opportunities near '{}' within {} mi across {} loads",
        final_stop.label,
        req.search_radius_miles,
        candidates.len()
    );

    let result = match req.corridor_width_miles {
        Some(width) => {
            let data = state
                .corridors
                .corridor_between(&final_stop.coordinate, &req.fleet_home, width)
                .await;
            match &data.corridor {
                Some(corridor) => state
                    .matcher
                    .find_opportunities_in_corridor(&match_request, &candidates, corridor),
                None => {
                    tracing::warn!("Corridor unavailable, matching without corridor restriction");
                    state.matcher.find_opportunities(&match_request, &candidates)
                }
            }
        }
        None => state.matcher.find_opportunities(&match_request, &candidates),
    };

    let mut result = match result {
        Ok(result) => result,
        Err(MatchError::InvalidInput(message)) => return bad_request("Invalid input", message),
    };

    let limit = req
        .limit
        .unwrap_or(state.settings.matching.default_limit)
        .min(state.settings.matching.max_limit);
    result.opportunities.truncate(limit);

    let response = FindOpportunitiesResponse {
        search_id: uuid::Uuid::new_v4().to_string(),
        final_stop,
        direct_return_miles: result.direct_return_miles,
        total_candidates: result.total_candidates,
        skipped_loads,
        opportunities: result.opportunities,
    };

    tracing::info!(
        "Returning {} opportunities (from {} candidates)",
        response.opportunities.len(),
        response.total_candidates
    );

    HttpResponse::Ok().json(response)
}

/// POST /api/v1/geocode
async fn geocode(state: web::Data<AppState>, req: web::Json<GeocodeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    match state.geocoder.geocode(&req.query).await {
        Some(location) => HttpResponse::Ok().json(GeocodeResponse { location }),
        None => HttpResponse::NotFound().json(ErrorResponse {
            error: "Location not found".to_string(),
            message: format!("Could not resolve '{}'", req.query),
            status_code: 404,
        }),
    }
}

/// POST /api/v1/corridor
async fn corridor(state: web::Data<AppState>, req: web::Json<CorridorRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let width_miles = req.width_miles.unwrap_or(state.settings.corridor.width_miles);
    let data = state
        .corridors
        .corridor_between(&req.origin, &req.destination, width_miles)
        .await;

    HttpResponse::Ok().json(CorridorResponse {
        route: data.route.coords().map(|c| [c.x, c.y]).collect(),
        route_is_fallback: data.route_is_fallback,
        corridor: data.corridor.as_ref().map(Into::into),
        distance_miles: data.distance_miles,
        distance_source: data.distance_source,
        width_miles,
    })
}

/// POST /api/v1/loads
async fn ingest_loads(state: web::Data<AppState>, req: web::Json<IngestLoadsRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return bad_request("Validation failed", errors.to_string());
    }

    let IngestLoadsRequest { loads } = req.into_inner();
    let received = loads.len();
    let (loads, skipped) = parse_loads(loads);
    let inserted = state.loads.upsert(loads);
    let total = state.loads.len();

    tracing::info!(
        "Ingested {} loads ({} new, {} skipped, {} held)",
        received,
        inserted,
        skipped,
        total
    );

    HttpResponse::Ok().json(IngestLoadsResponse {
        received,
        inserted,
        skipped,
        total,
    })
}
