use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::core::{build_corridor, straight_line_miles};
use crate::models::Coordinate;
use crate::services::cache::{CorridorCache, CorridorData, DistanceSource};
use crate::services::routing::{straight_line, RouteClient, RouteError};

/// Builds (and caches) the route corridor between two points
///
/// Mileage comes from the routing provider or, failing that, the haversine
/// sum of the legs. Geometry comes from the provider or a straight line; the
/// straight line is only ever used for display and corridor shape.
pub struct CorridorService {
    routes: Arc<RouteClient>,
    cache: Arc<CorridorCache>,
    clip_to_land: bool,
}

impl CorridorService {
    pub fn new(routes: Arc<RouteClient>, cache: Arc<CorridorCache>, clip_to_land: bool) -> Self {
        Self {
            routes,
            cache,
            clip_to_land,
        }
    }

    pub fn cache(&self) -> &CorridorCache {
        &self.cache
    }

    pub async fn corridor_between(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
        width_miles: f64,
    ) -> Arc<CorridorData> {
        let waypoints = [*origin, *destination];
        let never = CancellationToken::new();

        self.cache
            .get_or_compute(origin, destination, width_miles, || async {
                self.compute(&waypoints, width_miles, &never).await
            })
            .await
    }

    /// Cancellable lookup; `None` when `cancel` fires before the corridor is ready
    ///
    /// A cancelled computation is never stored, so other callers of the same
    /// trip still get the provider route.
    pub async fn corridor_between_with_cancel(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
        width_miles: f64,
        cancel: &CancellationToken,
    ) -> Option<Arc<CorridorData>> {
        let waypoints = [*origin, *destination];

        let result = self
            .cache
            .get_or_try_compute(origin, destination, width_miles, || async move {
                if cancel.is_cancelled() {
                    return Err(RouteError::Cancelled);
                }
                let data = self.compute(&waypoints, width_miles, cancel).await;
                if cancel.is_cancelled() {
                    return Err(RouteError::Cancelled);
                }
                Ok(data)
            })
            .await;

        match result {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::debug!("Corridor lookup not resolved: {}", e);
                None
            }
        }
    }

    async fn compute(&self, waypoints: &[Coordinate], width_miles: f64, cancel: &CancellationToken) -> CorridorData {
        let route = self
            .routes
            .fetch_route_with_cancel(waypoints, cancel)
            .await
            .unwrap_or_default();

        let (route_line, route_is_fallback) = match route.geometry {
            Some(line) => (line, false),
            None => (straight_line(waypoints), true),
        };

        let (distance_miles, distance_source) = match route.distance_miles {
            Some(miles) => (miles, DistanceSource::Provider),
            None => (straight_line_miles(waypoints), DistanceSource::StraightLine),
        };

        // Boolean ops on long routes are CPU-heavy, keep them off the reactor
        let line = route_line.clone();
        let clip_to_land = self.clip_to_land;
        let corridor = tokio::task::spawn_blocking(move || build_corridor(&line, width_miles, clip_to_land))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Corridor computation aborted: {}", e);
                None
            });

        CorridorData {
            route: route_line,
            route_is_fallback,
            corridor,
            distance_miles,
            distance_source,
        }
    }
}
