use geo::LineString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::core::Corridor;
use crate::models::Coordinate;

/// Default lifetime of a cached corridor
pub const DEFAULT_CORRIDOR_TTL: Duration = Duration::from_secs(60 * 60);

/// Time source for expiry decisions
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceSource {
    Provider,
    StraightLine,
}

/// Route, corridor and mileage for one origin/destination pair
#[derive(Debug, Clone)]
pub struct CorridorData {
    pub route: LineString<f64>,
    /// True when the provider had no geometry and the route is a straight line
    pub route_is_fallback: bool,
    pub corridor: Option<Corridor>,
    pub distance_miles: f64,
    pub distance_source: DistanceSource,
}

#[derive(Debug)]
struct CacheEntry {
    data: Arc<CorridorData>,
    width_miles: f64,
    created_at: Instant,
}

/// One key's value, or the computation currently producing it
#[derive(Debug, Default)]
struct Slot {
    cell: OnceCell<CacheEntry>,
}

/// Memoizes corridor computations by rounded endpoints and width
///
/// Concurrent misses on the same key share a single computation. The key map
/// is guarded by a synchronous mutex that is never held across an await.
#[derive(Debug)]
pub struct CorridorCache {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CorridorCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached corridor for this trip, or run `compute` and store it
    pub async fn get_or_compute<F, Fut>(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
        width_miles: f64,
        compute: F,
    ) -> Arc<CorridorData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CorridorData>,
    {
        let result = self
            .get_or_try_compute(origin, destination, width_miles, move || async move {
                Ok::<_, Infallible>(compute().await)
            })
            .await;

        match result {
            Ok(data) => data,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but an `Err` from
    /// `compute` is handed back to this caller and nothing is stored
    ///
    /// Waiters coalesced on the failed computation run their own `compute`.
    pub async fn get_or_try_compute<F, Fut, E>(
        &self,
        origin: &Coordinate,
        destination: &Coordinate,
        width_miles: f64,
        compute: F,
    ) -> Result<Arc<CorridorData>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CorridorData, E>>,
    {
        let key = CacheKey::corridor(origin, destination, width_miles);
        let slot = self.slot_for(&key, width_miles);

        let clock = Arc::clone(&self.clock);
        let mut computed = false;
        let entry = slot
            .cell
            .get_or_try_init(|| {
                computed = true;
                async move {
                    let data = compute().await?;
                    Ok::<_, E>(CacheEntry {
                        data: Arc::new(data),
                        width_miles,
                        created_at: clock.now(),
                    })
                }
            })
            .await;

        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Corridor cache miss: {}", key);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Corridor cache hit: {}", key);
        }

        match entry {
            Ok(entry) => Ok(Arc::clone(&entry.data)),
            Err(e) => {
                tracing::debug!("Corridor computation not stored: {}", key);
                Err(e)
            }
        }
    }

    /// Existing slot if it is fresh or still being computed, otherwise a new one
    fn slot_for(&self, key: &str, width_miles: f64) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();

        if let Some(slot) = slots.get(key) {
            match slot.cell.get() {
                None => return Arc::clone(slot),
                Some(entry) if self.is_fresh(entry, width_miles, now) => return Arc::clone(slot),
                Some(_) => tracing::debug!("Corridor cache entry expired: {}", key),
            }
        }

        let slot = Arc::new(Slot::default());
        slots.insert(key.to_string(), Arc::clone(&slot));
        slot
    }

    fn is_fresh(&self, entry: &CacheEntry, width_miles: f64, now: Instant) -> bool {
        now.saturating_duration_since(entry.created_at) < self.ttl && entry.width_miles == width_miles
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        slots.retain(|_, slot| match slot.cell.get() {
            None => true,
            Some(entry) => now.saturating_duration_since(entry.created_at) < self.ttl,
        });
        before - slots.len()
    }

    /// Number of completed entries, fresh or not yet evicted
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            entries: self.len() as u64,
            hit_count: hits,
            miss_count: misses,
            hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }
}

impl Default for CorridorCache {
    fn default() -> Self {
        Self::new(DEFAULT_CORRIDOR_TTL)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Endpoints rounded to 3 decimals (~100 m), then corridor width
    pub fn corridor(origin: &Coordinate, destination: &Coordinate, width_miles: f64) -> String {
        format!(
            "corridor:{:.3},{:.3}:{:.3},{:.3}:{}",
            origin.lat, origin.lng, destination.lat, destination.lng, width_miles
        )
    }

    /// Normalized geocoding query
    pub fn geocode(query: &str) -> String {
        format!("geocode:{}", query.trim().to_lowercase())
    }
}
