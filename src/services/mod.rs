// Service exports
pub mod cache;
pub mod corridors;
pub mod geocoder;
pub mod loads;
pub mod routing;

pub use cache::{CacheKey, CacheStats, Clock, CorridorCache, CorridorData, DistanceSource, ManualClock, SystemClock};
pub use corridors::CorridorService;
pub use geocoder::{GeocodeError, Geocoder, GeocoderConfig, LocationResolver, ProviderResolver, StaticTableResolver};
pub use loads::{InMemoryLoadRepository, LoadRepositoryError};
pub use routing::{RouteClient, RouteClientConfig, RouteError, RouteResult};
