use std::path::Path;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

use crate::models::{parse_loads, CandidateLoad, LoadStatus};

/// Errors that can occur when seeding the load repository
#[derive(Debug, Error)]
pub enum LoadRepositoryError {
    #[error("Failed to read load file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse load file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory store of scraped load-board records
///
/// Records are kept in arrival order; re-ingesting an id replaces the earlier
/// record in place.
#[derive(Debug, Default)]
pub struct InMemoryLoadRepository {
    loads: RwLock<Vec<CandidateLoad>>,
}

impl InMemoryLoadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loads(loads: Vec<CandidateLoad>) -> Self {
        let repository = Self::new();
        repository.upsert(loads);
        repository
    }

    /// Seed from a JSON array of load records; malformed records are skipped
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadRepositoryError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let (loads, skipped) = parse_loads(serde_json::from_str(&raw)?);
        tracing::info!(
            "Seeded {} loads from {} ({} skipped)",
            loads.len(),
            path.as_ref().display(),
            skipped
        );
        Ok(Self::with_loads(loads))
    }

    /// Insert or replace records by id, returning how many were new
    pub fn upsert(&self, incoming: Vec<CandidateLoad>) -> usize {
        let mut loads = self.loads.write().unwrap_or_else(PoisonError::into_inner);
        let mut inserted = 0;

        for load in incoming {
            match loads.iter_mut().find(|existing| existing.id == load.id) {
                Some(existing) => *existing = load,
                None => {
                    loads.push(load);
                    inserted += 1;
                }
            }
        }

        inserted
    }

    /// Snapshot of loads still open for booking
    pub fn available(&self) -> Vec<CandidateLoad> {
        self.loads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|load| load.status == LoadStatus::Available)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.loads.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RateStructure, Stop, TrailerType};

    fn create_load(id: &str, status: LoadStatus) -> CandidateLoad {
        CandidateLoad {
            id: id.to_string(),
            status,
            pickup: Stop::new("Charlotte, NC", 35.2271, -80.8431),
            delivery: Stop::new("Raleigh, NC", 35.7796, -78.6382),
            equipment_type: TrailerType::DryVan,
            trailer_length_ft: 53,
            weight_lbs: 20000,
            linehaul_miles: 167.0,
            rate: RateStructure::Flat {
                rate: 600.0,
                fuel_surcharge: 50.0,
            },
            total_revenue: None,
            pickup_date: None,
            delivery_date: None,
            broker: None,
            shipper: None,
            freight_type: None,
        }
    }

    #[test]
    fn test_available_filters_status() {
        let repository = InMemoryLoadRepository::with_loads(vec![
            create_load("1", LoadStatus::Available),
            create_load("2", LoadStatus::Booked),
            create_load("3", LoadStatus::Available),
        ]);

        let ids: Vec<String> = repository.available().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(repository.len(), 3);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let repository = InMemoryLoadRepository::with_loads(vec![
            create_load("1", LoadStatus::Available),
            create_load("2", LoadStatus::Available),
        ]);

        let inserted = repository.upsert(vec![
            create_load("1", LoadStatus::Booked),
            create_load("9", LoadStatus::Available),
        ]);

        assert_eq!(inserted, 1);
        let ids: Vec<String> = repository.available().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["2", "9"]);
    }

    #[test]
    fn test_missing_seed_file() {
        let err = InMemoryLoadRepository::from_json_file("/nonexistent/loads.json").unwrap_err();
        assert!(matches!(err, LoadRepositoryError::Io(_)));
    }

    #[test]
    fn test_seed_file_skips_malformed_records() {
        let good = serde_json::to_value(create_load("1", LoadStatus::Available)).unwrap();
        let path = std::env::temp_dir().join(format!("backhaul-seed-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::json!([good, {"id": "2"}]).to_string()).unwrap();

        let repository = InMemoryLoadRepository::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(repository.len(), 1);
        assert_eq!(repository.available()[0].id, "1");
    }
}
