// Criterion benchmarks for Backhaul Finder

use backhaul_finder::core::{build_corridor, build_corridor_within, haversine_distance, Matcher};
use backhaul_finder::models::{
    CandidateLoad, Coordinate, EquipmentProfile, LoadStatus, MatchRequest, RateStructure, RoutingMode, Stop,
    TrailerType,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::{Coord, LineString};

fn create_load(id: usize, lat: f64, lng: f64) -> CandidateLoad {
    CandidateLoad {
        id: id.to_string(),
        status: LoadStatus::Available,
        pickup: Stop::new(format!("pickup {}", id), lat, lng),
        delivery: Stop::new("Davidson, NC", 35.4993 - (id % 20) as f64 * 0.05, -80.8481),
        equipment_type: if id % 4 == 0 { TrailerType::Reefer } else { TrailerType::DryVan },
        trailer_length_ft: 53,
        weight_lbs: 20000 + (id % 30) as u32 * 1000,
        linehaul_miles: 50.0 + (id % 200) as f64,
        rate: RateStructure::PerMile {
            rate: 2.0 + (id % 10) as f64 * 0.1,
            fuel_surcharge_per_mile: 0.45,
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
        final_stop: Coordinate::new(35.2271, -80.8431),
        fleet_home: Coordinate::new(35.4993, -80.8481),
        equipment: EquipmentProfile {
            trailer_type: TrailerType::DryVan,
            trailer_length_ft: 53,
            weight_limit_lbs: 45000,
        },
        search_radius_miles: 75.0,
        routing_mode: RoutingMode::Direct,
    }
}

/// Zig-zag route from Charlotte towards Atlanta with `points` vertices
fn create_route(points: usize) -> LineString<f64> {
    (0..points)
        .map(|i| {
            let t = i as f64 / (points.max(2) - 1) as f64;
            Coord {
                x: -80.8431 - t * 3.545 + if i % 2 == 0 { 0.01 } else { -0.01 },
                y: 35.2271 - t * 1.478,
            }
        })
        .collect()
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(35.2271),
                black_box(-80.8431),
                black_box(35.4993),
                black_box(-80.8481),
            )
        });
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::new();
    let request = create_request();

    let mut group = c.benchmark_group("matching");

    for candidate_count in [10, 100, 1000, 10000].iter() {
        let candidates: Vec<CandidateLoad> = (0..*candidate_count)
            .map(|i| {
                let lat_offset = (i as f64 * 0.003) % 2.0 - 1.0;
                let lng_offset = (i as f64 * 0.007) % 2.0 - 1.0;
                create_load(i, 35.2271 + lat_offset, -80.8431 + lng_offset)
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("find_opportunities", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| matcher.find_opportunities(black_box(&request), black_box(&candidates)));
            },
        );
    }

    group.finish();
}

fn bench_corridor(c: &mut Criterion) {
    let mut group = c.benchmark_group("corridor");
    group.sample_size(20);

    for points in [2, 50, 400, 2000].iter() {
        let route = create_route(*points);

        group.bench_with_input(BenchmarkId::new("unclipped", points), points, |b, _| {
            b.iter(|| build_corridor_within(black_box(&route), black_box(20.0), None));
        });
        group.bench_with_input(BenchmarkId::new("clipped", points), points, |b, _| {
            b.iter(|| build_corridor(black_box(&route), black_box(20.0), true));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_haversine_distance, bench_matching, bench_corridor);

criterion_main!(benches);
