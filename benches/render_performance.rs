use std::{collections::HashMap, hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};
use pitlane::{
    GeoBox, GeoPoint, MapProjector, MapTile, PitlaneError, TelemetrySample, TileSource,
    TrackHistory, TrackSnapshot, Viewport,
};

struct BenchTiles(HashMap<String, Arc<MapTile>>);

impl TileSource for BenchTiles {
    fn lookup(&mut self, name: &str) -> Result<Arc<MapTile>, PitlaneError> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| PitlaneError::UnknownMap {
                name: name.to_string(),
            })
    }
}

fn bench_bounds() -> GeoBox {
    GeoBox::new("bench", 29.7200, -95.4050, 29.7150, -95.3950).unwrap()
}

fn bench_tiles() -> BenchTiles {
    let image = RgbaImage::from_fn(2000, 1250, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    BenchTiles(HashMap::from([(
        "bench".to_string(),
        Arc::new(MapTile::new(image, bench_bounds())),
    )]))
}

fn lap_track(points: usize) -> TrackSnapshot {
    let bounds = bench_bounds();
    let center = bounds.center();
    let track: Vec<GeoPoint> = (0..points)
        .map(|i| {
            let theta = i as f64 / points as f64 * std::f64::consts::TAU;
            GeoPoint::new(
                center.lat + bounds.lat_span() * 0.35 * theta.sin(),
                center.lon + bounds.lon_span() * 0.35 * theta.cos(),
            )
        })
        .collect();
    TrackSnapshot::from(track)
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_render");
    let projector = MapProjector::new();
    let mut tiles = bench_tiles();
    let sample = TelemetrySample {
        heading_deg: 135.0,
        ..Default::default()
    };

    for points in [0usize, 1_000, 10_000] {
        let track = lap_track(points);
        group.bench_function(format!("full_view_{}_points", points), |b| {
            b.iter(|| {
                black_box(
                    projector
                        .render(
                            &mut tiles,
                            "bench",
                            &Viewport::default(),
                            &track,
                            Some(&sample),
                        )
                        .unwrap(),
                )
            });
        });
    }

    let track = lap_track(1_000);
    let zoomed = Viewport::new(650.0, 300.0, 0.3);
    group.bench_function("zoomed_1000_points", |b| {
        b.iter(|| {
            black_box(
                projector
                    .render(&mut tiles, "bench", &zoomed, &track, Some(&sample))
                    .unwrap(),
            )
        });
    });

    group.finish();
}

fn bench_track_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_history");

    group.bench_function("append_10000", |b| {
        b.iter(|| {
            let track = TrackHistory::new();
            for i in 0..10_000 {
                track.append(GeoPoint::new(i as f64 * 1e-6, -95.4));
            }
            black_box(track.len())
        });
    });

    let track = TrackHistory::new();
    for i in 0..50_000 {
        track.append(GeoPoint::new(i as f64 * 1e-6, -95.4));
    }
    group.bench_function("snapshot_50000", |b| {
        b.iter(|| black_box(track.snapshot()));
    });

    group.finish();
}

criterion_group!(benches, bench_render, bench_track_history);
criterion_main!(benches);
