// End to end checks of the map pipeline: catalog on disk, telemetry link,
// track history and frame composition

use std::{fs, io::Cursor, path::Path, sync::mpsc, time::Duration};

use image::{Rgba, RgbaImage};
use pitlane::{
    GeoBox, GeoPoint, GpsFixType, MapCatalog, MapProjector, PitlaneError, TelemetryProducer,
    TelemetrySample, TileSource, TrackHistory, ViewCommand, Viewport,
    map::projector::crop_rect,
    telemetry::{DemoTelemetryProducer, LinkStats, ReplayTelemetryProducer, collect_telemetry},
};
use tempfile::TempDir;

const CATALOG: &str = "Name,Filename,Lat_1,Lon_1,Lat_2,Lon_2
Test Track,track.png,10,20,0,30
Missing,missing.png,10,20,0,30
";

fn write_maps(dir: &Path) {
    RgbaImage::from_pixel(800, 500, Rgba([255, 255, 255, 255]))
        .save(dir.join("track.png"))
        .unwrap();
    fs::write(dir.join("locations.csv"), CATALOG).unwrap();
}

fn load_catalog(dir: &Path) -> MapCatalog {
    MapCatalog::load(&dir.join("locations.csv"), dir).unwrap()
}

fn fixed_sample(lat: f64, lon: f64, heading_deg: f64) -> TelemetrySample {
    TelemetrySample {
        mph: 12.5,
        rpm: 3100.,
        heading_deg,
        lat,
        lon,
        gps_fix_type: GpsFixType::Fix3D,
        heartbeat_age_s: 0.2,
    }
}

fn replay_of(samples: &[TelemetrySample]) -> ReplayTelemetryProducer<Cursor<Vec<u8>>> {
    let lines: Vec<String> = samples
        .iter()
        .map(|s| serde_json::to_string(s).unwrap())
        .collect();
    ReplayTelemetryProducer::from_reader(Cursor::new(lines.join("\n").into_bytes()))
}

#[test]
fn test_replay_drives_track_and_frame() {
    let dir = TempDir::new().unwrap();
    write_maps(dir.path());
    let mut catalog = load_catalog(dir.path());

    let mut no_fix = fixed_sample(9.0, 29.0, 0.0);
    no_fix.gps_fix_type = GpsFixType::NoFix;
    let samples = vec![
        fixed_sample(5.0, 25.0, 90.0),
        fixed_sample(5.0, 27.5, 90.0),
        no_fix,
        fixed_sample(2.5, 27.5, 180.0),
    ];

    let track = TrackHistory::new();
    let (tx, rx) = mpsc::channel();
    let stats = collect_telemetry(
        replay_of(&samples),
        track.clone(),
        tx,
        LinkStats::new(),
        Duration::ZERO,
    )
    .unwrap();

    assert_eq!(stats.samples(), 4);
    // samples without a fix reach the dashboard but not the track
    let received: Vec<TelemetrySample> = rx.try_iter().collect();
    assert_eq!(received, samples);
    assert_eq!(track.len(), 3);

    let latest = received.last();
    let frame = MapProjector::new()
        .render(
            &mut catalog,
            "Test Track",
            &Viewport::default(),
            &track.snapshot(),
            latest,
        )
        .unwrap();

    assert_eq!(frame.image.dimensions(), (1000, 625));
    assert_eq!(frame.track_segments(), 2);
    assert!(frame.has_compass());
    // horizontal leg from the canvas center towards the east
    assert_eq!(frame.image.get_pixel(600, 312).0, [0, 0, 0, 255]);
    // untouched map away from the overlay
    assert_eq!(frame.image.get_pixel(900, 100).0, [255, 255, 255, 255]);
}

#[test]
fn test_zoomed_view_scales_track_with_zoom() {
    let dir = TempDir::new().unwrap();
    write_maps(dir.path());
    let mut catalog = load_catalog(dir.path());
    let track = TrackHistory::new();
    track.append(GeoPoint::new(5.0, 25.0));
    track.append(GeoPoint::new(5.0, 26.0));

    let mut viewport = Viewport::default();
    for _ in 0..7 {
        viewport.apply(ViewCommand::ZoomIn);
    }
    let tile = catalog.lookup("Test Track").unwrap();
    let crop = crop_rect(&tile, &viewport.visible_region());
    // frame pixels per logical unit of the whole-pixel crop actually shown
    let scale = 1000.0 / (crop.width as f64 * 1000.0 / tile.width() as f64);
    let frame = MapProjector::new()
        .render(
            &mut catalog,
            "Test Track",
            &viewport,
            &track.snapshot(),
            Some(&fixed_sample(5.0, 26.0, 45.0)),
        )
        .unwrap();

    assert_eq!(frame.image.width(), 1000);
    assert_eq!(frame.track_segments(), 1);
    match &frame.commands[0] {
        pitlane::map::DrawCommand::Line { from, to, .. } => {
            // 100 logical units of track stretch with the crop
            assert!(((to.0 - from.0) as f64 - 100.0 * scale).abs() < 1e-3);
            assert_eq!(from.1, to.1);
        }
        other => panic!("expected a track line, got {:?}", other),
    }
}

#[test]
fn test_demo_laps_stay_on_the_map() {
    let dir = TempDir::new().unwrap();
    write_maps(dir.path());
    let mut catalog = load_catalog(dir.path());
    let bounds = catalog.entry("Test Track").unwrap().bounds;

    let mut producer = DemoTelemetryProducer::new(bounds, Duration::from_millis(50));
    producer.start().unwrap();
    let track = TrackHistory::new();
    let mut latest = None;
    for _ in 0..300 {
        let sample = producer.telemetry().unwrap().unwrap();
        assert!(bounds.contains(sample.position()));
        track.append(sample.position());
        latest = Some(sample);
    }

    let frame = MapProjector::new()
        .render(
            &mut catalog,
            "Test Track",
            &Viewport::default(),
            &track.snapshot(),
            latest.as_ref(),
        )
        .unwrap();
    assert_eq!(frame.track_segments(), 299);
}

#[test]
fn test_points_off_the_map_are_still_drawn() {
    let dir = TempDir::new().unwrap();
    write_maps(dir.path());
    let mut catalog = load_catalog(dir.path());
    let track = TrackHistory::new();
    track.append(GeoPoint::new(5.0, 25.0));
    // well north east of the map
    track.append(GeoPoint::new(20.0, 40.0));

    let frame = MapProjector::new()
        .render(
            &mut catalog,
            "Test Track",
            &Viewport::default(),
            &track.snapshot(),
            Some(&fixed_sample(20.0, 40.0, 0.0)),
        )
        .unwrap();

    assert_eq!(frame.track_segments(), 1);
    assert_eq!(frame.image.dimensions(), (1000, 625));
}

#[test]
fn test_catalog_errors_surface_to_caller() {
    let dir = TempDir::new().unwrap();
    write_maps(dir.path());
    let mut catalog = load_catalog(dir.path());

    assert!(matches!(
        catalog.lookup("Nowhere"),
        Err(PitlaneError::UnknownMap { .. })
    ));
    let result = MapProjector::new().render(
        &mut catalog,
        "Missing",
        &Viewport::default(),
        &TrackHistory::new().snapshot(),
        None,
    );
    assert!(matches!(result, Err(PitlaneError::MapLoad { .. })));

    assert!(matches!(
        MapCatalog::load(&dir.path().join("nope.csv"), dir.path()),
        Err(PitlaneError::CatalogIo { .. })
    ));
}

#[test]
fn test_link_stops_when_dashboard_hangs_up() {
    let bounds = GeoBox::new("demo", 10.0, 20.0, 0.0, 30.0).unwrap();
    let producer = DemoTelemetryProducer::new(bounds, Duration::from_millis(50));
    let track = TrackHistory::new();
    let (tx, rx) = mpsc::channel();
    drop(rx);

    let result = collect_telemetry(
        producer,
        track.clone(),
        tx,
        LinkStats::new(),
        Duration::ZERO,
    );

    assert!(matches!(
        result,
        Err(PitlaneError::TelemetryBroadcastError { .. })
    ));
    // the sample was recorded before the send failed
    assert_eq!(track.len(), 1);
}
