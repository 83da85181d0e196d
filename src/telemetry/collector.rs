use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc::Sender},
    thread,
    time::{Duration, Instant},
};

use log::{info, warn};
use simple_moving_average::{SMA, SumTreeSMA};

use crate::{PitlaneError, track::TrackHistory};

use super::{TelemetrySample, producer::TelemetryProducer};

const RATE_WINDOW: usize = 40;

struct Arrivals {
    samples: usize,
    last_arrival: Option<Instant>,
    intervals_s: SumTreeSMA<f64, f64, RATE_WINDOW>,
}

/// Sample counter and moving average of the arrival rate.
///
/// Arrivals are stamped by the link thread as samples come off the producer.
/// Cloning yields another handle onto the same counters, so the dashboard reads
/// the rate the link actually sees regardless of how late it drains.
#[derive(Clone)]
pub struct LinkStats {
    inner: Arc<Mutex<Arrivals>>,
}

impl Default for LinkStats {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Arrivals {
                samples: 0,
                last_arrival: None,
                intervals_s: SumTreeSMA::new(),
            })),
        }
    }
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, arrival: Instant) {
        let mut arrivals = self.lock();
        if let Some(last) = arrivals.last_arrival {
            arrivals
                .intervals_s
                .add_sample(arrival.saturating_duration_since(last).as_secs_f64());
        }
        arrivals.last_arrival = Some(arrival);
        arrivals.samples += 1;
    }

    pub fn samples(&self) -> usize {
        self.lock().samples
    }

    /// Average samples per second over the recent window
    pub fn rate_hz(&self) -> Option<f64> {
        let arrivals = self.lock();
        if arrivals.intervals_s.get_num_samples() == 0 {
            return None;
        }
        let average = arrivals.intervals_s.get_average();
        (average > 0.).then(|| 1. / average)
    }

    // counters stay consistent even if a holder panicked mid-update
    fn lock(&self) -> MutexGuard<'_, Arrivals> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Link loop: polls the producer every `refresh`, stamps each arrival on
/// `stats`, records every fixed position into `track` and forwards each sample
/// to the dashboard.
///
/// Returns when the producer runs dry. A dashboard that hangs up ends the loop
/// with [`PitlaneError::TelemetryBroadcastError`].
pub fn collect_telemetry(
    mut producer: impl TelemetryProducer,
    track: TrackHistory,
    telemetry_sender: Sender<TelemetrySample>,
    stats: LinkStats,
    refresh: Duration,
) -> Result<LinkStats, PitlaneError> {
    producer.start()?;
    let result = pump(&mut producer, &track, &telemetry_sender, &stats, refresh);
    producer.stop();

    if result.is_ok() {
        info!(
            "Telemetry stream ended after {} samples, {} track points",
            stats.samples(),
            track.len()
        );
    }
    result.map(|()| stats)
}

fn pump(
    producer: &mut impl TelemetryProducer,
    track: &TrackHistory,
    telemetry_sender: &Sender<TelemetrySample>,
    stats: &LinkStats,
    refresh: Duration,
) -> Result<(), PitlaneError> {
    loop {
        thread::sleep(refresh);
        let Some(sample) = producer.telemetry()? else {
            return Ok(());
        };
        stats.record(Instant::now());

        if sample.has_fix() {
            track.append(sample.position());
        }

        telemetry_sender.send(sample).map_err(|e| {
            warn!("Could not send telemetry sample: {}", e);
            PitlaneError::from(e)
        })?;
    }
}
