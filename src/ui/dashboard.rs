use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::{Duration, Instant},
};

use log::{error, info};
use pitlane::{
    AppConfig, MapCatalog, MapProjector, TelemetrySample, TrackHistory, Viewport,
    telemetry::LinkStats,
};

use super::dashboard_visuals;

/// Samples kept for the speed and RPM strip chart
pub(crate) const HISTORY_POINTS: usize = 200;
/// Upper bound on samples drained per UI frame so a burst cannot stall the UI
const MAX_SAMPLES_PER_REFRESH: usize = 50;

/// `DashboardApp` shows the live telemetry read-outs and the map view.
///
/// Telemetry arrives on `telemetry_receiver` from the link thread, which also
/// owns writing to `track` and stamping arrivals on `link_stats`. Text
/// read-outs follow every UI frame while the map is only recomposed every
/// `map_refresh_ms`, or right away after the user moves the view or picks
/// another map.
pub struct DashboardApp {
    pub(crate) telemetry_receiver: Receiver<TelemetrySample>,
    pub(crate) link_closed: bool,
    pub(crate) link_stats: LinkStats,
    pub(crate) latest: Option<TelemetrySample>,
    pub(crate) latest_received_at: Option<Instant>,
    pub(crate) recent: VecDeque<TelemetrySample>,
    pub(crate) track: TrackHistory,
    pub(crate) catalog: MapCatalog,
    pub(crate) projector: MapProjector,
    pub(crate) viewport: Viewport,
    pub(crate) selected_map: Option<String>,
    pub(crate) map_texture: Option<egui::TextureHandle>,
    pub(crate) last_map_render: Option<Instant>,
    pub(crate) map_dirty: bool,
    pub(crate) map_status: Option<String>,
    pub(crate) app_config: AppConfig,
}

impl DashboardApp {
    pub fn new(
        telemetry_receiver: Receiver<TelemetrySample>,
        link_stats: LinkStats,
        track: TrackHistory,
        catalog: MapCatalog,
        selected_map: Option<String>,
        app_config: AppConfig,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        cc.egui_ctx.set_visuals(dashboard_visuals());

        Self {
            telemetry_receiver,
            link_closed: false,
            link_stats,
            latest: None,
            latest_received_at: None,
            recent: VecDeque::with_capacity(HISTORY_POINTS),
            track,
            catalog,
            projector: MapProjector::new(),
            viewport: Viewport::default(),
            selected_map,
            map_texture: None,
            last_map_render: None,
            map_dirty: true,
            map_status: None,
            app_config,
        }
    }

    fn drain_telemetry(&mut self) {
        for _ in 0..MAX_SAMPLES_PER_REFRESH {
            match self.telemetry_receiver.try_recv() {
                Ok(sample) => {
                    self.latest_received_at = Some(Instant::now());
                    if self.recent.len() == HISTORY_POINTS {
                        self.recent.pop_front();
                    }
                    self.recent.push_back(sample.clone());
                    self.latest = Some(sample);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.link_closed {
                        info!("Telemetry link closed");
                        self.link_closed = true;
                    }
                    break;
                }
            }
        }
    }

    fn since_receipt(&self) -> Duration {
        self.latest_received_at
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }

    /// Heartbeat age reported by the vehicle plus the time since that report arrived
    pub(crate) fn heartbeat_age_s(&self) -> Option<f64> {
        let since_receipt = self.since_receipt();
        self.latest
            .as_ref()
            .map(|sample| sample.heartbeat_age_after(since_receipt))
    }

    pub(crate) fn link_lost(&self) -> bool {
        let since_receipt = self.since_receipt();
        self.latest.as_ref().is_none_or(|sample| {
            sample.link_lost_after(since_receipt, self.app_config.link_timeout_s)
        })
    }
}

impl eframe::App for DashboardApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.app_config.selected_map = self.selected_map.clone();
        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_telemetry();

        if let Some(outer_rect) = ctx.input(|is| is.viewport().outer_rect) {
            self.app_config.window_position = outer_rect.min.into();
        }

        self.status_bar(ctx);
        self.readouts_panel(ctx);
        self.map_panel(ctx);

        ctx.request_repaint_after(Duration::from_millis(self.app_config.telemetry_refresh_ms));
    }
}
