use egui::{Color32, Frame, Layout, RichText, Vec2b};
use egui_plot::{Legend, Line, PlotPoints};

use super::{PALETTE_MAROON, PALETTE_ORANGE, dashboard::DashboardApp, dashboard::HISTORY_POINTS};

const READOUT_PANEL_WIDTH: f32 = 220.;
const READOUT_TEXT_SIZE: f32 = 20.;
const NO_VALUE: &str = "--";

impl DashboardApp {
    pub(crate) fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("link-status")
            .min_height(30.)
            .frame(Frame::new().inner_margin(6.))
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(egui::Align::Center), |ui| {
                    ui.add_space(10.);
                    match self.heartbeat_age_s() {
                        Some(age) => ui.label(format!("Heartbeat Time: {:.2}", age)),
                        None => ui.label(format!("Heartbeat Time: {}", NO_VALUE)),
                    };
                    if self.link_lost() {
                        ui.label(RichText::new("LINK LOST").strong().color(Color32::RED));
                    }

                    ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_space(10.);
                        let gps = self
                            .latest
                            .as_ref()
                            .map(|s| s.gps_fix_type.label())
                            .unwrap_or(NO_VALUE);
                        ui.label(format!("GPS: {}", gps));
                        match self.link_stats.rate_hz() {
                            Some(rate) => ui.label(format!("{:.1} Hz", rate)),
                            None => ui.label(format!("{} Hz", NO_VALUE)),
                        };
                        if self.link_closed {
                            ui.label(RichText::new("link closed").color(PALETTE_MAROON));
                        }
                    });
                });
            });
    }

    pub(crate) fn readouts_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("readouts")
            .exact_width(READOUT_PANEL_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(10.);
                let sample = self.latest.as_ref();
                readout(ui, "Speed", sample.map(|s| format!("{:.1} mph", s.mph)));
                readout(ui, "Engine", sample.map(|s| format!("{:.1} rpm", s.rpm)));
                readout(
                    ui,
                    "Heading",
                    sample.map(|s| format!("{:.1} degrees", s.heading_deg)),
                );
                readout(ui, "Latitude", sample.map(|s| format!("{:.5}", s.lat)));
                readout(ui, "Longitude", sample.map(|s| format!("{:.5}", s.lon)));
                ui.label(format!("Track points: {}", self.track.len()));

                if let Some(sample) = sample
                    && sample.has_fix()
                    && let Some(entry) = self
                        .selected_map
                        .as_deref()
                        .and_then(|name| self.catalog.entry(name))
                    && !entry.bounds.contains(sample.position())
                {
                    ui.add_space(6.);
                    ui.label(RichText::new("Vehicle is off the map").color(PALETTE_ORANGE));
                }

                ui.separator();
                self.history_plot(ui);
            });
    }

    fn history_plot(&self, ui: &mut egui::Ui) {
        let mut speed_vec = Vec::<[f64; 2]>::with_capacity(self.recent.len());
        let mut rpm_vec = Vec::<[f64; 2]>::with_capacity(self.recent.len());
        for (i, sample) in self.recent.iter().enumerate() {
            speed_vec.push([i as f64, sample.mph]);
            // rpm shares the speed axis
            rpm_vec.push([i as f64, sample.rpm / 100.]);
        }

        egui_plot::Plot::new("history")
            .allow_drag(false)
            .allow_scroll(false)
            .allow_zoom(false)
            .include_x(0.)
            .include_x(HISTORY_POINTS as f64)
            .include_y(0.)
            .auto_bounds(Vec2b::new(false, true))
            .show_grid(false)
            .legend(Legend::default())
            .show_background(false)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new("Speed (mph)", PlotPoints::new(speed_vec)).color(PALETTE_ORANGE),
                );
                plot_ui.line(
                    Line::new("RPM / 100", PlotPoints::new(rpm_vec)).color(Color32::LIGHT_GRAY),
                );
            });
    }
}

fn readout(ui: &mut egui::Ui, label: &str, value: Option<String>) {
    ui.label(RichText::new(label).color(Color32::GRAY));
    ui.label(
        RichText::new(value.as_deref().unwrap_or(NO_VALUE))
            .size(READOUT_TEXT_SIZE)
            .strong(),
    );
    ui.add_space(4.);
}
