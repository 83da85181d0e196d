use std::time::{Duration, Instant};

use egui::{ColorImage, Key, Layout, RichText, TextureOptions};
use log::{info, warn};
use pitlane::{RenderedFrame, ViewCommand};

use super::{PALETTE_ORANGE, dashboard::DashboardApp};

const NAV_BUTTONS: [(&str, ViewCommand); 7] = [
    ("+", ViewCommand::ZoomIn),
    ("-", ViewCommand::ZoomOut),
    ("^", ViewCommand::PanUp),
    ("<", ViewCommand::PanLeft),
    ("⌄", ViewCommand::PanDown),
    (">", ViewCommand::PanRight),
    ("Reset", ViewCommand::Reset),
];

const NAV_KEYS: [(Key, ViewCommand); 7] = [
    (Key::Plus, ViewCommand::ZoomIn),
    (Key::Minus, ViewCommand::ZoomOut),
    (Key::ArrowUp, ViewCommand::PanUp),
    (Key::ArrowLeft, ViewCommand::PanLeft),
    (Key::ArrowDown, ViewCommand::PanDown),
    (Key::ArrowRight, ViewCommand::PanRight),
    (Key::R, ViewCommand::Reset),
];

impl DashboardApp {
    pub(crate) fn map_panel(&mut self, ctx: &egui::Context) {
        let mut commands: Vec<ViewCommand> = ctx.input(|input| {
            NAV_KEYS
                .iter()
                .filter(|(key, _)| input.key_pressed(*key))
                .map(|(_, command)| *command)
                .collect()
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(Layout::left_to_right(egui::Align::Center), |ui| {
                self.map_selector(ui);
                ui.add_space(20.);
                for (label, command) in NAV_BUTTONS {
                    if ui.button(label).clicked() {
                        commands.push(command);
                    }
                }
                ui.label(format!("zoom {:.2}", self.viewport.zoom()));
            });

            for command in commands.drain(..) {
                self.viewport.apply(command);
                self.map_dirty = true;
            }
            self.refresh_map(ctx);

            if let Some(status) = &self.map_status {
                ui.label(RichText::new(status).color(PALETTE_ORANGE));
            }
            match &self.map_texture {
                Some(texture) => {
                    ui.add(egui::Image::new(texture).shrink_to_fit());
                }
                None => {
                    ui.centered_and_justified(|ui| ui.label("No map to display"));
                }
            }
        });
    }

    fn map_selector(&mut self, ui: &mut egui::Ui) {
        let current = self.selected_map.clone();
        let names: Vec<String> = self.catalog.names().map(str::to_string).collect();

        egui::ComboBox::from_label("Map")
            .selected_text(current.as_deref().unwrap_or("--"))
            .show_ui(ui, |ui| {
                for name in names {
                    let label = name.clone();
                    ui.selectable_value(&mut self.selected_map, Some(name), label);
                }
            });

        if self.selected_map != current {
            info!("Switched map to {:?}", self.selected_map);
            // a new map starts from the full view
            self.viewport.reset();
            self.map_dirty = true;
        }
    }

    /// Recompose the map when the view changed or the refresh period elapsed.
    /// A failed render leaves the last good frame on screen.
    fn refresh_map(&mut self, ctx: &egui::Context) {
        let Some(map_name) = self.selected_map.clone() else {
            return;
        };
        let refresh = Duration::from_millis(self.app_config.map_refresh_ms);
        let due = self
            .last_map_render
            .is_none_or(|at| at.elapsed() >= refresh);
        if !self.map_dirty && !due {
            return;
        }
        self.last_map_render = Some(Instant::now());
        self.map_dirty = false;

        let snapshot = self.track.snapshot();
        match self.projector.render(
            &mut self.catalog,
            &map_name,
            &self.viewport,
            &snapshot,
            self.latest.as_ref(),
        ) {
            Ok(frame) => {
                self.upload_frame(ctx, &frame);
                self.map_status = None;
            }
            Err(e) => {
                let message = format!("Could not draw map '{}': {}", map_name, e);
                if self.map_status.as_deref() != Some(message.as_str()) {
                    warn!("{}", message);
                }
                self.map_status = Some(message);
            }
        }
    }

    fn upload_frame(&mut self, ctx: &egui::Context, frame: &RenderedFrame) {
        let size = [frame.image.width() as usize, frame.image.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, frame.image.as_raw());
        match &mut self.map_texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                self.map_texture = Some(ctx.load_texture("map", image, TextureOptions::LINEAR))
            }
        }
    }
}
