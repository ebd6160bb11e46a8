//! brown-rs - Brown noise player
//!
//! One round button: click to start or stop the noise, circle the pointer
//! around the button to turn the volume up (clockwise) or down.
//!
//! Keyboard: Space plays/pauses, Escape stops.

use std::time::Instant;

use eframe::egui;

mod audio;
mod gesture;
mod player;
mod render;
mod settings;

use audio::NoiseEngine;
use gesture::Point;
use player::{LogSession, MediaCommand, PlaybackCoordinator, PlaybackState};
use render::{ButtonSettings, PlayButton};
use settings::AppSettings;

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting brown-rs");

    let settings = AppSettings::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 560.0])
            .with_title("brown-rs"),
        ..Default::default()
    };

    eframe::run_native(
        "brown-rs",
        options,
        Box::new(move |cc| Ok(Box::new(BrownApp::new(cc, &settings)))),
    )
}

/// Main application state
struct BrownApp {
    player: PlaybackCoordinator<NoiseEngine>,
    button: PlayButton,

    /// Pointer position seen last frame
    last_pointer: Option<egui::Pos2>,
    visible: bool,
    title: String,
}

impl BrownApp {
    fn new(_cc: &eframe::CreationContext<'_>, settings: &AppSettings) -> Self {
        let player = PlaybackCoordinator::new(
            NoiseEngine::new(),
            Box::new(LogSession::default()),
            settings.player_config(),
        );

        let button = PlayButton::with_settings(ButtonSettings {
            radius: settings.button_radius,
            band_width: settings.band_width,
            ..ButtonSettings::default()
        });

        Self {
            player,
            button,
            last_pointer: None,
            visible: true,
            title: "brown-rs".to_string(),
        }
    }

    /// Minimizing counts as going to the background
    fn handle_visibility(&mut self, ctx: &egui::Context, now: Instant) {
        let visible = ctx.input(|i| !i.viewport().minimized.unwrap_or(false));
        if visible != self.visible {
            self.visible = visible;
            self.player.visibility_changed(visible, now);
        }
    }

    /// Keyboard shortcuts stand in for the platform media keys
    fn handle_keys(&mut self, ctx: &egui::Context, now: Instant) {
        let (play_pause, stop) = ctx.input_mut(|i| {
            (
                i.consume_key(egui::Modifiers::NONE, egui::Key::Space),
                i.consume_key(egui::Modifiers::NONE, egui::Key::Escape),
            )
        });

        if play_pause {
            let command = if self.player.state() == PlaybackState::Playing {
                MediaCommand::Pause
            } else {
                MediaCommand::Play
            };
            self.player.handle_media_command(command, now);
        }
        if stop {
            self.player.handle_media_command(MediaCommand::Stop, now);
        }
    }

    /// Forward pointer motion to the volume gesture
    ///
    /// egui already reduces touch input to the first contact.
    fn handle_pointer(&mut self, ctx: &egui::Context, geometry: gesture::Geometry) {
        let (pos, released) = ctx.input(|i| (i.pointer.latest_pos(), i.pointer.any_released()));

        match pos {
            Some(pos) if Some(pos) != self.last_pointer => {
                self.player.pointer_moved(Point::new(pos.x, pos.y), geometry);
            }
            None if self.last_pointer.is_some() => self.player.pointer_ended(),
            _ => {}
        }
        if released {
            self.player.pointer_ended();
        }
        self.last_pointer = pos;
    }

    fn update_title(&mut self, ctx: &egui::Context) {
        let title = match self.player.state() {
            PlaybackState::Playing => format!("brown-rs (playing, {:.0}%)", self.player.volume().get() * 100.0),
            _ => "brown-rs".to_string(),
        };
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }
    }
}

fn suppress_scroll(input: &mut egui::InputState) {
    input.raw_scroll_delta = egui::Vec2::ZERO;
    input.smooth_scroll_delta = egui::Vec2::ZERO;
}

impl eframe::App for BrownApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        let now = Instant::now();
        self.handle_visibility(ctx, now);
        self.handle_keys(ctx, now);
        self.player.tick(now);

        // Circling the button shouldn't also scroll; must run before any panel reads input
        if self.player.view().adjusting {
            ctx.input_mut(suppress_scroll);
        }

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.small(&self.player.output().status);
                ui.separator();
                ui.small(format!("Volume: {:.0}%", self.player.volume().get() * 100.0));
                if let Some(err) = self.player.last_error() {
                    ui.separator();
                    ui.small(err.to_string());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let view = *self.player.view();
            let (response, geometry) = self.button.show(ui, &view);

            if response.clicked() {
                self.player.toggle(now);
            }
            self.handle_pointer(ctx, geometry);
        });

        self.update_title(ctx);
    }
}
