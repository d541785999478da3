use std::time::Duration;

use egui::{Button, Response, Slider, Ui, Widget};
use instant::Instant;

use super::{PlaybackState, TracePlayer};

/// Play, pause, step, reset and speed controls for a [`TracePlayer`].
///
/// Drives the player as well: every frame it performs the steps due and schedules a repaint
/// for the next one.
pub struct PlaybackControls<'a> {
    player: &'a mut TracePlayer,
    now: Instant,
}

impl<'a> PlaybackControls<'a> {
    pub fn new(player: &'a mut TracePlayer) -> Self {
        Self {
            player,
            now: Instant::now(),
        }
    }

    /// Overrides the frame time.
    pub fn at(mut self, now: Instant) -> Self {
        self.now = now;
        self
    }
}

impl Widget for PlaybackControls<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let Self { player, now } = self;
        player.tick(now);

        let state = player.state();
        let loaded = state != PlaybackState::Idle;
        let playing = state == PlaybackState::Playing;

        let resp = ui
            .horizontal(|ui| {
                if ui
                    .add_enabled(loaded, Button::new("⏮"))
                    .on_hover_text("Reset")
                    .clicked()
                {
                    log_rejected(player.reset());
                }
                if ui
                    .add_enabled(loaded && player.index() > 0, Button::new("◀"))
                    .on_hover_text("Step back")
                    .clicked()
                {
                    log_rejected(player.step_back());
                }

                if playing {
                    if ui.button("⏸").on_hover_text("Pause").clicked() {
                        log_rejected(player.pause());
                    }
                } else {
                    let can_play = matches!(state, PlaybackState::Ready | PlaybackState::Paused);
                    if ui
                        .add_enabled(can_play, Button::new("▶"))
                        .on_hover_text("Play")
                        .clicked()
                    {
                        log_rejected(player.play(now));
                    }
                }

                if ui
                    .add_enabled(
                        loaded && state != PlaybackState::Complete,
                        Button::new("▶|"),
                    )
                    .on_hover_text("Step forward")
                    .clicked()
                {
                    log_rejected(player.step_forward());
                }

                let settings = player.settings();
                let range = settings.min_interval.as_millis() as u64
                    ..=settings.max_interval.as_millis() as u64;
                let mut ms = player.interval().as_millis() as u64;
                if ui
                    .add(Slider::new(&mut ms, range).logarithmic(true).suffix(" ms"))
                    .changed()
                {
                    player.set_speed(Duration::from_millis(ms), now);
                }

                if loaded {
                    ui.label(format!("Step {} / {}", player.index() + 1, player.len()));
                }
            })
            .response;

        if let Some(wait) = player.time_until_next_tick(now) {
            ui.ctx().request_repaint_after(wait);
        }

        resp
    }
}

fn log_rejected<E: std::fmt::Display>(result: Result<(), E>) {
    if let Err(err) = result {
        log::debug!("playback control ignored: {err}");
    }
}
