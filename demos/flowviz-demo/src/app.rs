use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver};
use eframe::{App as EframeApp, CreationContext, Frame};
use egui::{CentralPanel, Color32, Context, RichText, ScrollArea, SidePanel, TextEdit, Ui};
use flowviz::{
    events::Event, AnalysisSession, AnalysisSettings, AnalysisState, GraphCanvas,
    PlaybackControls, SettingsInteraction, SettingsNavigation, Trace, TracePlayer,
};
use instant::Instant;
use log::{error, info};

use crate::analyzer;

const HEADING: &str = "flowviz";
const SAMPLE_SOURCE: &str = "total = 0
for n in range(3):
total = total + n
if total > 2:
print(total)
return total";

const SAMPLE_TRACE: &str = r#"{"steps":[
  {"lineNumber":1,"code":"total = 0","explanation":"Start the running total at zero.","variables":{"total":0}},
  {"lineNumber":2,"code":"for n in range(3):","explanation":"Enter the loop with n = 0.","variables":{"total":0,"n":0}},
  {"lineNumber":3,"code":"total = total + n","explanation":"Add n to the total.","variables":{"total":0,"n":0}},
  {"lineNumber":2,"code":"for n in range(3):","explanation":"Next iteration, n = 1.","variables":{"total":0,"n":1}},
  {"lineNumber":3,"code":"total = total + n","explanation":"Add n to the total.","variables":{"total":1,"n":1}},
  {"lineNumber":2,"code":"for n in range(3):","explanation":"Last iteration, n = 2.","variables":{"total":1,"n":2}},
  {"lineNumber":3,"code":"total = total + n","explanation":"Add n to the total.","variables":{"total":3,"n":2}},
  {"lineNumber":4,"code":"if total > 2:","explanation":"3 is greater than 2, take the branch.","variables":{"total":3,"n":2}},
  {"lineNumber":5,"code":"print(total)","explanation":"Print the total.","variables":{"total":3,"n":2},"output":"3"},
  {"lineNumber":6,"code":"return total","explanation":"Return the total.","variables":{"total":3,"n":2}}
]}"#;

const COLOR_ERROR: Color32 = Color32::from_rgb(255, 64, 64);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct App {
    source: String,
    canvas: GraphCanvas,
    events: Receiver<Event>,
    analysis: AnalysisSession<String>,
    player: TracePlayer,
}

impl App {
    pub fn new(_: &CreationContext<'_>) -> Self {
        let (tx, rx) = unbounded();
        let canvas = GraphCanvas::default()
            .with_interactions(
                SettingsInteraction::default()
                    .with_dragging_enabled(true)
                    .with_node_selection_enabled(true),
            )
            .with_navigations(SettingsNavigation::default().with_fit_on_load(true))
            .with_events(tx);

        let mut analysis = AnalysisSession::new(AnalysisSettings::default());
        analysis.input_changed(SAMPLE_SOURCE, Instant::now());

        let mut player = TracePlayer::default();
        match Trace::from_json(SAMPLE_TRACE) {
            Ok(trace) => player.load(trace),
            Err(err) => error!("sample trace rejected: {err}"),
        }

        Self {
            source: SAMPLE_SOURCE.to_string(),
            canvas,
            events: rx,
            analysis,
            player,
        }
    }

    fn handle_analysis(&mut self, ctx: &Context) {
        let now = Instant::now();
        if self.analysis.poll(now, &analyzer::line_flow) {
            if let AnalysisState::Ready(json) = self.analysis.state() {
                if let Err(err) = self.canvas.load_json(json) {
                    error!("analysis produced an invalid graph: {err}");
                }
            }
        }

        if let AnalysisState::Pending = self.analysis.state() {
            let wait = self
                .analysis
                .time_until_fire(now)
                .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL));
            ctx.request_repaint_after(wait);
        }
    }

    fn handle_events(&mut self) {
        self.events.try_iter().for_each(|e| match e {
            Event::Pan(_) | Event::Zoom(_) | Event::NodeMove(_) => log::trace!("{e:?}"),
            _ => info!("{e:?}"),
        });
    }

    fn draw_source(&mut self, ui: &mut Ui) {
        ui.heading(HEADING);
        ui.label("Edit the source; the flow diagram follows after a short pause.");
        let resp = ui.add(
            TextEdit::multiline(&mut self.source)
                .code_editor()
                .desired_rows(8),
        );
        if resp.changed() {
            self.analysis.input_changed(self.source.clone(), Instant::now());
        }

        let mut retry = false;
        match self.analysis.state() {
            AnalysisState::Idle => {}
            AnalysisState::Pending => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("analyzing");
                });
            }
            AnalysisState::Ready(_) => {
                ui.label(format!("analysis {}", self.analysis.generation()));
            }
            AnalysisState::Failed(err) => {
                ui.label(RichText::new(err.to_string()).color(COLOR_ERROR));
                retry = ui.button("Retry").clicked();
            }
        }
        if retry {
            self.analysis.retry(Instant::now());
        }

        ui.horizontal(|ui| {
            let now = Instant::now();
            if ui.button("+").clicked() {
                self.canvas.zoom_in(now);
            }
            if ui.button("-").clicked() {
                self.canvas.zoom_out(now);
            }
            if ui.button("1:1").clicked() {
                self.canvas.reset_zoom(now);
            }
            if ui.button("Fit").clicked() {
                self.canvas.fit(now);
            }
        });
    }

    fn draw_trace(&mut self, ui: &mut Ui) {
        ui.separator();
        ui.label("Execution trace");
        ui.add(PlaybackControls::new(&mut self.player));

        if let Some(step) = self.player.current() {
            if let Some(line) = step.location.line {
                ui.monospace(format!("{line:>3} | {}", step.location.code));
            } else {
                ui.monospace(&step.location.code);
            }
            ui.label(&step.narrative);
            for (name, value) in &step.variables {
                ui.monospace(format!("{name} = {value}"));
            }
        }

        let outputs = self.player.outputs_so_far();
        if !outputs.is_empty() {
            ui.separator();
            ScrollArea::vertical().max_height(80.).show(ui, |ui| {
                outputs.iter().for_each(|o| {
                    ui.monospace(*o);
                });
            });
        }
    }
}

impl EframeApp for App {
    fn update(&mut self, ctx: &Context, _: &mut Frame) {
        self.handle_analysis(ctx);

        SidePanel::right("side_panel").show(ctx, |ui| {
            self.draw_source(ui);
            self.draw_trace(ui);
        });
        CentralPanel::default().show(ctx, |ui| {
            ui.add(&mut self.canvas);
        });

        self.handle_events();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        info!("closing, analysis cache held {} entries", self.analysis.cache().len());
    }
}
