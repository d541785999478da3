use crossbeam::channel::Sender;
use egui::{Align2, FontId, Pos2, Rect, Response, Sense, Ui, Vec2, Widget};
use instant::Instant;
use petgraph::stable_graph::NodeIndex;

use crate::{
    draw::{FontsMeasure, GraphRenderer, Scene, TextMeasure},
    events::{
        Event, PayloadLayoutSettled, PayloadNodeClick, PayloadNodeDeselect, PayloadNodeDragEnd,
        PayloadNodeDragStart, PayloadNodeMove, PayloadNodeSelect, PayloadPan, PayloadZoom,
    },
    viewport::{Transform, ViewportController},
    Error, ForceSettings, Graph, LayoutEngine, SettingsInteraction, SettingsNavigation,
    SettingsStyle,
};

/// What the canvas currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasState {
    /// Nothing loaded yet, or an empty graph.
    Empty,
    Ready,
    /// The last input was rejected. Nothing is drawn until a new graph is loaded.
    Error(Error),
}

/// Interactive flow diagram: owns the graph, its layout and the viewport.
///
/// Every gesture is also available as a method taking widget-local screen coordinates, so
/// hosts and tests can drive the canvas without egui input. The [`Widget`] implementation maps
/// egui responses onto these methods.
pub struct GraphCanvas {
    g: Graph,
    layout: LayoutEngine,
    viewport: ViewportController,
    state: CanvasState,

    settings_interaction: SettingsInteraction,
    settings_style: SettingsStyle,
    force_settings: ForceSettings,
    seed: Option<u64>,

    selected: Option<NodeIndex>,
    dragged: Option<NodeIndex>,
    centered: bool,
    settled_reported: bool,
    load_fit_pending: bool,
    scene: Option<Scene>,

    events_publisher: Option<Sender<Event>>,
}

impl Default for GraphCanvas {
    fn default() -> Self {
        Self::new(Graph::default())
    }
}

impl GraphCanvas {
    pub fn new(g: Graph) -> Self {
        let force_settings = ForceSettings::default();
        let mut canvas = Self {
            layout: LayoutEngine::from_positions(force_settings.clone(), Vec::new()),
            g: Graph::default(),
            viewport: ViewportController::default(),
            state: CanvasState::Empty,
            settings_interaction: SettingsInteraction::default(),
            settings_style: SettingsStyle::default(),
            force_settings,
            seed: None,
            selected: None,
            dragged: None,
            centered: false,
            settled_reported: false,
            load_fit_pending: false,
            scene: None,
            events_publisher: None,
        };
        canvas.set_graph(g);
        canvas
    }

    pub fn with_interactions(mut self, settings: SettingsInteraction) -> Self {
        self.settings_interaction = settings;
        self
    }

    pub fn with_navigations(mut self, settings: SettingsNavigation) -> Self {
        self.viewport.set_settings(settings);
        self
    }

    pub fn with_styles(mut self, settings: SettingsStyle) -> Self {
        self.settings_style = settings;
        self
    }

    /// Applies to the current and every later layout.
    pub fn with_force_settings(mut self, settings: ForceSettings) -> Self {
        self.layout.set_settings(settings.clone());
        self.force_settings = settings;
        self
    }

    /// Seeds initial positions of every later loaded graph. Also reseeds the current one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.layout = self.new_layout();
        self
    }

    /// Publishes interaction events to `events_publisher`.
    pub fn with_events(mut self, events_publisher: Sender<Event>) -> Self {
        self.events_publisher = Some(events_publisher);
        self
    }

    fn new_layout(&self) -> LayoutEngine {
        match self.seed {
            Some(seed) => LayoutEngine::with_seed(&self.g, self.force_settings.clone(), seed),
            None => LayoutEngine::new(&self.g, self.force_settings.clone()),
        }
    }

    /// Replaces the graph wholesale and restarts the layout.
    pub fn set_graph(&mut self, g: Graph) {
        self.state = if g.is_empty() {
            CanvasState::Empty
        } else {
            CanvasState::Ready
        };
        self.g = g;
        self.layout = self.new_layout();
        self.selected = None;
        self.dragged = None;
        self.centered = false;
        self.settled_reported = false;
        self.load_fit_pending = true;
        self.scene = None;
        log::debug!(
            "canvas loaded graph with {} nodes and {} links",
            self.g.node_count(),
            self.g.edge_count()
        );
    }

    /// Shows `err` instead of a graph.
    pub fn set_error(&mut self, err: Error) {
        log::debug!("canvas showing error: {err}");
        self.set_graph(Graph::default());
        self.state = CanvasState::Error(err);
    }

    /// Decodes and validates `json` and loads it. Invalid input is rejected wholesale: the
    /// canvas switches to [`CanvasState::Error`] and the error is returned.
    pub fn load_json(&mut self, json: &str) -> Result<(), Error> {
        match Graph::from_json(json) {
            Ok(g) => {
                self.set_graph(g);
                Ok(())
            }
            Err(err) => {
                self.set_error(err.clone());
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    pub fn graph(&self) -> &Graph {
        &self.g
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutEngine {
        &mut self.layout
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    pub fn selected(&self) -> Option<NodeIndex> {
        self.selected
    }

    pub fn dragged(&self) -> Option<NodeIndex> {
        self.dragged
    }

    /// Scene of the last [`GraphCanvas::render`].
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Tells the canvas its size. The first time a graph is shown its layout is centered in it.
    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport.set_viewport_size(size);
        if !self.centered && size.x > 0.0 && size.y > 0.0 {
            self.layout.recenter((size / 2.0).to_pos2());
            self.centered = true;
        }
    }

    /// Advances the viewport animation and, while unsettled, the layout by one tick.
    /// Returns `true` while another frame is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let animating = self.viewport.advance(now);
        if self.state != CanvasState::Ready {
            return animating;
        }

        if !self.layout.is_settled() {
            self.layout.apply_tick(&self.g);
            self.settled_reported = false;
        }
        if self.layout.is_settled() && !self.settled_reported {
            self.settled_reported = true;
            log::debug!("layout settled after {} ticks", self.layout.ticks());
            self.publish_event(Event::LayoutSettled(PayloadLayoutSettled {
                ticks: self.layout.ticks(),
            }));
            if self.load_fit_pending && self.viewport.settings().fit_on_load {
                self.fit(now);
            }
            self.load_fit_pending = false;
        }

        animating || self.viewport.is_animating() || !self.layout.is_settled()
    }

    /// Renders into the absolute screen rect `rect` and keeps the scene for hit testing.
    pub fn render(&mut self, rect: Rect, measure: &dyn TextMeasure) -> Option<&Scene> {
        self.scene = GraphRenderer::new(&self.settings_style)
            .with_selected(self.selected)
            .with_dragged(self.dragged)
            .render(&self.g, &self.layout, &self.viewport.transform(), rect, measure);
        self.scene.as_ref()
    }

    /// Topmost node under a widget-local screen position, per the last rendered scene.
    pub fn node_at(&self, local: Pos2) -> Option<NodeIndex> {
        let world = self.viewport.screen_to_world(local);
        self.scene.as_ref().and_then(|s| s.node_at(world))
    }

    fn node_id(&self, idx: NodeIndex) -> String {
        self.g
            .node(idx)
            .map(|n| n.id().to_owned())
            .unwrap_or_default()
    }

    /// Starts dragging the node under `local`, pinning it to the pointer.
    /// Returns the node, or `None` when the gesture should pan instead.
    pub fn begin_drag(&mut self, local: Pos2) -> Option<NodeIndex> {
        if !self.settings_interaction.dragging_enabled {
            return None;
        }
        let idx = self.node_at(local)?;
        if !self.layout.pin_index(idx, self.viewport.screen_to_world(local)) {
            return None;
        }
        self.dragged = Some(idx);
        self.publish_event(Event::NodeDragStart(PayloadNodeDragStart {
            id: self.node_id(idx),
        }));
        Some(idx)
    }

    /// Moves the dragged node to `local`.
    pub fn drag_to(&mut self, local: Pos2) {
        let Some(idx) = self.dragged else {
            return;
        };
        let world = self.viewport.screen_to_world(local);
        if self.layout.pin_index(idx, world) {
            self.publish_event(Event::NodeMove(PayloadNodeMove {
                id: self.node_id(idx),
                new_pos: [world.x, world.y],
            }));
        }
    }

    /// Hands the dragged node back to the simulation.
    pub fn end_drag(&mut self) {
        let Some(idx) = self.dragged.take() else {
            return;
        };
        self.layout.release_index(idx);
        self.publish_event(Event::NodeDragEnd(PayloadNodeDragEnd {
            id: self.node_id(idx),
        }));
    }

    /// Selects the node under `local`, or clears the selection on empty canvas.
    /// Clicking the selected node again deselects it.
    pub fn click(&mut self, local: Pos2) {
        let si = &self.settings_interaction;
        let clicking = si.node_clicking_enabled || si.node_selection_enabled;
        let selecting = si.node_selection_enabled;
        if !clicking {
            return;
        }

        let Some(idx) = self.node_at(local) else {
            if selecting {
                self.deselect();
            }
            return;
        };

        self.publish_event(Event::NodeClick(PayloadNodeClick {
            id: self.node_id(idx),
        }));
        if !selecting {
            return;
        }
        if self.selected == Some(idx) {
            self.deselect();
            return;
        }
        self.deselect();
        self.selected = Some(idx);
        self.publish_event(Event::NodeSelect(PayloadNodeSelect {
            id: self.node_id(idx),
        }));
    }

    fn deselect(&mut self) {
        if let Some(idx) = self.selected.take() {
            self.publish_event(Event::NodeDeselect(PayloadNodeDeselect {
                id: self.node_id(idx),
            }));
        }
    }

    /// Immediate pan by a screen delta. Ignored while a node is dragged.
    pub fn pan(&mut self, delta: Vec2) {
        if !self.viewport.settings().zoom_and_pan_enabled || self.dragged.is_some() {
            return;
        }
        let before = self.viewport.transform();
        self.viewport.pan_by(delta);
        self.publish_transform_change(before, self.viewport.transform());
    }

    /// Immediate zoom by `factor` around `anchor` (widget-local), canvas center when `None`.
    pub fn scroll_zoom(&mut self, factor: f32, anchor: Option<Pos2>) {
        if !self.viewport.settings().zoom_and_pan_enabled {
            return;
        }
        let before = self.viewport.transform();
        self.viewport.zoom_by(factor, anchor);
        self.publish_transform_change(before, self.viewport.transform());
    }

    pub fn zoom_in(&mut self, now: Instant) {
        let before = self.viewport.target();
        self.viewport.zoom_in(now);
        self.publish_transform_change(before, self.viewport.target());
    }

    pub fn zoom_out(&mut self, now: Instant) {
        let before = self.viewport.target();
        self.viewport.zoom_out(now);
        self.publish_transform_change(before, self.viewport.target());
    }

    pub fn reset_zoom(&mut self, now: Instant) {
        let before = self.viewport.target();
        self.viewport.reset_transform(now);
        self.publish_transform_change(before, self.viewport.target());
    }

    /// Eases the viewport so the whole graph is visible.
    pub fn fit(&mut self, now: Instant) {
        let bounds = self.content_bounds();
        if !bounds.is_finite() {
            return;
        }
        let before = self.viewport.target();
        self.viewport.fit_to_rect(bounds, now);
        self.publish_transform_change(before, self.viewport.target());
    }

    /// World space bounds of the graph including node shapes when a scene is available.
    fn content_bounds(&self) -> Rect {
        match &self.scene {
            Some(scene) if !scene.nodes().is_empty() => scene
                .nodes()
                .iter()
                .fold(Rect::NOTHING, |r, (_, geom)| r.union(geom.bounding_rect())),
            _ => self.layout.bounds(),
        }
    }

    fn publish_transform_change(&self, before: Transform, after: Transform) {
        if after.scale != before.scale {
            self.publish_event(Event::Zoom(PayloadZoom {
                diff: after.scale - before.scale,
                new_zoom: after.scale,
            }));
        }
        let diff = after.translate - before.translate;
        if diff != Vec2::ZERO {
            self.publish_event(Event::Pan(PayloadPan {
                diff: diff.into(),
                new_pan: after.translate.into(),
            }));
        }
    }

    fn publish_event(&self, event: Event) {
        if let Some(sender) = &self.events_publisher {
            if sender.send(event).is_err() {
                log::trace!("event receiver dropped");
            }
        }
    }

    fn handle_node_drag(&mut self, resp: &Response) {
        let local = resp.interact_pointer_pos().map(|p| local_pos(resp, p));

        if resp.drag_started() {
            if let Some(local) = local {
                self.begin_drag(local);
            }
        }

        if resp.dragged() {
            match (self.dragged, local) {
                (Some(_), Some(local)) => self.drag_to(local),
                (None, _) if resp.drag_delta() != Vec2::ZERO => self.pan(resp.drag_delta()),
                _ => {}
            }
        }

        if resp.drag_stopped() {
            self.end_drag();
        }
    }

    fn handle_zoom(&mut self, ui: &Ui, resp: &Response) {
        if !resp.hovered() {
            return;
        }
        let (zoom_delta, scroll, hover) = ui.input(|i| {
            (
                i.zoom_delta(),
                i.smooth_scroll_delta.y,
                i.pointer.hover_pos(),
            )
        });
        let anchor = hover.map(|p| local_pos(resp, p));

        if zoom_delta != 1.0 {
            self.scroll_zoom(zoom_delta, anchor);
        } else if scroll != 0.0 {
            let step = self.viewport.settings().wheel_zoom_speed * scroll.signum();
            self.scroll_zoom(1.0 + step, anchor);
        }
    }

    fn handle_click(&mut self, resp: &Response) {
        if !resp.clicked() {
            return;
        }
        if let Some(p) = resp.interact_pointer_pos() {
            self.click(local_pos(resp, p));
        }
    }

    fn paint_message(ui: &Ui, rect: Rect, text: &str, error: bool) {
        let color = if error {
            ui.visuals().error_fg_color
        } else {
            ui.visuals().weak_text_color()
        };
        ui.painter().text(
            rect.center(),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(14.0),
            color,
        );
    }
}

/// Convert a screen-space position to widget-local position
fn local_pos(resp: &Response, p: Pos2) -> Pos2 {
    (p - resp.rect.left_top()).to_pos2()
}

impl Widget for &mut GraphCanvas {
    fn ui(self, ui: &mut Ui) -> Response {
        let (resp, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let now = Instant::now();
        self.set_viewport_size(resp.rect.size());

        match &self.state {
            CanvasState::Error(err) => {
                GraphCanvas::paint_message(ui, resp.rect, &err.to_string(), true);
                return resp;
            }
            CanvasState::Empty => {
                GraphCanvas::paint_message(ui, resp.rect, "No graph to show", false);
                return resp;
            }
            CanvasState::Ready => {}
        }

        self.handle_node_drag(&resp);
        self.handle_zoom(ui, &resp);
        self.handle_click(&resp);

        let needs_repaint = self.tick(now);

        let measure = FontsMeasure::new(ui.ctx());
        if let Some(scene) = self.render(resp.rect, &measure) {
            scene.paint(&painter);
        }

        if needs_repaint || self.dragged.is_some() {
            ui.ctx().request_repaint();
        }

        resp
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        draw::MonospaceMeasure,
        input::{RawLink, RawNode},
    };

    const SIZE: Vec2 = Vec2::new(800.0, 600.0);

    fn canvas() -> (GraphCanvas, crossbeam::channel::Receiver<Event>) {
        let g = Graph::build(
            vec![
                RawNode::new("start").with_kind("start"),
                RawNode::new("work"),
                RawNode::new("end").with_kind("end"),
            ],
            vec![RawLink::new("start", "work"), RawLink::new("work", "end")],
        )
        .unwrap();
        let (tx, rx) = crossbeam::channel::unbounded();
        let mut canvas = GraphCanvas::new(g)
            .with_navigations(
                SettingsNavigation::default().with_animation_duration(Duration::ZERO),
            )
            .with_events(tx);
        *canvas.layout_mut() = LayoutEngine::from_positions(
            ForceSettings::default(),
            vec![
                Pos2::new(-200.0, 0.0),
                Pos2::new(0.0, 0.0),
                Pos2::new(200.0, 0.0),
            ],
        );
        canvas.set_viewport_size(SIZE);
        canvas.render(Rect::from_min_size(Pos2::ZERO, SIZE), &MonospaceMeasure::default());
        (canvas, rx)
    }

    fn screen_of(canvas: &GraphCanvas, id: &str) -> Pos2 {
        let idx = canvas.graph().index_of(id).unwrap();
        canvas
            .viewport()
            .world_to_screen(canvas.layout().position(idx).unwrap())
    }

    #[test]
    fn test_first_size_centers_layout() {
        let (canvas, _) = canvas();
        assert_eq!(canvas.layout().center(), Pos2::new(400.0, 300.0));
        assert_eq!(canvas.state(), &CanvasState::Ready);
    }

    #[test]
    fn test_seed_is_reproducible() {
        let g = Graph::from_json(r#"{"nodes":[{"id":"a"},{"id":"b"}],"links":[]}"#).unwrap();
        let a = GraphCanvas::new(g.clone()).with_seed(5);
        let b = GraphCanvas::new(g).with_seed(5);
        assert_eq!(a.layout().bodies(), b.layout().bodies());
    }

    #[test]
    fn test_drag_pins_and_release_hands_back() {
        let (mut canvas, rx) = canvas();
        let p = screen_of(&canvas, "work");
        let idx = canvas.begin_drag(p).unwrap();
        assert_eq!(canvas.graph().node(idx).unwrap().id(), "work");

        canvas.drag_to(Pos2::new(50.0, 60.0));
        canvas.tick(Instant::now());
        assert_eq!(canvas.layout().position(idx), Some(Pos2::new(50.0, 60.0)));

        canvas.end_drag();
        assert!(canvas.dragged().is_none());
        canvas.tick(Instant::now());
        assert_eq!(canvas.layout().position(idx), Some(Pos2::new(50.0, 60.0)));
        assert!(!canvas.layout().is_pinned(idx));

        let events: Vec<Event> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(Event::NodeDragStart(_))));
        assert!(events.contains(&Event::NodeMove(PayloadNodeMove {
            id: "work".into(),
            new_pos: [50.0, 60.0],
        })));
        assert!(events.contains(&Event::NodeDragEnd(PayloadNodeDragEnd { id: "work".into() })));
    }

    #[test]
    fn test_drag_on_empty_canvas_does_not_grab() {
        let (mut canvas, _) = canvas();
        assert!(canvas.begin_drag(Pos2::new(-500.0, -500.0)).is_none());
        canvas.pan(Vec2::new(10.0, 0.0));
        assert_eq!(canvas.transform().translate, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_click_toggles_selection() {
        let (mut canvas, rx) = canvas();
        let p = screen_of(&canvas, "end");
        canvas.click(p);
        let idx = canvas.graph().index_of("end");
        assert_eq!(canvas.selected(), idx);
        canvas.click(p);
        assert_eq!(canvas.selected(), None);

        canvas.click(p);
        canvas.click(Pos2::new(-500.0, -500.0));
        assert_eq!(canvas.selected(), None);

        let selects = rx
            .try_iter()
            .filter(|e| matches!(e, Event::NodeSelect(_)))
            .count();
        assert_eq!(selects, 2);
    }

    #[test]
    fn test_selection_disabled_only_clicks() {
        let (canvas, rx) = canvas();
        let mut canvas = canvas.with_interactions(
            SettingsInteraction::default().with_node_selection_enabled(false),
        );
        canvas.click(screen_of(&canvas, "start"));
        assert_eq!(canvas.selected(), None);
        assert!(matches!(rx.try_recv(), Ok(Event::NodeClick(_))));
    }

    #[test]
    fn test_zoom_buttons_clamp_and_reset() {
        let (mut canvas, _) = canvas();
        let now = Instant::now();
        for _ in 0..50 {
            canvas.zoom_in(now);
        }
        assert_eq!(canvas.transform().scale, 4.0);
        canvas.reset_zoom(now);
        assert_eq!(canvas.transform(), Transform::IDENTITY);
        for _ in 0..50 {
            canvas.zoom_out(now);
        }
        assert_eq!(canvas.transform().scale, 0.1);
    }

    #[test]
    fn test_fit_shows_every_node() {
        let (mut canvas, _) = canvas();
        canvas.fit(Instant::now());
        for id in ["start", "work", "end"] {
            let p = screen_of(&canvas, id);
            assert!(p.x >= 0.0 && p.x <= SIZE.x && p.y >= 0.0 && p.y <= SIZE.y);
        }
    }

    #[test]
    fn test_invalid_json_shows_error() {
        let (mut canvas, _) = canvas();
        let err = canvas
            .load_json(r#"{"nodes":[{"id":"a"}],"links":[{"source":"a","target":"b"}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::DanglingLink { .. }));
        assert_eq!(canvas.state(), &CanvasState::Error(err));
        assert!(canvas.graph().is_empty());
        assert!(!canvas.tick(Instant::now()));

        canvas
            .load_json(r#"{"nodes":[{"id":"a"}],"links":[]}"#)
            .unwrap();
        assert_eq!(canvas.state(), &CanvasState::Ready);
    }

    #[test]
    fn test_settled_event_published_once() {
        let (canvas, rx) = canvas();
        let mut canvas = canvas.with_force_settings(ForceSettings::default().with_max_ticks(5));
        let now = Instant::now();
        for _ in 0..20 {
            canvas.tick(now);
        }
        let settled = rx
            .try_iter()
            .filter(|e| matches!(e, Event::LayoutSettled(_)))
            .count();
        assert_eq!(settled, 1);
        assert!(!canvas.tick(now));
    }

    fn show(canvas: &mut GraphCanvas) {
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, SIZE)),
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.add(&mut *canvas);
            });
        });
    }

    #[test]
    fn test_widget_shows_every_state() {
        let mut empty = GraphCanvas::default();
        show(&mut empty);
        assert!(empty.scene().is_none());

        let mut failed = GraphCanvas::default();
        failed.set_error(Error::DuplicateNodeId("a".into()));
        show(&mut failed);
        assert!(failed.scene().is_none());

        let (mut ready, _) = canvas();
        show(&mut ready);
        let scene = ready.scene().unwrap();
        assert_eq!(scene.nodes().len(), 3);
    }
}
