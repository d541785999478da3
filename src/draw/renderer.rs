use std::collections::HashMap;

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2};
use petgraph::stable_graph::NodeIndex;

use super::{
    edge_shape_builder::{control_point, EdgeShapeBuilder, TipProps},
    wrap_label, NodeGeometry, NodeStyle, TextMeasure,
};
use crate::{viewport::Transform, Graph, LayoutEngine, SettingsStyle};

/// Labels smaller than this on screen are not drawn.
const MIN_READABLE_FONT: f32 = 4.0;
const LOOP_SIZE: f32 = 1.0;
const LABEL_PADDING: Vec2 = Vec2::new(4.0, 2.0);

/// One line of text, screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub pos: Pos2,
    pub text: String,
    pub font_size: f32,
    pub color: Color32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    Shape(Shape),
    Text(TextItem),
}

/// Everything needed to paint one frame, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    items: Vec<SceneItem>,
    /// World space node geometry in paint order, topmost last.
    nodes: Vec<(NodeIndex, NodeGeometry)>,
    transform: Transform,
}

impl Scene {
    pub fn items(&self) -> &[SceneItem] {
        &self.items
    }

    pub fn nodes(&self) -> &[(NodeIndex, NodeGeometry)] {
        &self.nodes
    }

    /// Mapping the scene was painted with, including the target rect offset.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Topmost node under a world position.
    pub fn node_at(&self, world: Pos2) -> Option<NodeIndex> {
        self.nodes
            .iter()
            .rev()
            .find(|(_, geom)| geom.contains(world))
            .map(|(idx, _)| *idx)
    }

    /// Topmost node under an absolute screen position.
    pub fn node_at_screen(&self, screen: Pos2) -> Option<NodeIndex> {
        self.node_at(self.transform.screen_to_world(screen))
    }

    pub fn paint(&self, painter: &Painter) {
        for item in &self.items {
            match item {
                SceneItem::Shape(shape) => {
                    painter.add(shape.clone());
                }
                SceneItem::Text(t) => {
                    painter.text(
                        t.pos,
                        Align2::CENTER_CENTER,
                        &t.text,
                        FontId::proportional(t.font_size),
                        t.color,
                    );
                }
            }
        }
    }
}

/// Turns a graph, its layout and a transform into a [`Scene`].
///
/// Rendering is pure: the same inputs always produce the same scene.
pub struct GraphRenderer<'a> {
    style: &'a SettingsStyle,
    selected: Option<NodeIndex>,
    dragged: Option<NodeIndex>,
}

impl<'a> GraphRenderer<'a> {
    pub fn new(style: &'a SettingsStyle) -> Self {
        Self {
            style,
            selected: None,
            dragged: None,
        }
    }

    pub fn with_selected(mut self, selected: Option<NodeIndex>) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_dragged(mut self, dragged: Option<NodeIndex>) -> Self {
        self.dragged = dragged;
        self
    }

    /// Renders into `target`, an absolute screen rect. Returns `None` when the target has no
    /// usable area; the caller retries next frame.
    pub fn render(
        &self,
        g: &Graph,
        layout: &LayoutEngine,
        transform: &Transform,
        target: Rect,
        measure: &dyn TextMeasure,
    ) -> Option<Scene> {
        if !target.is_finite() || target.width() <= 0.0 || target.height() <= 0.0 {
            log::trace!("render skipped: target rect {target:?} is unavailable");
            return None;
        }
        let transform = transform.translated(target.min.to_vec2());

        let mut laid_out = Vec::with_capacity(g.node_count());
        for (idx, node) in g.nodes() {
            let Some(center) = layout.position(idx) else {
                continue;
            };
            if !center.x.is_finite() || !center.y.is_finite() {
                continue;
            }
            let style = NodeStyle::of(node.kind(), node.important());
            let mut geom = NodeGeometry::new(style.shape, center, style.half_size, style.corner_radius);
            let font_size = self.style.label_font_size;
            let lines = wrap_label(node.label(), geom.interior_width(), font_size, measure);
            geom.grow_to_fit(lines.len() as f32 * measure.line_height(font_size));
            laid_out.push((idx, style, geom, lines));
        }

        // selected then dragged go last so they end up on top
        laid_out.sort_by_key(|(idx, ..)| {
            u8::from(Some(*idx) == self.selected) + 2 * u8::from(Some(*idx) == self.dragged)
        });

        let mut items = Vec::new();
        self.push_edges(g, &laid_out, &transform, measure, &mut items);
        for (idx, style, geom, lines) in &laid_out {
            self.push_node(*idx, style, geom, lines, &transform, measure, &mut items);
        }

        Some(Scene {
            items,
            nodes: laid_out
                .into_iter()
                .map(|(idx, _, geom, _)| (idx, geom))
                .collect(),
            transform,
        })
    }

    fn push_edges(
        &self,
        g: &Graph,
        laid_out: &[(NodeIndex, NodeStyle, NodeGeometry, Vec<String>)],
        transform: &Transform,
        measure: &dyn TextMeasure,
        items: &mut Vec<SceneItem>,
    ) {
        let slot: HashMap<NodeIndex, usize> = laid_out
            .iter()
            .enumerate()
            .map(|(pos, (idx, ..))| (*idx, pos))
            .collect();
        let geom_of = |idx: NodeIndex| slot.get(&idx).map(|&pos| &laid_out[pos].2);
        let stroke = Stroke::new(self.style.edge_width, self.style.edge_color);
        let tip = TipProps {
            size: self.style.arrow_size,
            angle: self.style.arrow_angle,
        };

        for (_, link) in g.links() {
            let (Some(source), Some(target)) = (geom_of(link.source()), geom_of(link.target()))
            else {
                continue;
            };

            let builder = EdgeShapeBuilder::new(stroke)
                .with_tip(&tip)
                .with_transform(transform);
            let builder = if link.is_loop() {
                builder.looped(source.center, source.half.y, LOOP_SIZE, link.order())
            } else {
                let control = control_point(
                    source.center,
                    target.center,
                    self.style.edge_curvature,
                    link.order(),
                );
                let start = source.boundary_point(control - source.center);
                let end = target.boundary_point(control - target.center);
                builder.curved((start, end), control)
            };
            let edge = builder.build();
            items.extend(edge.shapes.into_iter().map(SceneItem::Shape));

            if let Some(label) = link.label().filter(|_| self.style.edge_labels) {
                self.push_edge_label(label, edge.label_anchor, transform, measure, items);
            }
        }
    }

    fn push_edge_label(
        &self,
        label: &str,
        anchor: Pos2,
        transform: &Transform,
        measure: &dyn TextMeasure,
        items: &mut Vec<SceneItem>,
    ) {
        let font_size = transform.world_to_screen_size(self.style.edge_label_font_size);
        if font_size < MIN_READABLE_FONT {
            return;
        }
        let size = Vec2::new(
            measure.text_width(label, font_size),
            measure.line_height(font_size),
        ) + LABEL_PADDING * 2.0;
        let plate = Rect::from_center_size(anchor, size);
        items.push(SceneItem::Shape(Shape::convex_polygon(
            vec![
                plate.left_top(),
                plate.right_top(),
                plate.right_bottom(),
                plate.left_bottom(),
            ],
            self.style.edge_label_background,
            Stroke::NONE,
        )));
        items.push(SceneItem::Text(TextItem {
            pos: anchor,
            text: label.to_owned(),
            font_size,
            color: self.style.edge_label_color,
        }));
    }

    #[allow(clippy::too_many_arguments)]
    fn push_node(
        &self,
        idx: NodeIndex,
        style: &NodeStyle,
        geom: &NodeGeometry,
        lines: &[String],
        transform: &Transform,
        measure: &dyn TextMeasure,
        items: &mut Vec<SceneItem>,
    ) {
        items.extend(
            geom.shapes(transform, style.fill, style.stroke)
                .into_iter()
                .map(SceneItem::Shape),
        );
        if Some(idx) == self.selected {
            items.push(SceneItem::Shape(geom.highlight(
                transform,
                Stroke::new(style.stroke.width + 2.0, self.style.selection_color),
            )));
        }

        let font_size = self.style.label_font_size;
        let screen_font = transform.world_to_screen_size(font_size);
        if screen_font < MIN_READABLE_FONT || lines.is_empty() {
            return;
        }
        let line_height = measure.line_height(font_size);
        let top = geom.center.y - line_height * lines.len() as f32 / 2.0;
        for (i, line) in lines.iter().enumerate() {
            let world = Pos2::new(geom.center.x, top + line_height * (i as f32 + 0.5));
            items.push(SceneItem::Text(TextItem {
                pos: transform.world_to_screen(world),
                text: line.clone(),
                font_size: screen_font,
                color: style.text_color,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        draw::MonospaceMeasure,
        input::{RawLink, RawNode},
        ForceSettings,
    };

    fn graph() -> Graph {
        Graph::build(
            vec![
                RawNode::new("s").with_kind("start"),
                RawNode::new("c")
                    .with_kind("condition")
                    .with_label("is the counter below the configured limit"),
                RawNode::new("e").with_kind("end"),
            ],
            vec![
                RawLink::new("s", "c"),
                RawLink::new("c", "e").with_label("no"),
                RawLink::new("c", "c").with_label("yes"),
            ],
        )
        .unwrap()
    }

    fn layout() -> LayoutEngine {
        LayoutEngine::from_positions(
            ForceSettings::default(),
            vec![
                Pos2::new(0.0, 0.0),
                Pos2::new(200.0, 0.0),
                Pos2::new(400.0, 0.0),
            ],
        )
    }

    fn target() -> Rect {
        Rect::from_min_size(Pos2::new(10.0, 20.0), Vec2::new(800.0, 600.0))
    }

    #[test]
    fn test_empty_target_renders_nothing() {
        let style = SettingsStyle::default();
        let r = GraphRenderer::new(&style);
        let m = MonospaceMeasure::default();
        let empty = Rect::from_min_size(Pos2::ZERO, Vec2::ZERO);
        assert!(r
            .render(&graph(), &layout(), &Transform::IDENTITY, empty, &m)
            .is_none());
        assert!(r
            .render(&graph(), &layout(), &Transform::IDENTITY, Rect::NOTHING, &m)
            .is_none());
    }

    fn texts(scene: &Scene) -> Vec<&str> {
        scene
            .items()
            .iter()
            .filter_map(|item| match item {
                SceneItem::Text(t) => Some(t.text.as_str()),
                SceneItem::Shape(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_links_follow_their_endpoints() {
        let style = SettingsStyle::default();
        let m = MonospaceMeasure::default();
        let t = Transform::IDENTITY;

        let partial = LayoutEngine::from_positions(
            ForceSettings::default(),
            vec![Pos2::new(0.0, 0.0), Pos2::new(200.0, 0.0)],
        );
        let scene = GraphRenderer::new(&style)
            .render(&graph(), &partial, &t, target(), &m)
            .unwrap();
        assert_eq!(scene.nodes().len(), 2);
        let labels = texts(&scene);
        assert!(labels.contains(&"yes"));
        assert!(!labels.contains(&"no"));

        let full = GraphRenderer::new(&style)
            .render(&graph(), &layout(), &t, target(), &m)
            .unwrap();
        let reordered = GraphRenderer::new(&style)
            .with_selected(Some(NodeIndex::new(0)))
            .render(&graph(), &layout(), &t, target(), &m)
            .unwrap();
        // one extra shape for the selection highlight
        assert_eq!(full.items().len() + 1, reordered.items().len());
        assert_eq!(full.items()[0], reordered.items()[0]);
    }

    #[test]
    fn test_render_is_idempotent() {
        let style = SettingsStyle::default();
        let r = GraphRenderer::new(&style);
        let m = MonospaceMeasure::default();
        let t = Transform::new(1.5, Vec2::new(30.0, 40.0));
        let a = r.render(&graph(), &layout(), &t, target(), &m).unwrap();
        let b = r.render(&graph(), &layout(), &t, target(), &m).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.nodes().len(), 3);
    }

    #[test]
    fn test_wrapped_label_fits_interior() {
        let style = SettingsStyle::default();
        let m = MonospaceMeasure::default();
        let scene = GraphRenderer::new(&style)
            .render(&graph(), &layout(), &Transform::IDENTITY, target(), &m)
            .unwrap();
        let (_, diamond) = &scene.nodes()[1];
        let diamond_text = NodeStyle::of(crate::NodeKind::Condition, false).text_color;
        let lines: Vec<&TextItem> = scene
            .items()
            .iter()
            .filter_map(|i| match i {
                SceneItem::Text(t) if t.color == diamond_text => Some(t),
                _ => None,
            })
            .collect();
        assert!(lines.len() > 1);
        for line in lines {
            assert!(m.text_width(&line.text, style.label_font_size) <= diamond.interior_width());
        }
        assert!(diamond.interior_height() >= m.line_height(style.label_font_size) * 2.0 - 1e-3);
    }

    #[test]
    fn test_selected_node_drawn_last_and_hit_first() {
        let style = SettingsStyle::default();
        let m = MonospaceMeasure::default();
        let g = graph();
        let overlapping = LayoutEngine::from_positions(
            ForceSettings::default(),
            vec![Pos2::new(0.0, 0.0), Pos2::new(5.0, 0.0), Pos2::new(400.0, 0.0)],
        );
        let plain = GraphRenderer::new(&style)
            .render(&g, &overlapping, &Transform::IDENTITY, target(), &m)
            .unwrap();
        assert_eq!(plain.node_at(Pos2::new(2.0, 0.0)), Some(NodeIndex::new(1)));

        let selected = GraphRenderer::new(&style)
            .with_selected(Some(NodeIndex::new(0)))
            .render(&g, &overlapping, &Transform::IDENTITY, target(), &m)
            .unwrap();
        assert_eq!(selected.nodes().last().map(|(i, _)| *i), Some(NodeIndex::new(0)));
        assert_eq!(selected.node_at(Pos2::new(2.0, 0.0)), Some(NodeIndex::new(0)));
        assert_eq!(selected.node_at(Pos2::new(1000.0, 0.0)), None);
    }

    #[test]
    fn test_node_at_screen_accounts_for_target_offset() {
        let style = SettingsStyle::default();
        let m = MonospaceMeasure::default();
        let scene = GraphRenderer::new(&style)
            .render(&graph(), &layout(), &Transform::IDENTITY, target(), &m)
            .unwrap();
        assert_eq!(
            scene.node_at_screen(Pos2::new(410.0, 20.0)),
            Some(NodeIndex::new(2))
        );
    }

    #[test]
    fn test_edge_labels_toggle() {
        let m = MonospaceMeasure::default();
        let count_texts = |style: &SettingsStyle| {
            GraphRenderer::new(style)
                .render(&graph(), &layout(), &Transform::IDENTITY, target(), &m)
                .unwrap()
                .items()
                .iter()
                .filter(|i| matches!(i, SceneItem::Text(t) if t.text == "no" || t.text == "yes"))
                .count()
        };
        assert_eq!(count_texts(&SettingsStyle::default()), 2);
        assert_eq!(count_texts(&SettingsStyle::default().with_edge_labels(false)), 0);
    }

    #[test]
    fn test_tiny_zoom_skips_labels() {
        let style = SettingsStyle::default();
        let m = MonospaceMeasure::default();
        let scene = GraphRenderer::new(&style)
            .render(&graph(), &layout(), &Transform::new(0.1, Vec2::ZERO), target(), &m)
            .unwrap();
        assert!(scene.items().iter().all(|i| matches!(i, SceneItem::Shape(_))));
    }
}
