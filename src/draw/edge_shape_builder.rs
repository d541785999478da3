use std::f32::consts::PI;

use egui::{
    epaint::{CubicBezierShape, QuadraticBezierShape},
    Color32, Pos2, Shape, Stroke, Vec2,
};

use crate::viewport::Transform;

enum EdgeShapeProps {
    Curved {
        bounds: (Pos2, Pos2),
        control: Pos2,
    },
    Looped {
        node_center: Pos2,
        node_size: f32,
        loop_size: f32,
        order: usize,
    },
}

impl Default for EdgeShapeProps {
    fn default() -> Self {
        Self::Curved {
            bounds: (Pos2::default(), Pos2::default()),
            control: Pos2::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TipProps {
    pub size: f32,
    pub angle: f32,
}

/// Screen space edge geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeShapes {
    pub shapes: Vec<Shape>,
    /// Curve midpoint (t = 0.5), where the label goes.
    pub label_anchor: Pos2,
}

/// Control point of the quadratic curve between `start` and `end`: the chord midpoint pushed
/// sideways by `curvature * (1 + order)` of the chord length. Parallel links fan out by order.
pub fn control_point(start: Pos2, end: Pos2, curvature: f32, order: usize) -> Pos2 {
    let chord = end - start;
    let mid = start + chord / 2.0;
    let normal = Vec2::new(-chord.y, chord.x);
    mid + normal * curvature * (1 + order) as f32
}

/// Builds edge shapes in world coordinates and maps them to the screen on `build`.
#[derive(Default)]
pub struct EdgeShapeBuilder<'a> {
    shape_props: EdgeShapeProps,
    tip: Option<&'a TipProps>,
    stroke: Stroke,
    transform: Option<&'a Transform>,
}

impl<'a> EdgeShapeBuilder<'a> {
    pub fn new(stroke: Stroke) -> Self {
        Self {
            stroke,
            ..Default::default()
        }
    }

    pub fn curved(mut self, bounds: (Pos2, Pos2), control: Pos2) -> Self {
        self.shape_props = EdgeShapeProps::Curved { bounds, control };

        self
    }

    pub fn looped(
        mut self,
        node_center: Pos2,
        node_size: f32,
        loop_size: f32,
        order: usize,
    ) -> Self {
        self.shape_props = EdgeShapeProps::Looped {
            node_center,
            node_size,
            loop_size,
            order,
        };

        self
    }

    pub fn with_transform(mut self, transform: &'a Transform) -> Self {
        self.transform = Some(transform);

        self
    }

    pub fn with_tip(mut self, tip_props: &'a TipProps) -> Self {
        self.tip = Some(tip_props);

        self
    }

    pub fn build(self) -> EdgeShapes {
        match self.shape_props {
            EdgeShapeProps::Curved { bounds, control } => self.shape_curved(bounds, control),
            EdgeShapeProps::Looped {
                node_center,
                node_size,
                loop_size,
                order,
            } => self.shape_looped(node_center, node_size, loop_size, order as f32 + 1.),
        }
    }

    fn to_screen(&self, p: Pos2) -> Pos2 {
        self.transform.map_or(p, |t| t.world_to_screen(p))
    }

    fn screen_stroke(&self) -> Stroke {
        let mut stroke = self.stroke;
        if let Some(t) = self.transform {
            stroke.width = t.world_to_screen_size(stroke.width);
        }
        stroke
    }

    /// Arrow triangle with its tip at `end`, and the point where the line should stop.
    fn tip(&self, end: Pos2, dir: Vec2) -> Option<(Vec<Pos2>, Pos2)> {
        let tip_props = self.tip?;
        let tip_dir = dir.normalized();
        if !tip_dir.x.is_finite() || !tip_dir.y.is_finite() || tip_dir == Vec2::ZERO {
            return None;
        }

        let arrow_tip_dir_1 = rotate_vector(tip_dir, tip_props.angle) * tip_props.size;
        let arrow_tip_dir_2 = rotate_vector(tip_dir, -tip_props.angle) * tip_props.size;

        let tip_start_1 = end - arrow_tip_dir_1;
        let tip_start_2 = end - arrow_tip_dir_2;

        Some((
            vec![end, tip_start_1, tip_start_2],
            end - tip_props.size * tip_dir,
        ))
    }

    fn push_tip(&self, res: &mut Vec<Shape>, points: Vec<Pos2>, color: Color32) {
        let points = points.into_iter().map(|p| self.to_screen(p)).collect();
        res.push(Shape::convex_polygon(points, color, Stroke::NONE));
    }

    fn shape_curved(&self, bounds: (Pos2, Pos2), control: Pos2) -> EdgeShapes {
        let mut res = vec![];
        let (start, end) = bounds;
        let stroke = self.screen_stroke();

        // control may coincide with the end on very short links
        let mut dir = end - control;
        if dir.length_sq() <= f32::EPSILON {
            dir = end - start;
        }

        let mut line_end = end;
        let tip = self.tip(end, dir);
        if let Some((_, stop)) = &tip {
            line_end = *stop;
        }

        let label_anchor = self.to_screen(quadratic_midpoint(start, control, end));

        res.push(
            QuadraticBezierShape::from_points_stroke(
                [
                    self.to_screen(start),
                    self.to_screen(control),
                    self.to_screen(line_end),
                ],
                false,
                Color32::TRANSPARENT,
                stroke,
            )
            .into(),
        );
        if let Some((points, _)) = tip {
            self.push_tip(&mut res, points, stroke.color);
        }

        EdgeShapes {
            shapes: res,
            label_anchor,
        }
    }

    fn shape_looped(
        &self,
        node_center: Pos2,
        node_size: f32,
        loop_size: f32,
        param: f32,
    ) -> EdgeShapes {
        let mut res = vec![];

        let stroke = self.screen_stroke();
        let center_horizon_angle = PI / 4.;
        let y_intersect = node_center.y - node_size * center_horizon_angle.sin();

        let edge_start = Pos2::new(
            node_center.x - node_size * center_horizon_angle.cos(),
            y_intersect,
        );
        let edge_end = Pos2::new(
            node_center.x + node_size * center_horizon_angle.cos(),
            y_intersect,
        );

        let loop_size = node_size * (loop_size + param);

        let control_point1 = Pos2::new(node_center.x + loop_size, node_center.y - loop_size);
        let control_point2 = Pos2::new(node_center.x - loop_size, node_center.y - loop_size);

        let label_anchor = self.to_screen(cubic_midpoint(
            edge_end,
            control_point1,
            control_point2,
            edge_start,
        ));

        let mut line_end = edge_start;
        let tip = self.tip(edge_start, edge_start - control_point2);
        if let Some((_, stop)) = &tip {
            line_end = *stop;
        }

        res.push(
            CubicBezierShape::from_points_stroke(
                [
                    self.to_screen(edge_end),
                    self.to_screen(control_point1),
                    self.to_screen(control_point2),
                    self.to_screen(line_end),
                ],
                false,
                Color32::TRANSPARENT,
                stroke,
            )
            .into(),
        );
        if let Some((points, _)) = tip {
            self.push_tip(&mut res, points, stroke.color);
        }

        EdgeShapes {
            shapes: res,
            label_anchor,
        }
    }
}

fn quadratic_midpoint(p0: Pos2, c: Pos2, p2: Pos2) -> Pos2 {
    (p0.to_vec2() * 0.25 + c.to_vec2() * 0.5 + p2.to_vec2() * 0.25).to_pos2()
}

fn cubic_midpoint(p0: Pos2, c1: Pos2, c2: Pos2, p3: Pos2) -> Pos2 {
    ((p0.to_vec2() + c1.to_vec2() * 3.0 + c2.to_vec2() * 3.0 + p3.to_vec2()) / 8.0).to_pos2()
}

/// rotates vector by angle
fn rotate_vector(vec: Vec2, angle: f32) -> Vec2 {
    let cos = angle.cos();
    let sin = angle.sin();
    Vec2::new(cos * vec.x - sin * vec.y, sin * vec.x + cos * vec.y)
}
