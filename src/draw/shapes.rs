use std::f32::consts::{FRAC_PI_2, PI, TAU};

use egui::{epaint::CircleShape, epaint::PathShape, Color32, Pos2, Rect, Shape, Stroke, Vec2};

use super::NodeShape;
use crate::viewport::Transform;

const CIRCLE_SEGMENTS: usize = 32;
const CORNER_SEGMENTS: usize = 4;
const STAR_POINTS: usize = 5;
const STAR_INNER_RATIO: f32 = 0.5;

/// World space outline of one node, used for painting, edge endpoints and hit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGeometry {
    pub shape: NodeShape,
    pub center: Pos2,
    pub half: Vec2,
    pub corner_radius: f32,
}

impl NodeGeometry {
    pub fn new(shape: NodeShape, center: Pos2, half: Vec2, corner_radius: f32) -> Self {
        let half = if shape.is_round() {
            Vec2::splat(half.x.max(half.y))
        } else {
            half
        };
        Self {
            shape,
            center,
            half,
            corner_radius,
        }
    }

    /// Width available for the label.
    pub fn interior_width(&self) -> f32 {
        2.0 * self.half.x * self.shape.interior_ratio()
    }

    /// Height available for the label.
    pub fn interior_height(&self) -> f32 {
        2.0 * self.half.y * self.shape.interior_ratio()
    }

    /// Grows the shape so that `height` fits inside its interior.
    pub fn grow_to_fit(&mut self, height: f32) {
        let needed = height / 2.0 / self.shape.interior_ratio();
        if needed <= self.half.y {
            return;
        }
        if self.shape.is_round() {
            self.half = Vec2::splat(needed);
        } else {
            self.half.y = needed;
        }
    }

    pub fn bounding_rect(&self) -> Rect {
        Rect::from_center_size(self.center, self.half * 2.0)
    }

    /// Closed outline, clockwise in screen orientation.
    pub fn outline(&self) -> Vec<Pos2> {
        let (c, h) = (self.center, self.half);
        match self.shape {
            NodeShape::Circle => (0..CIRCLE_SEGMENTS)
                .map(|i| c + polar(TAU * i as f32 / CIRCLE_SEGMENTS as f32, h.x))
                .collect(),
            NodeShape::Diamond => vec![
                c + Vec2::new(0.0, -h.y),
                c + Vec2::new(h.x, 0.0),
                c + Vec2::new(0.0, h.y),
                c + Vec2::new(-h.x, 0.0),
            ],
            NodeShape::Hexagon => {
                let inset = (h.y * 0.8).min(h.x);
                vec![
                    c + Vec2::new(-h.x + inset, -h.y),
                    c + Vec2::new(h.x - inset, -h.y),
                    c + Vec2::new(h.x, 0.0),
                    c + Vec2::new(h.x - inset, h.y),
                    c + Vec2::new(-h.x + inset, h.y),
                    c + Vec2::new(-h.x, 0.0),
                ]
            }
            NodeShape::RoundedRect => rounded_rect(c, h, self.corner_radius),
            NodeShape::Star => star_points(c, h.x),
        }
    }

    pub fn contains(&self, p: Pos2) -> bool {
        if !self.bounding_rect().contains(p) {
            return false;
        }
        match self.shape {
            NodeShape::Circle => (p - self.center).length() <= self.half.x,
            _ => polygon_contains(&self.outline(), p),
        }
    }

    /// Point where the ray from the center along `dir` leaves the shape.
    pub fn boundary_point(&self, dir: Vec2) -> Pos2 {
        let len = dir.length();
        if !len.is_finite() || len <= f32::EPSILON {
            return self.center;
        }
        let dir = dir / len;
        if self.shape == NodeShape::Circle {
            return self.center + dir * self.half.x;
        }

        let outline = self.outline();
        let far = self.center + dir * (self.half.x + self.half.y) * 2.0;
        let mut best: Option<(f32, Pos2)> = None;
        for i in 0..outline.len() {
            let a = outline[i];
            let b = outline[(i + 1) % outline.len()];
            if let Some((t, p)) = segment_intersection(self.center, far, a, b) {
                if best.is_none_or(|(bt, _)| t < bt) {
                    best = Some((t, p));
                }
            }
        }
        best.map_or(self.center, |(_, p)| p)
    }

    /// Screen space shapes filling and outlining the node.
    pub fn shapes(&self, transform: &Transform, fill: Color32, stroke: Stroke) -> Vec<Shape> {
        let stroke = Stroke::new(transform.world_to_screen_size(stroke.width), stroke.color);
        match self.shape {
            NodeShape::Circle => vec![Shape::Circle(CircleShape {
                center: transform.world_to_screen(self.center),
                radius: transform.world_to_screen_size(self.half.x),
                fill,
                stroke,
            })],
            NodeShape::Star => {
                let points: Vec<Pos2> = self
                    .outline()
                    .into_iter()
                    .map(|p| transform.world_to_screen(p))
                    .collect();
                let mut res = star_fill(&points, fill);
                res.push(Shape::Path(PathShape::closed_line(points, stroke)));
                res
            }
            _ => {
                let points = self
                    .outline()
                    .into_iter()
                    .map(|p| transform.world_to_screen(p))
                    .collect();
                vec![Shape::convex_polygon(points, fill, stroke)]
            }
        }
    }

    /// Screen space outline only, for highlighting.
    pub fn highlight(&self, transform: &Transform, stroke: Stroke) -> Shape {
        let stroke = Stroke::new(transform.world_to_screen_size(stroke.width), stroke.color);
        if self.shape == NodeShape::Circle {
            return Shape::circle_stroke(
                transform.world_to_screen(self.center),
                transform.world_to_screen_size(self.half.x),
                stroke,
            );
        }
        let points = self
            .outline()
            .into_iter()
            .map(|p| transform.world_to_screen(p))
            .collect();
        Shape::Path(PathShape::closed_line(points, stroke))
    }
}

fn polar(angle: f32, radius: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin()) * radius
}

fn rounded_rect(c: Pos2, h: Vec2, radius: f32) -> Vec<Pos2> {
    let r = radius.clamp(0.0, h.x.min(h.y));
    if r <= 0.0 {
        return vec![
            c + Vec2::new(-h.x, -h.y),
            c + Vec2::new(h.x, -h.y),
            c + Vec2::new(h.x, h.y),
            c + Vec2::new(-h.x, h.y),
        ];
    }
    // corner arc centers with the angle each arc starts at
    let corners = [
        (Vec2::new(h.x - r, -h.y + r), -FRAC_PI_2),
        (Vec2::new(h.x - r, h.y - r), 0.0),
        (Vec2::new(-h.x + r, h.y - r), FRAC_PI_2),
        (Vec2::new(-h.x + r, -h.y + r), PI),
    ];
    let mut points = Vec::with_capacity(corners.len() * (CORNER_SEGMENTS + 1));
    for (offset, start) in corners {
        for i in 0..=CORNER_SEGMENTS {
            let angle = start + FRAC_PI_2 * i as f32 / CORNER_SEGMENTS as f32;
            points.push(c + offset + polar(angle, r));
        }
    }
    points
}

/// Alternating outer and inner vertices, first one pointing up.
fn star_points(c: Pos2, outer: f32) -> Vec<Pos2> {
    let inner = outer * STAR_INNER_RATIO;
    (0..STAR_POINTS * 2)
        .map(|i| {
            let angle = -FRAC_PI_2 + PI * i as f32 / STAR_POINTS as f32;
            let r = if i % 2 == 0 { outer } else { inner };
            c + polar(angle, r)
        })
        .collect()
}

/// A star is concave, so it is filled as its inner pentagon plus one triangle per tip.
fn star_fill(points: &[Pos2], fill: Color32) -> Vec<Shape> {
    let n = points.len();
    let inner: Vec<Pos2> = points.iter().skip(1).step_by(2).copied().collect();
    let mut res = vec![Shape::convex_polygon(inner, fill, Stroke::NONE)];
    for i in (0..n).step_by(2) {
        let tip = points[i];
        let left = points[(i + n - 1) % n];
        let right = points[(i + 1) % n];
        res.push(Shape::convex_polygon(vec![left, tip, right], fill, Stroke::NONE));
    }
    res
}

/// Even-odd rule.
fn polygon_contains(points: &[Pos2], p: Pos2) -> bool {
    let mut inside = false;
    let mut j = points.len().wrapping_sub(1);
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Intersection of segment `p→q` with segment `a→b`, as the parameter along `p→q` and the point.
fn segment_intersection(p: Pos2, q: Pos2, a: Pos2, b: Pos2) -> Option<(f32, Pos2)> {
    let r = q - p;
    let s = b - a;
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let ap = a - p;
    let t = (ap.x * s.y - ap.y * s.x) / denom;
    let u = (ap.x * r.y - ap.y * r.x) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some((t, p + r * t))
    } else {
        None
    }
}
