use egui::{Color32, Stroke, Vec2};
use serde::{Deserialize, Serialize};

use crate::NodeKind;

/// Outline a node is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeShape {
    Circle,
    Diamond,
    Hexagon,
    RoundedRect,
    Star,
}

impl NodeShape {
    /// Shape for a node of `kind`. Important nodes are always stars.
    pub fn of(kind: NodeKind, important: bool) -> Self {
        if important {
            return NodeShape::Star;
        }
        match kind {
            NodeKind::Start | NodeKind::End => NodeShape::Circle,
            NodeKind::Condition => NodeShape::Diamond,
            NodeKind::Loop => NodeShape::Hexagon,
            NodeKind::Process | NodeKind::Function => NodeShape::RoundedRect,
        }
    }

    /// Share of the half size usable for the label, per axis.
    pub fn interior_ratio(self) -> f32 {
        match self {
            NodeShape::Circle => 0.7,
            NodeShape::Diamond => 0.5,
            NodeShape::Hexagon => 0.75,
            NodeShape::RoundedRect => 0.9,
            NodeShape::Star => 0.45,
        }
    }

    /// Whether both axes always share one radius.
    pub fn is_round(self) -> bool {
        matches!(self, NodeShape::Circle | NodeShape::Star)
    }
}

/// Visual parameters of one node category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub shape: NodeShape,
    pub fill: Color32,
    pub stroke: Stroke,
    /// Half width and half height before the label grows the shape, world units.
    pub half_size: Vec2,
    pub corner_radius: f32,
    pub text_color: Color32,
}

impl NodeStyle {
    /// Style table lookup.
    pub fn of(kind: NodeKind, important: bool) -> Self {
        let shape = NodeShape::of(kind, important);
        let (fill, stroke, half_size, corner_radius) = match (shape, kind) {
            (NodeShape::Star, _) => (
                Color32::from_rgb(255, 213, 79),
                Color32::from_rgb(255, 143, 0),
                Vec2::splat(46.0),
                0.0,
            ),
            (_, NodeKind::Start) => (
                Color32::from_rgb(102, 187, 106),
                Color32::from_rgb(46, 125, 50),
                Vec2::splat(32.0),
                0.0,
            ),
            (_, NodeKind::End) => (
                Color32::from_rgb(239, 83, 80),
                Color32::from_rgb(183, 28, 28),
                Vec2::splat(32.0),
                0.0,
            ),
            (_, NodeKind::Condition) => (
                Color32::from_rgb(255, 202, 40),
                Color32::from_rgb(255, 143, 0),
                Vec2::new(66.0, 40.0),
                0.0,
            ),
            (_, NodeKind::Loop) => (
                Color32::from_rgb(171, 71, 188),
                Color32::from_rgb(106, 27, 154),
                Vec2::new(62.0, 28.0),
                0.0,
            ),
            (_, NodeKind::Function) => (
                Color32::from_rgb(38, 166, 154),
                Color32::from_rgb(0, 105, 92),
                Vec2::new(64.0, 26.0),
                12.0,
            ),
            (_, NodeKind::Process) => (
                Color32::from_rgb(66, 165, 245),
                Color32::from_rgb(21, 101, 192),
                Vec2::new(60.0, 24.0),
                6.0,
            ),
        };
        let text_color = match shape {
            NodeShape::Star | NodeShape::Diamond => Color32::from_rgb(33, 33, 33),
            _ => Color32::WHITE,
        };
        Self {
            shape,
            fill,
            stroke: Stroke::new(2.0, stroke),
            half_size,
            corner_radius,
            text_color,
        }
    }
}
