use std::time::Duration;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::ZoomBounds;

/// Represents graph interaction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsInteraction {
    /// Node dragging. Dragging empty canvas pans regardless, see [`SettingsNavigation`].
    pub dragging_enabled: bool,

    /// Clicking on nodes publishes click events.
    pub node_clicking_enabled: bool,

    /// Clicking on a node selects it, clicking on empty canvas clears the selection.
    /// Enables `node_clicking_enabled`.
    pub node_selection_enabled: bool,
}

impl Default for SettingsInteraction {
    fn default() -> Self {
        Self {
            dragging_enabled: true,
            node_clicking_enabled: true,
            node_selection_enabled: true,
        }
    }
}

impl SettingsInteraction {
    pub fn with_dragging_enabled(mut self, enabled: bool) -> Self {
        self.dragging_enabled = enabled;
        self
    }

    pub fn with_node_clicking_enabled(mut self, enabled: bool) -> Self {
        self.node_clicking_enabled = enabled;
        self
    }

    pub fn with_node_selection_enabled(mut self, enabled: bool) -> Self {
        self.node_selection_enabled = enabled;
        self
    }
}

/// Represents graph navigation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsNavigation {
    /// Wheel zoom and canvas drag panning.
    pub zoom_and_pan_enabled: bool,

    pub zoom_bounds: ZoomBounds,

    /// Relative scale change of one zoom button press.
    pub zoom_step: f32,

    /// Relative scale change of one wheel notch.
    pub wheel_zoom_speed: f32,

    /// Duration of eased transitions triggered by discrete controls.
    pub animation_duration: Duration,

    /// Padding around the graph when fitting to screen, fraction of the graph size.
    pub fit_padding: f32,

    /// Fit the graph to the canvas once its layout settles after loading.
    pub fit_on_load: bool,
}

impl Default for SettingsNavigation {
    fn default() -> Self {
        Self {
            zoom_and_pan_enabled: true,
            zoom_bounds: ZoomBounds::EXPLORABLE,
            zoom_step: 0.2,
            wheel_zoom_speed: 0.1,
            animation_duration: Duration::from_millis(250),
            fit_padding: 0.3,
            fit_on_load: false,
        }
    }
}

impl SettingsNavigation {
    /// Settings for the small embedded canvas variant.
    pub fn compact() -> Self {
        Self::default().with_zoom_bounds(ZoomBounds::COMPACT)
    }

    pub fn with_zoom_and_pan_enabled(mut self, enabled: bool) -> Self {
        self.zoom_and_pan_enabled = enabled;
        self
    }

    pub fn with_zoom_bounds(mut self, bounds: ZoomBounds) -> Self {
        self.zoom_bounds = bounds;
        self
    }

    pub fn with_zoom_step(mut self, step: f32) -> Self {
        self.zoom_step = step;
        self
    }

    pub fn with_animation_duration(mut self, duration: Duration) -> Self {
        self.animation_duration = duration;
        self
    }

    pub fn with_fit_on_load(mut self, fit: bool) -> Self {
        self.fit_on_load = fit;
        self
    }
}

/// Represents graph style settings. Per node-type styling lives in [`crate::NodeStyle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsStyle {
    /// Draw link labels.
    pub edge_labels: bool,

    /// Sideways bend of links as a fraction of their length.
    pub edge_curvature: f32,

    pub edge_width: f32,
    pub edge_color: Color32,
    pub edge_label_color: Color32,
    /// Plate drawn behind link labels.
    pub edge_label_background: Color32,

    /// Arrowhead length and half opening angle in radians.
    pub arrow_size: f32,
    pub arrow_angle: f32,

    pub label_font_size: f32,
    pub edge_label_font_size: f32,

    /// Stroke drawn around the selected node.
    pub selection_color: Color32,
}

impl Default for SettingsStyle {
    fn default() -> Self {
        Self {
            edge_labels: true,
            edge_curvature: 0.15,
            edge_width: 1.5,
            edge_color: Color32::from_rgb(120, 128, 140),
            edge_label_color: Color32::from_rgb(90, 96, 110),
            edge_label_background: Color32::from_rgba_unmultiplied(255, 255, 255, 220),
            arrow_size: 10.0,
            arrow_angle: std::f32::consts::PI / 7.0,
            label_font_size: 12.0,
            edge_label_font_size: 10.0,
            selection_color: Color32::from_rgb(255, 196, 0),
        }
    }
}

impl SettingsStyle {
    pub fn with_edge_labels(mut self, show: bool) -> Self {
        self.edge_labels = show;
        self
    }

    pub fn with_edge_curvature(mut self, curvature: f32) -> Self {
        self.edge_curvature = curvature;
        self
    }

    pub fn with_label_font_size(mut self, size: f32) -> Self {
        self.label_font_size = size;
        self
    }
}
