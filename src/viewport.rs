use std::time::Duration;

use egui::{Pos2, Rect, Vec2};
use instant::Instant;
use serde::{Deserialize, Serialize};

use crate::SettingsNavigation;

/// World → screen mapping: `screen = world * scale + translate`.
///
/// "Screen" is widget-local: the origin is the top left corner of the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f32,
    pub translate: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        translate: Vec2::ZERO,
    };

    pub fn new(scale: f32, translate: Vec2) -> Self {
        Self { scale, translate }
    }

    pub fn world_to_screen(&self, pos: Pos2) -> Pos2 {
        (pos.to_vec2() * self.scale + self.translate).to_pos2()
    }

    pub fn world_to_screen_size(&self, size: f32) -> f32 {
        size * self.scale
    }

    pub fn screen_to_world(&self, pos: Pos2) -> Pos2 {
        ((pos.to_vec2() - self.translate) / self.scale).to_pos2()
    }

    pub fn screen_to_world_vec(&self, v: Vec2) -> Vec2 {
        v / self.scale
    }

    /// Same mapping shifted by `offset` screen units, e.g. to paint in absolute coordinates.
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            scale: self.scale,
            translate: self.translate + offset,
        }
    }

    fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            scale: self.scale + (other.scale - self.scale) * t,
            translate: self.translate + (other.translate - self.translate) * t,
        }
    }

    /// Zooms by `factor` keeping the world point under `anchor` fixed on screen.
    fn zoomed(&self, factor: f32, anchor: Pos2, bounds: ZoomBounds) -> Transform {
        if !factor.is_finite() || factor <= 0.0 {
            return *self;
        }
        let scale = bounds.clamp(self.scale * factor);
        let world = self.screen_to_world(anchor);
        Transform {
            scale,
            translate: anchor.to_vec2() - world.to_vec2() * scale,
        }
    }
}

/// Allowed scale range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomBounds {
    pub min: f32,
    pub max: f32,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self::EXPLORABLE
    }
}

impl ZoomBounds {
    /// Full size explorable canvas.
    pub const EXPLORABLE: ZoomBounds = ZoomBounds { min: 0.1, max: 4.0 };
    /// Compact embedded canvas.
    pub const COMPACT: ZoomBounds = ZoomBounds { min: 0.5, max: 2.0 };

    /// Clamps `scale` into the range. Inverted bounds are treated as swapped.
    pub fn clamp(&self, scale: f32) -> f32 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if scale.is_nan() || lo.is_nan() || hi.is_nan() {
            return if lo.is_nan() { 1.0 } else { lo };
        }
        scale.clamp(lo, hi)
    }
}

#[derive(Clone, Copy, Debug)]
struct Animation {
    from: Transform,
    to: Transform,
    start: Instant,
    duration: Duration,
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Owns the canvas transform.
///
/// Continuous gestures (wheel, drag) apply immediately and cancel any running animation.
/// Discrete commands (buttons) ease towards their target over
/// [`SettingsNavigation::animation_duration`] and accumulate when issued mid-animation.
#[derive(Clone, Debug)]
pub struct ViewportController {
    transform: Transform,
    settings: SettingsNavigation,
    viewport: Vec2,
    animation: Option<Animation>,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(SettingsNavigation::default())
    }
}

impl ViewportController {
    pub fn new(settings: SettingsNavigation) -> Self {
        Self {
            transform: Transform::IDENTITY,
            settings,
            viewport: Vec2::ZERO,
            animation: None,
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn bounds(&self) -> ZoomBounds {
        self.settings.zoom_bounds
    }

    pub fn settings(&self) -> &SettingsNavigation {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SettingsNavigation) {
        self.settings = settings;
        self.transform.scale = self.settings.zoom_bounds.clamp(self.transform.scale);
        self.animation = None;
    }

    /// Size of the canvas in screen units. Used as the default zoom anchor (its center).
    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport = size;
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn screen_to_world(&self, pos: Pos2) -> Pos2 {
        self.transform.screen_to_world(pos)
    }

    pub fn world_to_screen(&self, pos: Pos2) -> Pos2 {
        self.transform.world_to_screen(pos)
    }

    fn anchor_or_center(&self, anchor: Option<Pos2>) -> Pos2 {
        anchor.unwrap_or((self.viewport / 2.0).to_pos2())
    }

    fn cancel_animation(&mut self) {
        if self.animation.take().is_some() {
            log::trace!("viewport animation interrupted by a gesture");
        }
    }

    /// Immediate zoom, for wheel and pinch gestures.
    pub fn zoom_by(&mut self, factor: f32, anchor: Option<Pos2>) {
        self.cancel_animation();
        let anchor = self.anchor_or_center(anchor);
        self.transform = self
            .transform
            .zoomed(factor, anchor, self.settings.zoom_bounds);
    }

    /// Immediate pan, for drag gestures. `delta` is in screen units.
    pub fn pan_by(&mut self, delta: Vec2) {
        if !delta.x.is_finite() || !delta.y.is_finite() {
            return;
        }
        self.cancel_animation();
        self.transform.translate += delta;
    }

    pub fn zoom_in(&mut self, now: Instant) {
        self.zoom_by_animated(1.0 + self.settings.zoom_step, None, now);
    }

    pub fn zoom_out(&mut self, now: Instant) {
        self.zoom_by_animated(1.0 / (1.0 + self.settings.zoom_step), None, now);
    }

    pub fn zoom_by_animated(&mut self, factor: f32, anchor: Option<Pos2>, now: Instant) {
        let anchor = self.anchor_or_center(anchor);
        let target = self
            .target()
            .zoomed(factor, anchor, self.settings.zoom_bounds);
        self.animate_to(target, now);
    }

    pub fn pan_by_animated(&mut self, delta: Vec2, now: Instant) {
        let mut target = self.target();
        target.translate += delta;
        self.animate_to(target, now);
    }

    /// Eases back to [`Transform::IDENTITY`].
    pub fn reset_transform(&mut self, now: Instant) {
        let mut identity = Transform::IDENTITY;
        identity.scale = self.settings.zoom_bounds.clamp(identity.scale);
        self.animate_to(identity, now);
    }

    /// Eases to a transform showing all of `world` inside the viewport, keeping
    /// `settings.fit_padding` (fraction of the content size) around it.
    pub fn fit_to_rect(&mut self, world: Rect, now: Instant) {
        if !world.is_finite() || self.viewport.x <= 0.0 || self.viewport.y <= 0.0 {
            return;
        }
        let size = world.size() * (1.0 + self.settings.fit_padding);
        let mut scale = (self.viewport.x / size.x).min(self.viewport.y / size.y);
        if !scale.is_finite() || scale <= 0.0 {
            scale = 1.0;
        }
        let scale = self.settings.zoom_bounds.clamp(scale);
        let translate = self.viewport / 2.0 - world.center().to_vec2() * scale;
        self.animate_to(Transform { scale, translate }, now);
    }

    /// Where the transform ends up once the running animation, if any, completes.
    pub fn target(&self) -> Transform {
        self.animation.map_or(self.transform, |a| a.to)
    }

    fn animate_to(&mut self, to: Transform, now: Instant) {
        let duration = self.settings.animation_duration;
        if duration.is_zero() {
            self.animation = None;
            self.transform = to;
            return;
        }
        self.advance(now);
        self.animation = Some(Animation {
            from: self.transform,
            to,
            start: now,
            duration,
        });
    }

    /// Progresses the running animation to `now`. Returns `true` while it is still running.
    pub fn advance(&mut self, now: Instant) -> bool {
        let Some(a) = self.animation else {
            return false;
        };
        let elapsed = now.duration_since(a.start).as_secs_f32();
        let t = elapsed / a.duration.as_secs_f32();
        if t >= 1.0 {
            self.transform = a.to;
            self.animation = None;
            return false;
        }
        self.transform = a.from.lerp(&a.to, ease_in_out_cubic(t.max(0.0)));
        true
    }
}
