use egui::{Pos2, Rect, Vec2};
use petgraph::stable_graph::NodeIndex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{
    forces::{compute_centering, compute_links, compute_repulsion},
    ForceSettings,
};
use crate::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Pin {
    at: Pos2,
    released: bool,
}

/// Simulated state of one node: position, velocity and an optional drag pin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub(crate) pos: Pos2,
    pub(crate) vel: Vec2,
    pin: Option<Pin>,
}

impl Body {
    pub fn at(pos: Pos2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            pin: None,
        }
    }

    pub fn pos(&self) -> Pos2 {
        self.pos
    }

    pub fn vel(&self) -> Vec2 {
        self.vel
    }

    /// Pointer location the body is held at, if a drag owns it.
    pub fn pinned(&self) -> Option<Pos2> {
        self.pin.map(|p| p.at)
    }

    fn is_finite(&self) -> bool {
        self.pos.x.is_finite()
            && self.pos.y.is_finite()
            && self.vel.x.is_finite()
            && self.vel.y.is_finite()
    }
}

/// Outcome of a single simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub energy: f32,
    pub settled: bool,
}

/// Force-directed layout engine.
///
/// Owns the position and velocity of every node of the graph it was created for. The only
/// other writer is an interactive drag, which takes ownership of a single node through
/// [`LayoutEngine::pin_node`] and hands it back with [`LayoutEngine::release_node`].
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    settings: ForceSettings,
    bodies: Vec<Body>,
    center: Pos2,
    ticks: u32,
    energy: f32,

    // Reusable force buffer to avoid per-frame allocations
    scratch: Vec<Vec2>,
}

impl LayoutEngine {
    /// Creates an engine for `g` with randomly scattered initial positions.
    pub fn new(g: &Graph, settings: ForceSettings) -> Self {
        Self::seeded(g, settings, &mut rand::rng())
    }

    /// Same as [`LayoutEngine::new`] but reproducible.
    pub fn with_seed(g: &Graph, settings: ForceSettings, seed: u64) -> Self {
        Self::seeded(g, settings, &mut StdRng::seed_from_u64(seed))
    }

    /// Creates an engine from explicit initial positions, one per node index.
    pub fn from_positions(settings: ForceSettings, positions: impl IntoIterator<Item = Pos2>) -> Self {
        let bodies: Vec<Body> = positions.into_iter().map(Body::at).collect();
        Self {
            settings,
            scratch: Vec::with_capacity(bodies.len()),
            bodies,
            center: Pos2::ZERO,
            ticks: 0,
            energy: 0.0,
        }
    }

    fn seeded<R: Rng>(g: &Graph, settings: ForceSettings, rng: &mut R) -> Self {
        let half = (settings.seed_area / 2.0).max(1.0);
        let positions: Vec<Pos2> = (0..g.node_count())
            .map(|_| Pos2::new(rng.random_range(-half..half), rng.random_range(-half..half)))
            .collect();
        Self::from_positions(settings, positions)
    }

    pub fn settings(&self) -> &ForceSettings {
        &self.settings
    }

    /// Replaces the tunables and restarts the simulation with the current positions.
    pub fn set_settings(&mut self, settings: ForceSettings) {
        self.settings = settings;
        self.reheat();
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, idx: NodeIndex) -> Option<&Body> {
        self.bodies.get(idx.index())
    }

    pub fn position(&self, idx: NodeIndex) -> Option<Pos2> {
        self.body(idx).map(Body::pos)
    }

    /// Point the centering force pulls towards, world coordinates.
    pub fn center(&self) -> Pos2 {
        self.center
    }

    pub fn set_center(&mut self, center: Pos2) {
        if center.x.is_finite() && center.y.is_finite() {
            self.center = center;
        }
    }

    /// Moves the centering point to `center` and translates every body by the same offset, so
    /// the layout keeps its shape.
    pub fn recenter(&mut self, center: Pos2) {
        if !center.x.is_finite() || !center.y.is_finite() {
            return;
        }
        let offset = center - self.center;
        for body in &mut self.bodies {
            body.pos += offset;
            if let Some(pin) = body.pin.as_mut() {
                pin.at += offset;
            }
        }
        self.center = center;
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Kinetic energy `Σ ½|v|²` after the last step.
    pub fn kinetic_energy(&self) -> f32 {
        self.energy
    }

    /// Whether automatic ticking may stop. A pinned node always keeps the simulation awake.
    pub fn is_settled(&self) -> bool {
        if self.bodies.iter().any(|b| b.pin.is_some()) {
            return false;
        }
        if self.ticks >= self.settings.max_ticks {
            return true;
        }
        let n = self.bodies.len().max(1) as f32;
        self.ticks > 0 && self.energy < self.settings.energy_threshold * n
    }

    /// Restarts automatic ticking without touching positions.
    pub fn reheat(&mut self) {
        self.ticks = 0;
    }

    /// Advances the simulation with the configured time step.
    pub fn apply_tick(&mut self, g: &Graph) -> TickReport {
        self.step(g, self.settings.dt)
    }

    /// Advances the simulation by `dt`.
    ///
    /// Runs regardless of [`LayoutEngine::is_settled`]: convergence only tells hosts when they
    /// may stop calling this.
    pub fn step(&mut self, g: &Graph, dt: f32) -> TickReport {
        if !dt.is_finite() || dt <= 0.0 || self.bodies.is_empty() {
            return self.report();
        }

        if self.scratch.len() == self.bodies.len() {
            self.scratch.fill(Vec2::ZERO);
        } else {
            self.scratch.clear();
            self.scratch.resize(self.bodies.len(), Vec2::ZERO);
        }

        let s = &self.settings;
        compute_repulsion(&self.bodies, &mut self.scratch, s.charge, s.min_distance);
        compute_links(
            g,
            &self.bodies,
            &mut self.scratch,
            s.link_distance,
            s.link_strength,
            s.min_distance,
        );
        compute_centering(&self.bodies, &mut self.scratch, self.center, s.center_strength);

        let retain = 1.0 - s.damping.clamp(0.0, 1.0);
        let mut energy = 0.0;
        for (body, force) in self.bodies.iter_mut().zip(&self.scratch) {
            if let Some(pin) = body.pin {
                body.pos = pin.at;
                body.vel = Vec2::ZERO;
                if pin.released {
                    body.pin = None;
                }
                continue;
            }

            let mut vel = (body.vel + *force * dt) * retain;
            if vel.length() > s.max_speed {
                vel = vel.normalized() * s.max_speed;
            }
            let candidate = Body {
                pos: body.pos + vel * dt,
                vel,
                pin: None,
            };
            if !candidate.is_finite() {
                body.vel = Vec2::ZERO;
                continue;
            }
            *body = candidate;
            energy += 0.5 * vel.length_sq();
        }

        self.energy = energy;
        self.ticks = self.ticks.saturating_add(1);
        self.report()
    }

    fn report(&self) -> TickReport {
        TickReport {
            energy: self.energy,
            settled: self.is_settled(),
        }
    }

    /// Pins node `id` to `(x, y)`. Returns `false` for unknown ids or non-finite targets.
    pub fn pin_node(&mut self, g: &Graph, id: &str, x: f32, y: f32) -> bool {
        g.index_of(id)
            .is_some_and(|idx| self.pin_index(idx, Pos2::new(x, y)))
    }

    /// Hands node `id` back to the simulation. Returns `false` if it was not pinned.
    pub fn release_node(&mut self, g: &Graph, id: &str) -> bool {
        g.index_of(id).is_some_and(|idx| self.release_index(idx))
    }

    /// Takes ownership of a body: it jumps to `at`, stops, and stays there until released.
    pub fn pin_index(&mut self, idx: NodeIndex, at: Pos2) -> bool {
        if !at.x.is_finite() || !at.y.is_finite() {
            return false;
        }
        let Some(body) = self.bodies.get_mut(idx.index()) else {
            return false;
        };
        body.pos = at;
        body.vel = Vec2::ZERO;
        body.pin = Some(Pin {
            at,
            released: false,
        });
        self.reheat();
        true
    }

    /// Releases a pin. The next step keeps the body at its pinned position with zero velocity,
    /// then clears the pin.
    pub fn release_index(&mut self, idx: NodeIndex) -> bool {
        let Some(pin) = self
            .bodies
            .get_mut(idx.index())
            .and_then(|b| b.pin.as_mut())
        else {
            return false;
        };
        pin.released = true;
        true
    }

    pub fn is_pinned(&self, idx: NodeIndex) -> bool {
        self.body(idx).is_some_and(|b| b.pin.is_some())
    }

    /// Bounding rectangle of all node centers, [`Rect::NOTHING`] when empty.
    pub fn bounds(&self) -> Rect {
        self.bodies.iter().fold(Rect::NOTHING, |mut r, b| {
            r.extend_with(b.pos);
            r
        })
    }
}
