use serde::{Deserialize, Serialize};

/// Tunables of the force simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceSettings {
    /// Time step used by [`super::LayoutEngine::apply_tick`].
    pub dt: f32,
    /// Rest length of link springs, world units.
    pub link_distance: f32,
    pub link_strength: f32,
    /// Strength of the pairwise repulsion, force is `charge / distance`.
    pub charge: f32,
    /// Strength of the pull towards the simulation center.
    pub center_strength: f32,
    /// Fraction of velocity lost per tick, in `[0, 1]`.
    pub damping: f32,
    /// Velocity cap, world units per unit of time.
    pub max_speed: f32,
    /// Distance floor used by every force to avoid singularities.
    pub min_distance: f32,
    /// Average kinetic energy per node below which the layout counts as settled.
    pub energy_threshold: f32,
    /// Hard stop for automatic ticking.
    pub max_ticks: u32,
    /// Side of the square new nodes are scattered in.
    pub seed_area: f32,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            dt: 1.0,
            link_distance: 120.0,
            link_strength: 0.05,
            charge: 600.0,
            center_strength: 0.01,
            damping: 0.4,
            max_speed: 20.0,
            min_distance: 1.0,
            energy_threshold: 0.01,
            max_ticks: 600,
            seed_area: 250.0,
        }
    }
}

impl ForceSettings {
    pub fn with_link_distance(mut self, link_distance: f32) -> Self {
        self.link_distance = link_distance;
        self
    }

    pub fn with_charge(mut self, charge: f32) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_center_strength(mut self, center_strength: f32) -> Self {
        self.center_strength = center_strength;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}
