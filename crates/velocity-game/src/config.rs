//! Tuning knobs for a game session.
//!
//! Every struct uses `#[serde(default)]`, so a config file only needs the
//! fields it changes. Load one with [`velocity_data::load_config`].

use serde::{Deserialize, Serialize};

use velocity_core::id::PartId;
pub use velocity_grid::SynergyConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub progression: ProgressionConfig,
    pub synergy: SynergyConfig,
    pub economy: EconomyConfig,
}

/// Resource drip and win condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Primary drop credited per second at zero velocity.
    pub drop_rate: f64,
    /// Extra drop per unit of velocity, as a fraction of `drop_rate`.
    pub drop_scaling: f64,
    pub win_velocity: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            drop_rate: 0.5,
            drop_scaling: 0.002,
            win_velocity: 100_000.0,
        }
    }
}

impl ProgressionConfig {
    /// Drop amount for one tick of `dt` seconds at `velocity`.
    pub fn drop_amount(&self, velocity: f64, dt: f64) -> f64 {
        self.drop_rate * (1.0 + velocity * self.drop_scaling) * dt
    }
}

/// Shop prices and the contents of a fresh save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Per-level growth of the upgrade price.
    pub upgrade_growth: f64,
    /// Upgrade price as a fraction of the grown base cost.
    pub upgrade_factor: f64,
    pub starting_inventory: Vec<PartId>,
    pub starting_unlocks: Vec<PartId>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            upgrade_growth: 1.5,
            upgrade_factor: 0.5,
            starting_inventory: ["engine_basic", "wheel_basic", "frame_basic"]
                .into_iter()
                .map(PartId::from)
                .collect(),
            starting_unlocks: ["engine_basic", "wheel_basic", "frame_basic", "booster_basic"]
                .into_iter()
                .map(PartId::from)
                .collect(),
        }
    }
}

impl EconomyConfig {
    /// Price multiplier for the next upgrade of a part currently at `level`.
    pub fn upgrade_scale(&self, level: u32) -> f64 {
        self.upgrade_growth.powi(level.min(i32::MAX as u32) as i32) * self.upgrade_factor
    }
}
