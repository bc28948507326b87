//! Read-only research bonus queries.
//!
//! The grid folds these into its velocity computation without depending on
//! the tech crate, and the shop uses [`TechModifiers::cost_multiplier`] to
//! price parts.

use crate::id::PartId;

pub trait TechModifiers {
    /// Product of all researched engine multipliers. Identity 1.0.
    fn engine_multiplier(&self) -> f64;

    /// Sum of all researched booster synergy bonuses. Identity 0.0.
    fn booster_synergy_bonus(&self) -> f64;

    /// Product of all researched global multipliers. Identity 1.0.
    fn global_multiplier(&self) -> f64;

    /// Product of researched cost reductions targeting `part`. Identity 1.0.
    fn cost_multiplier(&self, part: &PartId) -> f64;
}

/// No research at all. Every query returns its identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModifiers;

impl TechModifiers for NoModifiers {
    fn engine_multiplier(&self) -> f64 {
        1.0
    }

    fn booster_synergy_bonus(&self) -> f64 {
        0.0
    }

    fn global_multiplier(&self) -> f64 {
        1.0
    }

    fn cost_multiplier(&self, _part: &PartId) -> f64 {
        1.0
    }
}

/// Fixed modifier values, for tests and tooling that need research bonuses
/// without a tech ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatModifiers {
    pub engine: f64,
    pub booster_bonus: f64,
    pub global: f64,
    pub cost: f64,
}

impl Default for FlatModifiers {
    fn default() -> Self {
        Self {
            engine: 1.0,
            booster_bonus: 0.0,
            global: 1.0,
            cost: 1.0,
        }
    }
}

impl TechModifiers for FlatModifiers {
    fn engine_multiplier(&self) -> f64 {
        self.engine
    }

    fn booster_synergy_bonus(&self) -> f64 {
        self.booster_bonus
    }

    fn global_multiplier(&self) -> f64 {
        self.global
    }

    fn cost_multiplier(&self, _part: &PartId) -> f64 {
        self.cost
    }
}

impl<T: TechModifiers + ?Sized> TechModifiers for &T {
    fn engine_multiplier(&self) -> f64 {
        (**self).engine_multiplier()
    }

    fn booster_synergy_bonus(&self) -> f64 {
        (**self).booster_synergy_bonus()
    }

    fn global_multiplier(&self) -> f64 {
        (**self).global_multiplier()
    }

    fn cost_multiplier(&self, part: &PartId) -> f64 {
        (**self).cost_multiplier(part)
    }
}
