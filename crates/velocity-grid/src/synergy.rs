//! Velocity computation.
//!
//! Engines are the only source of velocity. An engine's contribution is its
//! base velocity scaled by its own level and by every adjacent booster and
//! frame. Wheels raise a board-wide multiplier that scales the sum of all
//! engine contributions. Factors compound multiplicatively and are not
//! capped.

use serde::{Deserialize, Serialize};

use velocity_core::catalog::PartType;
use velocity_core::id::PartId;
use velocity_core::modifier::TechModifiers;

use crate::{GridEngine, GridPosition};

// ---------------------------------------------------------------------------
// Tuning
// ---------------------------------------------------------------------------

/// Synergy tuning. The fallbacks apply to parts whose definition carries no
/// synergy value of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynergyConfig {
    /// Per-level bonus on a part's own output.
    pub level_step: f64,
    /// Per-level bonus on a neighbour's synergy factor.
    pub neighbor_level_step: f64,
    pub default_wheel_bonus: f64,
    pub default_booster_factor: f64,
    pub default_frame_factor: f64,
}

impl Default for SynergyConfig {
    fn default() -> Self {
        Self {
            level_step: 0.2,
            neighbor_level_step: 0.1,
            default_wheel_bonus: 0.1,
            default_booster_factor: 2.0,
            default_frame_factor: 1.2,
        }
    }
}

impl SynergyConfig {
    /// `1 + (level - 1) * level_step`.
    pub fn level_multiplier(&self, level: u32) -> f64 {
        1.0 + f64::from(level.max(1) - 1) * self.level_step
    }

    /// `1 + (level - 1) * neighbor_level_step`.
    pub fn neighbor_multiplier(&self, level: u32) -> f64 {
        1.0 + f64::from(level.max(1) - 1) * self.neighbor_level_step
    }
}

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

/// One engine's share of the total, before the global multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineContribution {
    pub position: GridPosition,
    pub part: PartId,
    /// Base velocity after engine research and the engine's own level.
    pub base: f64,
    /// Product of all neighbour synergy factors.
    pub synergy: f64,
    /// `base * synergy`.
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VelocityBreakdown {
    pub engines: Vec<EngineContribution>,
    /// Research global multiplier plus every wheel's bonus.
    pub global_multiplier: f64,
    /// `sum(contribution) * global_multiplier`, never negative.
    pub total: f64,
}

pub(crate) fn compute(grid: &GridEngine, tech: &impl TechModifiers) -> VelocityBreakdown {
    let catalog = grid.catalog();
    let config = grid.config();
    let engine_mult = tech.engine_multiplier();
    let booster_bonus = tech.booster_synergy_bonus();

    let mut global = tech.global_multiplier();
    let mut engines = Vec::new();

    for (pos, placed) in grid.occupied() {
        // Stale ids contribute nothing.
        let Some(def) = catalog.part(placed.part.as_str()) else {
            continue;
        };
        let level_mult = config.level_multiplier(placed.level);

        match def.part_type {
            PartType::Wheel => {
                global += def.synergy_value_or(config.default_wheel_bonus) * level_mult;
            }
            PartType::Engine => {
                let base = def.base_velocity * engine_mult * level_mult;
                let mut synergy = 1.0;
                for (_, neighbor) in grid.neighbors_4(pos) {
                    let Some(ndef) = catalog.part(neighbor.part.as_str()) else {
                        continue;
                    };
                    let nmult = config.neighbor_multiplier(neighbor.level);
                    match ndef.part_type {
                        PartType::Booster => {
                            // A nerfed booster can slow an engine but never reverse it.
                            let factor = (ndef.synergy_value_or(config.default_booster_factor)
                                + booster_bonus)
                                .max(0.0);
                            synergy *= factor * nmult;
                        }
                        PartType::Frame => {
                            synergy *= ndef.synergy_value_or(config.default_frame_factor) * nmult;
                        }
                        PartType::Engine | PartType::Wheel => {}
                    }
                }
                engines.push(EngineContribution {
                    position: pos,
                    part: def.id.clone(),
                    base,
                    synergy,
                    contribution: base * synergy,
                });
            }
            PartType::Frame | PartType::Booster => {}
        }
    }

    let sum: f64 = engines.iter().map(|e| e.contribution).sum();
    let total = sum * global;
    VelocityBreakdown {
        engines,
        global_multiplier: global,
        // Also maps NaN to zero.
        total: if total > 0.0 { total } else { 0.0 },
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_core::modifier::{FlatModifiers, NoModifiers};
    use velocity_core::test_utils::*;

    fn grid() -> GridEngine {
        GridEngine::new(shared_test_catalog())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ---- Test 1: empty board ----
    #[test]
    fn empty_board_has_zero_velocity() {
        assert_eq!(grid().velocity(&NoModifiers), 0.0);
    }

    // ---- Test 2: no engines ----
    #[test]
    fn support_parts_alone_produce_nothing() {
        let mut g = grid();
        g.place(0, 0, "wheel_basic", 1).unwrap();
        g.place(1, 0, "frame_basic", 1).unwrap();
        g.place(2, 0, "booster_basic", 5).unwrap();
        assert_eq!(g.velocity(&NoModifiers), 0.0);
        assert!(g.velocity_breakdown(&NoModifiers).engines.is_empty());
    }

    // ---- Test 3: lone engine ----
    #[test]
    fn lone_engine_is_base_velocity() {
        let mut g = grid();
        g.place(5, 5, "engine_basic", 1).unwrap();
        assert!(approx(g.velocity(&NoModifiers), 10.0));
    }

    // ---- Test 4: frame and booster compound ----
    #[test]
    fn frame_and_booster_compound() {
        let mut g = grid();
        g.place(5, 5, "engine_basic", 1).unwrap();
        g.place(5, 4, "frame_basic", 1).unwrap();
        assert!(approx(g.velocity(&NoModifiers), 12.0));
        g.place(5, 6, "booster_basic", 1).unwrap();
        assert!(approx(g.velocity(&NoModifiers), 24.0));
    }

    // ---- Test 5: diagonal neighbours ignored ----
    #[test]
    fn diagonal_neighbors_ignored() {
        let mut g = grid();
        g.place(5, 5, "engine_basic", 1).unwrap();
        g.place(6, 6, "booster_basic", 1).unwrap();
        g.place(4, 4, "frame_basic", 1).unwrap();
        assert!(approx(g.velocity(&NoModifiers), 10.0));
    }

    // ---- Test 6: wheel raises global multiplier ----
    #[test]
    fn wheel_adds_to_global_multiplier() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        g.place(9, 9, "wheel_basic", 1).unwrap();
        let breakdown = g.velocity_breakdown(&NoModifiers);
        assert!(approx(breakdown.global_multiplier, 1.1));
        assert!(approx(breakdown.total, 11.0));
    }

    // ---- Test 7: engine level ----
    #[test]
    fn engine_level_scales_base() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        for _ in 0..3 {
            g.upgrade(0, 0).unwrap();
        }
        // level 4 -> 1 + 3 * 0.2
        assert!(approx(g.velocity(&NoModifiers), 16.0));
    }

    // ---- Test 8: neighbour level ----
    #[test]
    fn neighbor_level_scales_factor() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        g.place(1, 0, "booster_basic", 3).unwrap();
        // 2.0 * (1 + 2 * 0.1)
        assert!(approx(g.velocity(&NoModifiers), 24.0));
    }

    // ---- Test 9: wheel level ----
    #[test]
    fn wheel_level_scales_bonus() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        g.place(9, 9, "wheel_basic", 2).unwrap();
        // global 1 + 0.1 * 1.2
        assert!(approx(g.velocity(&NoModifiers), 11.2));
    }

    // ---- Test 10: research modifiers ----
    #[test]
    fn research_modifiers_apply() {
        let mut g = grid();
        g.place(5, 5, "engine_basic", 1).unwrap();
        g.place(5, 6, "booster_basic", 1).unwrap();

        let tech = FlatModifiers {
            engine: 1.1,
            booster_bonus: 0.5,
            global: 2.0,
            ..FlatModifiers::default()
        };
        // 10 * 1.1 * (2.0 + 0.5) * 2.0
        assert!(approx(g.velocity(&tech), 55.0));
    }

    #[test]
    fn nerfed_booster_never_goes_negative() {
        let mut g = grid();
        g.place(5, 5, "engine_basic", 1).unwrap();
        g.place(5, 6, "booster_basic", 1).unwrap();
        g.place(0, 0, "engine_basic", 1).unwrap();

        let mild = FlatModifiers {
            booster_bonus: -0.5,
            ..FlatModifiers::default()
        };
        // 10 * 1.5 + 10
        assert!(approx(g.velocity(&mild), 25.0));

        let harsh = FlatModifiers {
            booster_bonus: -5.0,
            ..FlatModifiers::default()
        };
        let breakdown = g.velocity_breakdown(&harsh);
        assert!(breakdown.engines.iter().all(|e| e.contribution >= 0.0));
        assert!(approx(breakdown.total, 10.0));
    }

    // ---- Test 11: engines do not boost engines ----
    #[test]
    fn adjacent_engines_are_independent() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        g.place(1, 0, "engine_v2", 1).unwrap();
        assert!(approx(g.velocity(&NoModifiers), 60.0));
        assert_eq!(g.velocity_breakdown(&NoModifiers).engines.len(), 2);
    }

    // ---- Test 12: shared booster ----
    #[test]
    fn booster_boosts_every_adjacent_engine() {
        let mut g = grid();
        g.place(4, 5, "engine_basic", 1).unwrap();
        g.place(6, 5, "engine_basic", 1).unwrap();
        g.place(5, 5, "booster_basic", 1).unwrap();
        assert!(approx(g.velocity(&NoModifiers), 40.0));
    }

    // ---- Test 13: breakdown entries ----
    #[test]
    fn breakdown_reports_each_engine() {
        let mut g = grid();
        g.place(2, 2, "engine_basic", 2).unwrap();
        g.place(2, 3, "frame_basic", 1).unwrap();
        let breakdown = g.velocity_breakdown(&NoModifiers);
        let engine = &breakdown.engines[0];
        assert_eq!(engine.position, GridPosition::new(2, 2));
        assert_eq!(engine.part.as_str(), "engine_basic");
        assert!(approx(engine.base, 12.0));
        assert!(approx(engine.synergy, 1.2));
        assert!(approx(engine.contribution, 14.4));
        assert!(approx(breakdown.total, 14.4));
    }

    // ---- Test 14: non-positive results clamp to zero ----
    #[test]
    fn negative_global_clamps_to_zero() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        let tech = FlatModifiers {
            global: -3.0,
            ..FlatModifiers::default()
        };
        assert_eq!(g.velocity(&tech), 0.0);
    }

    // ---- Test 15: tuning ----
    #[test]
    fn config_multipliers() {
        let config = SynergyConfig::default();
        assert_eq!(config.level_multiplier(1), 1.0);
        assert!(approx(config.level_multiplier(6), 2.0));
        assert_eq!(config.level_multiplier(0), 1.0);
        assert!(approx(config.neighbor_multiplier(11), 2.0));
    }

    #[test]
    fn custom_config_fallbacks_apply() {
        use velocity_core::catalog::{CatalogBuilder, PartType};
        use std::sync::Arc;

        let mut b = CatalogBuilder::new();
        b.register_material("scrap", "Scrap").unwrap();
        b.register_part(engine_def("engine_basic", 10.0)).unwrap();
        b.register_part(part_def(
            "frame_plain",
            PartType::Frame,
            0.0,
            None,
            0.0,
            cost(&[("scrap", 1)]),
        ))
        .unwrap();
        b.register_area(velocity_core::catalog::AreaDefinition {
            id: "area_start".into(),
            display_name: "Start".into(),
            velocity_threshold: 0.0,
            primary_drop: "scrap".into(),
        })
        .unwrap();
        let catalog = Arc::new(b.build().unwrap());

        let config = SynergyConfig {
            default_frame_factor: 1.5,
            ..SynergyConfig::default()
        };
        let mut g = GridEngine::with_config(catalog, config);
        g.place(0, 0, "engine_basic", 1).unwrap();
        g.place(0, 1, "frame_plain", 1).unwrap();
        assert!(approx(g.velocity(&NoModifiers), 15.0));
    }
}
