//! The per-tick progression step.
//!
//! Each tick recomputes velocity from the board, advances distance, drips
//! the current area's primary drop, and then runs the one-way milestones:
//! best velocity, game clear, part unlocks and area unlocks. Milestones only
//! ever move forward, so a board that gets slower never re-locks anything.

use std::collections::BTreeSet;
use std::sync::Arc;

use velocity_core::catalog::Catalog;
use velocity_core::event::{EventBus, GameEvent};
use velocity_core::fixed::Ticks;
use velocity_core::id::{AreaId, PartId};
use velocity_core::modifier::TechModifiers;
use velocity_core::resources::ResourceLedger;
use velocity_grid::GridEngine;

use crate::config::ProgressionConfig;
use crate::error::GameError;

/// Scalar progress of a save.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionState {
    /// Velocity computed on the last tick.
    pub velocity: f64,
    /// Best velocity ever reached. Never decreases.
    pub max_velocity: f64,
    /// Distance travelled. Never decreases.
    pub distance: f64,
    pub current_area: AreaId,
    /// Parts shown in the shop. Only grows.
    pub unlocked_parts: BTreeSet<PartId>,
    /// Set once `max_velocity` reaches the win velocity.
    pub cleared: bool,
}

impl ProgressionState {
    /// A fresh save standing in `area` with `unlocked` in the shop.
    pub fn new(area: AreaId, unlocked: impl IntoIterator<Item = PartId>) -> Self {
        Self {
            velocity: 0.0,
            max_velocity: 0.0,
            distance: 0.0,
            current_area: area,
            unlocked_parts: unlocked.into_iter().collect(),
            cleared: false,
        }
    }
}

/// Drives [`ProgressionState`] forward against a catalog.
#[derive(Debug, Clone)]
pub struct Progression {
    catalog: Arc<Catalog>,
    config: ProgressionConfig,
    state: ProgressionState,
}

impl Progression {
    /// Start a new game in the catalog's starting area. Unknown ids in
    /// `starting_unlocks` are ignored.
    pub fn new(catalog: Arc<Catalog>, config: ProgressionConfig, starting_unlocks: &[PartId]) -> Self {
        let unlocked = starting_unlocks
            .iter()
            .filter(|id| catalog.part(id.as_str()).is_some())
            .cloned();
        let state = ProgressionState::new(catalog.starting_area().id.clone(), unlocked);
        Self {
            catalog,
            config,
            state,
        }
    }

    /// Adopt a loaded state, repairing whatever the catalog disagrees with.
    ///
    /// Non-finite or negative numbers become 0, `max_velocity` is raised to
    /// the saved velocity, unknown parts leave the unlock set, parts earned
    /// under `max_velocity` join it, an unreachable area falls back to the
    /// starting area, and `cleared` is recomputed from the win velocity.
    pub fn restore(
        catalog: Arc<Catalog>,
        config: ProgressionConfig,
        starting_unlocks: &[PartId],
        mut state: ProgressionState,
    ) -> Self {
        state.velocity = sanitize(state.velocity);
        state.distance = sanitize(state.distance);
        state.max_velocity = sanitize(state.max_velocity).max(state.velocity);

        let before = state.unlocked_parts.len();
        state
            .unlocked_parts
            .retain(|id| catalog.part(id.as_str()).is_some());
        if state.unlocked_parts.len() < before {
            log::warn!(
                "dropped {} unknown unlocked parts from save",
                before - state.unlocked_parts.len()
            );
        }
        state.unlocked_parts.extend(
            starting_unlocks
                .iter()
                .filter(|id| catalog.part(id.as_str()).is_some())
                .cloned(),
        );

        let reachable = catalog
            .area(state.current_area.as_str())
            .is_some_and(|area| area.velocity_threshold <= state.max_velocity);
        if !reachable {
            let start = catalog.starting_area().id.clone();
            log::warn!(
                "saved area {} is unknown or locked, moving to {start}",
                state.current_area
            );
            state.current_area = start;
        }

        state.cleared = state.cleared || state.max_velocity >= config.win_velocity;

        let mut progression = Self {
            catalog,
            config,
            state,
        };
        progression.sweep_unlocks();
        progression
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn is_unlocked(&self, part: &str) -> bool {
        self.state.unlocked_parts.contains(part)
    }

    /// Advance by `dt` seconds and return the velocity used.
    ///
    /// A non-finite or negative `dt` counts as 0. With `dt == 0` nothing
    /// accrues, but velocity and milestones are still refreshed.
    pub fn tick(
        &mut self,
        dt: f64,
        grid: &GridEngine,
        tech: &impl TechModifiers,
        resources: &mut ResourceLedger,
        events: &mut EventBus,
        now: Ticks,
    ) -> f64 {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let velocity = grid.velocity(tech);
        self.state.velocity = velocity;

        if dt > 0.0 {
            self.state.distance += velocity * dt;
            if velocity > 0.0 {
                if let Some(area) = self.catalog.area(self.state.current_area.as_str()) {
                    resources.credit_f64(&area.primary_drop, self.config.drop_amount(velocity, dt));
                }
            }
        }

        let previous_best = self.state.max_velocity;
        self.state.max_velocity = previous_best.max(velocity);

        if !self.state.cleared && self.state.max_velocity >= self.config.win_velocity {
            self.state.cleared = true;
            log::info!("game cleared at velocity {:.1}", self.state.max_velocity);
            events.emit(GameEvent::GameCleared {
                max_velocity: self.state.max_velocity,
                tick: now,
            });
        }

        for area in self.catalog.areas_by_threshold() {
            let threshold = area.velocity_threshold;
            if threshold > previous_best && threshold <= self.state.max_velocity {
                log::info!("area unlocked: {}", area.id);
                events.emit(GameEvent::AreaUnlocked {
                    area: area.id.clone(),
                    tick: now,
                });
            }
        }

        let unlocked = self.sweep_unlocks();
        if !unlocked.is_empty() {
            for part in unlocked {
                events.emit(GameEvent::PartUnlocked { part, tick: now });
            }
            events.emit(GameEvent::ShopChanged { tick: now });
        }

        velocity
    }

    /// Move to another area. Only areas at or below the best velocity are
    /// selectable. Selecting the current area is accepted and emits nothing.
    pub fn select_area(
        &mut self,
        id: &str,
        events: &mut EventBus,
        now: Ticks,
    ) -> Result<(), GameError> {
        let area = self
            .catalog
            .area(id)
            .ok_or_else(|| GameError::UnknownArea(AreaId::from(id)))?;
        if area.velocity_threshold > self.state.max_velocity {
            return Err(GameError::AreaLocked {
                area: area.id.clone(),
                threshold: area.velocity_threshold,
                max_velocity: self.state.max_velocity,
            });
        }
        if area.id != self.state.current_area {
            self.state.current_area = area.id.clone();
            events.emit(GameEvent::AreaChanged {
                area: area.id.clone(),
                tick: now,
            });
        }
        Ok(())
    }

    /// Velocity recomputed outside a tick, e.g. right after loading.
    pub(crate) fn refresh_velocity(&mut self, grid: &GridEngine, tech: &impl TechModifiers) {
        self.state.velocity = grid.velocity(tech);
    }

    /// Unlock every part earned under `max_velocity`. Returns the new ones in
    /// catalog order.
    fn sweep_unlocks(&mut self) -> Vec<PartId> {
        let max_velocity = self.state.max_velocity;
        let mut added = Vec::new();
        for part in self.catalog.parts() {
            if part.unlock_velocity <= max_velocity
                && self.state.unlocked_parts.insert(part.id.clone())
            {
                added.push(part.id.clone());
            }
        }
        added
    }
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_core::event::EventKind;
    use velocity_core::fixed::{Amount, amount_to_f64};
    use velocity_core::modifier::NoModifiers;
    use velocity_core::test_utils::*;

    fn basics() -> Vec<PartId> {
        ["engine_basic", "wheel_basic", "frame_basic"]
            .into_iter()
            .map(PartId::from)
            .collect()
    }

    fn setup() -> (Progression, GridEngine, ResourceLedger, EventBus) {
        let catalog = shared_test_catalog();
        let progression = Progression::new(catalog.clone(), ProgressionConfig::default(), &basics());
        let resources = ResourceLedger::for_catalog(&catalog);
        (progression, GridEngine::new(catalog), resources, EventBus::new(64))
    }

    /// Fill the first `n` cells of row 0 with basic engines.
    fn engines(grid: &mut GridEngine, n: i32) {
        for x in 0..n {
            grid.place(x, 0, "engine_basic", 1).unwrap();
        }
    }

    fn kinds(events: &mut EventBus) -> Vec<EventKind> {
        events.drain().iter().map(GameEvent::kind).collect()
    }

    // -----------------------------------------------------------------------
    // Test 1: one second with a lone engine
    // -----------------------------------------------------------------------
    #[test]
    fn tick_accrues_distance_and_drop() {
        let (mut progression, mut grid, mut resources, mut events) = setup();
        engines(&mut grid, 1);

        let v = progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 1);
        assert!((v - 10.0).abs() < 1e-9);
        assert!((progression.state().distance - 10.0).abs() < 1e-9);
        // 0.5 * (1 + 10 * 0.002)
        assert!((amount_to_f64(resources.balance("scrap")) - 0.51).abs() < 1e-6);
        assert_eq!(resources.balance("rubber"), Amount::ZERO);
    }

    // -----------------------------------------------------------------------
    // Test 2: zero and invalid dt accrue nothing
    // -----------------------------------------------------------------------
    #[test]
    fn degenerate_dt_is_zero() {
        let (mut progression, mut grid, mut resources, mut events) = setup();
        engines(&mut grid, 1);

        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let v = progression.tick(dt, &grid, &NoModifiers, &mut resources, &mut events, 1);
            assert!((v - 10.0).abs() < 1e-9);
        }
        assert_eq!(progression.state().distance, 0.0);
        assert_eq!(resources.balance("scrap"), Amount::ZERO);
        assert!((progression.state().max_velocity - 10.0).abs() < 1e-9);
    }

    // -----------------------------------------------------------------------
    // Test 3: empty board earns nothing
    // -----------------------------------------------------------------------
    #[test]
    fn empty_board_has_no_drop() {
        let (mut progression, grid, mut resources, mut events) = setup();
        let v = progression.tick(5.0, &grid, &NoModifiers, &mut resources, &mut events, 1);
        assert_eq!(v, 0.0);
        assert_eq!(progression.state().distance, 0.0);
        assert_eq!(resources.balance("scrap"), Amount::ZERO);
    }

    // -----------------------------------------------------------------------
    // Test 4: best velocity survives a slower board
    // -----------------------------------------------------------------------
    #[test]
    fn max_velocity_is_monotonic() {
        let (mut progression, mut grid, mut resources, mut events) = setup();
        engines(&mut grid, 3);
        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 1);

        grid.remove(0, 0).unwrap();
        grid.remove(1, 0).unwrap();
        let v = progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 2);
        assert!((v - 10.0).abs() < 1e-9);
        assert!((progression.state().max_velocity - 30.0).abs() < 1e-9);
        assert!((progression.state().distance - 40.0).abs() < 1e-9);
    }

    // -----------------------------------------------------------------------
    // Test 5: unlock sweep fires once per part plus one shop change
    // -----------------------------------------------------------------------
    #[test]
    fn unlock_sweep_emits_once() {
        let (mut progression, mut grid, mut resources, mut events) = setup();
        assert!(!progression.is_unlocked("engine_v2"));

        engines(&mut grid, 6);
        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 1);
        assert!(progression.is_unlocked("engine_v2"));
        assert!(!progression.is_unlocked("booster_basic"));

        let drained = events.drain();
        let unlocked: Vec<&str> = drained
            .iter()
            .filter_map(|e| match e {
                GameEvent::PartUnlocked { part, .. } => Some(part.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(unlocked, vec!["engine_v2"]);
        assert_eq!(
            drained.iter().filter(|e| e.kind() == EventKind::ShopChanged).count(),
            1
        );

        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 2);
        assert!(kinds(&mut events).is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 6: areas announce themselves when first reachable
    // -----------------------------------------------------------------------
    #[test]
    fn area_unlocked_once() {
        let (mut progression, mut grid, mut resources, mut events) = setup();
        engines(&mut grid, 10);
        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 1);

        let drained = events.drain();
        let areas: Vec<&str> = drained
            .iter()
            .filter_map(|e| match e {
                GameEvent::AreaUnlocked { area, .. } => Some(area.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(areas, vec!["area_highway"]);

        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 2);
        assert!(!kinds(&mut events).contains(&EventKind::AreaUnlocked));
    }

    // -----------------------------------------------------------------------
    // Test 7: game clear is one-way and announced once
    // -----------------------------------------------------------------------
    #[test]
    fn game_cleared_once() {
        let catalog = shared_test_catalog();
        let config = ProgressionConfig {
            win_velocity: 20.0,
            ..ProgressionConfig::default()
        };
        let mut progression = Progression::new(catalog.clone(), config, &basics());
        let mut grid = GridEngine::new(catalog.clone());
        let mut resources = ResourceLedger::for_catalog(&catalog);
        let mut events = EventBus::new(64);

        engines(&mut grid, 2);
        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 1);
        assert!(progression.state().cleared);
        assert!(kinds(&mut events).contains(&EventKind::GameCleared));

        grid.clear();
        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 2);
        assert!(progression.state().cleared);
        assert!(!kinds(&mut events).contains(&EventKind::GameCleared));
    }

    // -----------------------------------------------------------------------
    // Test 8: manual area selection
    // -----------------------------------------------------------------------
    #[test]
    fn select_area_requires_threshold() {
        let (mut progression, mut grid, mut resources, mut events) = setup();

        assert!(matches!(
            progression.select_area("area_highway", &mut events, 0),
            Err(GameError::AreaLocked { .. })
        ));
        assert!(matches!(
            progression.select_area("area_moon", &mut events, 0),
            Err(GameError::UnknownArea(_))
        ));
        assert_eq!(progression.state().current_area.as_str(), "area_junkyard");

        engines(&mut grid, 10);
        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 1);
        events.clear();

        progression.select_area("area_highway", &mut events, 2).unwrap();
        assert_eq!(progression.state().current_area.as_str(), "area_highway");
        assert_eq!(kinds(&mut events), vec![EventKind::AreaChanged]);

        // Reselecting is a silent no-op.
        progression.select_area("area_highway", &mut events, 3).unwrap();
        assert!(kinds(&mut events).is_empty());

        // Drops now come from the highway.
        let before = resources.balance("rubber");
        progression.tick(1.0, &grid, &NoModifiers, &mut resources, &mut events, 4);
        assert!(resources.balance("rubber") > before);
    }

    // -----------------------------------------------------------------------
    // Test 9: restore repairs a damaged state
    // -----------------------------------------------------------------------
    #[test]
    fn restore_normalises_state() {
        let catalog = shared_test_catalog();
        let mut saved = ProgressionState::new(AreaId::from("area_city"), [PartId::from("warp_drive")]);
        saved.velocity = 120.0;
        saved.max_velocity = f64::NAN;
        saved.distance = -5.0;

        let progression =
            Progression::restore(catalog, ProgressionConfig::default(), &basics(), saved);
        let state = progression.state();
        assert_eq!(state.max_velocity, 120.0);
        assert_eq!(state.distance, 0.0);
        // City needs 2000, so the save falls back to the start.
        assert_eq!(state.current_area.as_str(), "area_junkyard");
        assert!(!state.unlocked_parts.contains("warp_drive"));
        assert!(state.unlocked_parts.contains("engine_basic"));
        assert!(state.unlocked_parts.contains("booster_basic"));
        assert!(!state.cleared);
    }

    #[test]
    fn restore_keeps_reachable_area_and_sets_cleared() {
        let catalog = shared_test_catalog();
        let mut saved = ProgressionState::new(AreaId::from("area_highway"), []);
        saved.max_velocity = 150_000.0;

        let progression =
            Progression::restore(catalog, ProgressionConfig::default(), &basics(), saved);
        assert_eq!(progression.state().current_area.as_str(), "area_highway");
        assert!(progression.state().cleared);
    }
}
