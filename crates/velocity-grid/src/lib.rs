//! Grid module for part placement, adjacency, and velocity.
//!
//! The board is a fixed 10x10 grid. Each cell holds at most one
//! [`PlacedPart`]. Parts interact only with their four orthogonal
//! neighbours: the [`synergy`] module folds those interactions and the
//! research modifiers into a single velocity number.
//!
//! Every operation is total. Invalid requests come back as [`GridError`]
//! values and leave the board untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use velocity_core::catalog::Catalog;
use velocity_core::id::PartId;
use velocity_core::modifier::TechModifiers;

pub mod snapshot;
pub mod synergy;

pub use snapshot::{BoardSnapshot, ImportReport, SnapshotCell};
pub use synergy::{EngineContribution, SynergyConfig, VelocityBreakdown};

/// Board width in cells.
pub const GRID_WIDTH: i32 = 10;
/// Board height in cells.
pub const GRID_HEIGHT: i32 = 10;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position on the board. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent position in `dir`. May fall outside the board.
    pub fn step(&self, dir: Direction) -> GridPosition {
        let (dx, dy) = dir.offset();
        GridPosition::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(&self) -> bool {
        (0..GRID_WIDTH).contains(&self.x) && (0..GRID_HEIGHT).contains(&self.y)
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridPosition {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Cardinal directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Offset for this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

/// A part sitting on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedPart {
    pub part: PartId,
    /// Upgrade level, at least 1.
    pub level: u32,
}

impl PlacedPart {
    /// Levels below 1 are raised to 1.
    pub fn new(part: impl Into<PartId>, level: u32) -> Self {
        Self {
            part: part.into(),
            level: level.max(1),
        }
    }
}

/// Errors from grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("position {0} is outside the board")]
    OutOfBounds(GridPosition),
    #[error("position {0} is occupied")]
    Occupied(GridPosition),
    #[error("position {0} is empty")]
    Empty(GridPosition),
    #[error("unknown part: {0}")]
    UnknownPart(PartId),
}

// ---------------------------------------------------------------------------
// GridEngine
// ---------------------------------------------------------------------------

/// The board plus the catalog its parts resolve in.
///
/// Velocity is never cached: [`GridEngine::velocity`] recomputes from the
/// current cells every call.
#[derive(Debug, Clone)]
pub struct GridEngine {
    catalog: Arc<Catalog>,
    config: SynergyConfig,
    cells: BTreeMap<GridPosition, PlacedPart>,
}

impl GridEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, SynergyConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: SynergyConfig) -> Self {
        Self {
            catalog,
            config,
            cells: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &SynergyConfig {
        &self.config
    }

    fn checked(x: i32, y: i32) -> Result<GridPosition, GridError> {
        let pos = GridPosition::new(x, y);
        if pos.in_bounds() {
            Ok(pos)
        } else {
            Err(GridError::OutOfBounds(pos))
        }
    }

    // -- Placement --

    /// Place a part on an empty cell. `level` is clamped to at least 1.
    pub fn place(&mut self, x: i32, y: i32, part: &str, level: u32) -> Result<(), GridError> {
        let pos = Self::checked(x, y)?;
        if self.cells.contains_key(&pos) {
            return Err(GridError::Occupied(pos));
        }
        let def = self
            .catalog
            .part(part)
            .ok_or_else(|| GridError::UnknownPart(PartId::from(part)))?;
        self.cells.insert(pos, PlacedPart::new(def.id.clone(), level));
        Ok(())
    }

    /// Clear a cell, returning what was there. An empty cell is not an error.
    pub fn remove(&mut self, x: i32, y: i32) -> Result<Option<PlacedPart>, GridError> {
        let pos = Self::checked(x, y)?;
        Ok(self.cells.remove(&pos))
    }

    /// Raise the level of an occupied cell by one. Returns the new level.
    pub fn upgrade(&mut self, x: i32, y: i32) -> Result<u32, GridError> {
        let pos = Self::checked(x, y)?;
        let placed = self.cells.get_mut(&pos).ok_or(GridError::Empty(pos))?;
        placed.level = placed.level.saturating_add(1);
        Ok(placed.level)
    }

    /// Move the part at `from` to `to`. If `to` is occupied the two parts
    /// swap places. Moving a part onto its own cell does nothing.
    pub fn move_part(&mut self, from: (i32, i32), to: (i32, i32)) -> Result<(), GridError> {
        let from = Self::checked(from.0, from.1)?;
        let to = Self::checked(to.0, to.1)?;
        if !self.cells.contains_key(&from) {
            return Err(GridError::Empty(from));
        }
        if from == to {
            return Ok(());
        }

        let moving = self.cells.remove(&from);
        let displaced = self.cells.remove(&to);
        if let Some(part) = moving {
            self.cells.insert(to, part);
        }
        if let Some(part) = displaced {
            self.cells.insert(from, part);
        }
        Ok(())
    }

    /// Remove every part.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    // -- Point queries --

    /// The part at a cell. Out-of-bounds reads as empty.
    pub fn cell(&self, x: i32, y: i32) -> Option<&PlacedPart> {
        self.cells.get(&GridPosition::new(x, y))
    }

    /// Occupied cells in position order.
    pub fn occupied(&self) -> impl Iterator<Item = (GridPosition, &PlacedPart)> {
        self.cells.iter().map(|(pos, part)| (*pos, part))
    }

    /// Occupied orthogonal neighbours of `pos`.
    pub fn neighbors_4(&self, pos: GridPosition) -> Vec<(Direction, &PlacedPart)> {
        Direction::all()
            .into_iter()
            .filter_map(|dir| self.cells.get(&pos.step(dir)).map(|p| (dir, p)))
            .collect()
    }

    pub fn part_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // -- Velocity --

    /// Total velocity of the current board under `tech`.
    pub fn velocity(&self, tech: &impl TechModifiers) -> f64 {
        self.velocity_breakdown(tech).total
    }

    /// Per-engine contributions and the global multiplier behind
    /// [`GridEngine::velocity`].
    pub fn velocity_breakdown(&self, tech: &impl TechModifiers) -> VelocityBreakdown {
        synergy::compute(self, tech)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_core::test_utils::*;

    fn grid() -> GridEngine {
        GridEngine::new(shared_test_catalog())
    }

    // -----------------------------------------------------------------------
    // GridPosition / Direction
    // -----------------------------------------------------------------------

    #[test]
    fn step_follows_direction_offsets() {
        let pos = GridPosition::new(5, 5);
        assert_eq!(pos.step(Direction::North), GridPosition::new(5, 4));
        assert_eq!(pos.step(Direction::East), GridPosition::new(6, 5));
        assert_eq!(pos.step(Direction::South), GridPosition::new(5, 6));
        assert_eq!(pos.step(Direction::West), GridPosition::new(4, 5));
    }

    #[test]
    fn bounds_are_ten_by_ten() {
        assert!(GridPosition::new(0, 0).in_bounds());
        assert!(GridPosition::new(9, 9).in_bounds());
        assert!(!GridPosition::new(10, 0).in_bounds());
        assert!(!GridPosition::new(0, -1).in_bounds());
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    #[test]
    fn place_and_read_back() {
        let mut g = grid();
        g.place(2, 3, "engine_basic", 1).unwrap();
        assert_eq!(g.cell(2, 3), Some(&PlacedPart::new("engine_basic", 1)));
        assert_eq!(g.part_count(), 1);
    }

    #[test]
    fn place_rejects_out_of_bounds() {
        let mut g = grid();
        assert_eq!(
            g.place(10, 0, "engine_basic", 1),
            Err(GridError::OutOfBounds(GridPosition::new(10, 0)))
        );
        assert_eq!(
            g.place(0, -1, "engine_basic", 1),
            Err(GridError::OutOfBounds(GridPosition::new(0, -1)))
        );
        assert!(g.is_empty());
    }

    #[test]
    fn place_rejects_occupied_cell() {
        let mut g = grid();
        g.place(1, 1, "engine_basic", 1).unwrap();
        assert_eq!(
            g.place(1, 1, "frame_basic", 1),
            Err(GridError::Occupied(GridPosition::new(1, 1)))
        );
        assert_eq!(g.cell(1, 1).unwrap().part.as_str(), "engine_basic");
    }

    #[test]
    fn place_rejects_unknown_part() {
        let mut g = grid();
        assert_eq!(
            g.place(0, 0, "engine_warp", 1),
            Err(GridError::UnknownPart("engine_warp".into()))
        );
        assert!(g.is_empty());
    }

    #[test]
    fn place_clamps_level_zero() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 0).unwrap();
        assert_eq!(g.cell(0, 0).unwrap().level, 1);
    }

    #[test]
    fn place_then_remove_restores_emptiness() {
        let mut g = grid();
        g.place(4, 4, "frame_basic", 3).unwrap();
        let removed = g.remove(4, 4).unwrap();
        assert_eq!(removed, Some(PlacedPart::new("frame_basic", 3)));
        assert!(g.cell(4, 4).is_none());
        assert!(g.is_empty());
    }

    #[test]
    fn remove_empty_cell_is_ok_none() {
        let mut g = grid();
        assert_eq!(g.remove(0, 0), Ok(None));
        assert!(g.remove(-1, 0).is_err());
    }

    // -----------------------------------------------------------------------
    // Upgrade
    // -----------------------------------------------------------------------

    #[test]
    fn upgrade_increments_level() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        assert_eq!(g.upgrade(0, 0), Ok(2));
        assert_eq!(g.upgrade(0, 0), Ok(3));
        assert_eq!(g.cell(0, 0).unwrap().level, 3);
    }

    #[test]
    fn upgrade_rejects_empty_and_out_of_bounds() {
        let mut g = grid();
        assert_eq!(g.upgrade(0, 0), Err(GridError::Empty(GridPosition::new(0, 0))));
        assert!(matches!(g.upgrade(0, 10), Err(GridError::OutOfBounds(_))));
    }

    // -----------------------------------------------------------------------
    // Move
    // -----------------------------------------------------------------------

    #[test]
    fn move_to_empty_cell() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 2).unwrap();
        g.move_part((0, 0), (5, 5)).unwrap();
        assert!(g.cell(0, 0).is_none());
        assert_eq!(g.cell(5, 5), Some(&PlacedPart::new("engine_basic", 2)));
    }

    #[test]
    fn move_onto_occupant_swaps() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        g.place(1, 0, "frame_basic", 4).unwrap();
        g.move_part((0, 0), (1, 0)).unwrap();
        assert_eq!(g.cell(0, 0), Some(&PlacedPart::new("frame_basic", 4)));
        assert_eq!(g.cell(1, 0), Some(&PlacedPart::new("engine_basic", 1)));
        assert_eq!(g.part_count(), 2);
    }

    #[test]
    fn move_validates_both_positions() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        assert!(matches!(
            g.move_part((0, 0), (0, 10)),
            Err(GridError::OutOfBounds(_))
        ));
        assert!(matches!(g.move_part((3, 3), (4, 4)), Err(GridError::Empty(_))));
        assert_eq!(g.cell(0, 0).unwrap().part.as_str(), "engine_basic");
    }

    // -----------------------------------------------------------------------
    // Adjacency
    // -----------------------------------------------------------------------

    #[test]
    fn neighbors_are_orthogonal_only() {
        let mut g = grid();
        g.place(5, 5, "engine_basic", 1).unwrap();
        g.place(5, 4, "frame_basic", 1).unwrap();
        g.place(6, 6, "frame_basic", 1).unwrap();
        let neighbors = g.neighbors_4(GridPosition::new(5, 5));
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].0, Direction::North);
    }

    #[test]
    fn neighbors_do_not_wrap() {
        let mut g = grid();
        g.place(0, 0, "engine_basic", 1).unwrap();
        g.place(9, 0, "frame_basic", 1).unwrap();
        g.place(0, 9, "frame_basic", 1).unwrap();
        assert!(g.neighbors_4(GridPosition::new(0, 0)).is_empty());
    }
}
