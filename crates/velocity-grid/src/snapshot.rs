//! Board persistence.
//!
//! A [`BoardSnapshot`] is the board as rows of optional cells, indexed
//! `rows[y][x]`. It serializes to the save file's `grid` field:
//! `[[null | {"partId": "...", "level": n}]]`.
//!
//! Import is lenient. Short rows and a short row list read as empty cells,
//! extra rows and columns are ignored, a missing level reads as 1, and
//! cells naming parts the catalog no longer knows are dropped.

use serde::{Deserialize, Serialize};

use velocity_core::id::PartId;

use crate::{GRID_HEIGHT, GRID_WIDTH, GridEngine, GridPosition, PlacedPart};

/// One saved cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCell {
    pub part_id: PartId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl From<&PlacedPart> for SnapshotCell {
    fn from(placed: &PlacedPart) -> Self {
        Self {
            part_id: placed.part.clone(),
            level: Some(placed.level),
        }
    }
}

/// The board as `rows[y][x]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardSnapshot {
    pub rows: Vec<Vec<Option<SnapshotCell>>>,
}

impl BoardSnapshot {
    /// The cell at `(x, y)`, if the snapshot has one there.
    pub fn get(&self, x: usize, y: usize) -> Option<&SnapshotCell> {
        self.rows.get(y)?.get(x)?.as_ref()
    }
}

/// Outcome of [`GridEngine::import_board`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub placed: usize,
    /// Cells dropped because their part is not in the catalog.
    pub dropped: usize,
}

impl GridEngine {
    /// Full 10x10 snapshot of the board.
    pub fn export_board(&self) -> BoardSnapshot {
        let rows = (0..GRID_HEIGHT)
            .map(|y| {
                (0..GRID_WIDTH)
                    .map(|x| self.cell(x, y).map(SnapshotCell::from))
                    .collect()
            })
            .collect();
        BoardSnapshot { rows }
    }

    /// Replace the board with the contents of `snapshot`.
    pub fn import_board(&mut self, snapshot: &BoardSnapshot) -> ImportReport {
        self.clear();
        let mut report = ImportReport::default();

        for (y, row) in snapshot.rows.iter().take(GRID_HEIGHT as usize).enumerate() {
            for (x, cell) in row.iter().take(GRID_WIDTH as usize).enumerate() {
                let Some(cell) = cell else {
                    continue;
                };
                let pos = GridPosition::new(x as i32, y as i32);
                let level = cell.level.unwrap_or(1);
                match self.place(pos.x, pos.y, cell.part_id.as_str(), level) {
                    Ok(()) => report.placed += 1,
                    Err(err) => {
                        log::warn!("dropping saved cell {pos}: {err}");
                        report.dropped += 1;
                    }
                }
            }
        }
        report
    }
}

// ===========================================================================
// Tests
// ===========================================================================
