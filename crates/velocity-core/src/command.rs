//! Input command queue for player actions.
//!
//! The UI submits commands instead of mutating the session directly when it
//! runs on a different thread of control than the tick. The session drains
//! the queue at the start of the next tick and applies every command in
//! submission order, so the game state has exactly one writer.

use crate::fixed::Ticks;
use crate::id::{AreaId, PartId, TechId};
use crate::inventory::InstanceId;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single player action.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Buy a part from the shop into inventory.
    BuyPart { part: PartId },
    /// Place an owned instance on the board.
    PlaceFromInventory { instance: InstanceId, x: i32, y: i32 },
    /// Take a placed part back into inventory.
    StorePart { x: i32, y: i32 },
    /// Move a placed part; swaps with an occupant.
    MovePart {
        from: (i32, i32),
        to: (i32, i32),
    },
    /// Pay for and apply one upgrade level.
    UpgradePart { x: i32, y: i32 },
    Research { tech: TechId },
    SelectArea { area: AreaId },
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick boundary, with optional history.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Executed commands: (tick, command).
    history: Vec<(Ticks, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that retains up to `max_history` executed commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Drain all pending commands, recording them in history with `tick`.
    /// Returns them in submission order.
    pub fn drain(&mut self, tick: Ticks) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            for cmd in &commands {
                self.history.push((tick, cmd.clone()));
            }
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(Ticks, Command)] {
        &self.history
    }
}
