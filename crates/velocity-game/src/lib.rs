//! Game layer for the Velocity Idle engine.
//!
//! Ties the catalog, the board, the research ledger and the resource ledger
//! together into a playable [`GameSession`]: shop and inventory, per-tick
//! progression, queued player commands, and JSON/binary saves.
//!
//! # Usage
//!
//! ```rust,ignore
//! use velocity_game::GameSession;
//!
//! let mut session = GameSession::with_builtin_content()?;
//! let engine = session.buy_part("engine_basic")?;
//! session.place_from_inventory(engine, 4, 4)?;
//! session.tick(1.0);
//! let save = session.to_json()?;
//! ```

pub mod config;
pub mod error;
pub mod progression;
pub mod save;
pub mod session;

pub use config::{EconomyConfig, GameConfig, ProgressionConfig};
pub use error::{GameError, SaveError};
pub use progression::{Progression, ProgressionState};
pub use save::{SAVE_VERSION, STORAGE_KEY, SaveData, SavedInstance, SavedState};
pub use session::{CommandOutcome, GameSession, ShopEntry};
