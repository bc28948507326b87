use velocity_core::catalog::CatalogError;
use velocity_core::id::{AreaId, PartId};
use velocity_core::migration::MigrationError;
use velocity_core::resources::ResourceError;
use velocity_data::DataLoadError;
use velocity_grid::GridError;
use velocity_tech::TechError;

use crate::save::SAVE_MAGIC;

/// A rejected player action or a failed session setup.
///
/// Rejections never change game state; the caller may retry or ignore them.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The part id is not in the catalog.
    #[error("unknown part: {0}")]
    UnknownPart(PartId),

    /// The part exists but has not been unlocked yet.
    #[error("part {0} is not unlocked")]
    PartLocked(PartId),

    /// The inventory holds no instance with this key.
    #[error("no such inventory instance")]
    UnknownInstance,

    #[error("unknown area: {0}")]
    UnknownArea(AreaId),

    /// The area's threshold is above the best velocity reached so far.
    #[error("area {area} requires velocity {threshold}, best is {max_velocity}")]
    AreaLocked {
        area: AreaId,
        threshold: f64,
        max_velocity: f64,
    },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Tech(#[from] TechError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    DataLoad(#[from] DataLoadError),
}

/// Errors decoding or encoding a save.
///
/// Only a broken envelope is an error. Bad values inside a well-formed save
/// are repaired during loading.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but is not a save envelope.
    #[error("malformed save: {0}")]
    Malformed(String),

    /// Binary save shorter than its header.
    #[error("binary save too short")]
    TooShort,

    #[error("invalid magic number: expected 0x{expected:08X}, got 0x{0:08X}", expected = SAVE_MAGIC)]
    InvalidMagic(u32),

    /// The save was written by a newer build.
    #[error("save version {found} is newer than supported version {supported}")]
    FutureVersion { found: u32, supported: u32 },

    #[error("failed to encode save: {0}")]
    Encode(String),

    #[error("failed to decode save: {0}")]
    Decode(String),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}
