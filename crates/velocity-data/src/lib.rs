//! Data-driven content and configuration loading.
//!
//! Content (materials, parts, areas, techs) and tuning files may be written
//! in RON, TOML or JSON. [`builtin_catalog`] returns the content shipped
//! with the game.

use serde::de::DeserializeOwned;
use std::path::Path;

pub mod catalog;
pub mod loader;
pub mod schema;

pub use catalog::{ContentData, builtin_catalog, load_catalog};
pub use loader::{DataLoadError, Format};

/// Read a configuration file. Its format comes from the extension.
///
/// Config types are expected to use `#[serde(default)]` so that a partial
/// file overrides only the fields it names.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let config = loader::deserialize_file(path)?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}
