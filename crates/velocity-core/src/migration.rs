//! Save format migration framework.
//!
//! Saves are JSON-like documents. Each registered step is a pure function
//! that rewrites a document from `version N` to `version N+1`; the registry
//! chains steps to bring an old save up to the current format before it is
//! decoded into typed state.

use serde_json::Value;
use std::collections::BTreeMap;

/// Name of the envelope field carrying the format version.
pub const VERSION_FIELD: &str = "version";

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from version {from} to version {to}")]
    NoMigrationPath { from: u32, to: u32 },
    #[error("migration from version {from} to version {to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },
}

/// A function that rewrites a save document from one version to the next.
pub type MigrationFn = fn(Value) -> Result<Value, MigrationError>;

/// Registry of migration steps keyed by source version.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<u32, MigrationFn>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step from `from_version` to `from_version + 1`.
    pub fn register(&mut self, from_version: u32, migrate: MigrationFn) {
        self.migrations.insert(from_version, migrate);
    }

    /// Whether a complete chain exists from `from` to `to`.
    pub fn can_migrate(&self, from: u32, to: u32) -> bool {
        if from >= to {
            return from == to;
        }
        (from..to).all(|v| self.migrations.contains_key(&v))
    }

    /// Run the chain from `from` to `to`. Returns the document unchanged
    /// when the versions match. Each step's output gets its version field
    /// stamped before the next step runs.
    pub fn migrate(&self, mut doc: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
        if from == to {
            return Ok(doc);
        }
        if from > to {
            return Err(MigrationError::NoMigrationPath { from, to });
        }

        for version in from..to {
            let step = self
                .migrations
                .get(&version)
                .ok_or(MigrationError::NoMigrationPath { from, to })?;
            doc = step(doc)?;
            if let Value::Object(map) = &mut doc {
                map.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
            }
            log::debug!("migrated save from version {} to {}", version, version + 1);
        }
        Ok(doc)
    }

    pub fn step_count(&self) -> usize {
        self.migrations.len()
    }
}

/// Read the envelope version. Documents without one predate versioning and
/// are version 0.
pub fn detect_version(doc: &Value) -> u32 {
    doc.get(VERSION_FIELD)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

// ===========================================================================
// Tests
// ===========================================================================
