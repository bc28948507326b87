//! Serde data file structs for game content definitions.
//!
//! These structs define the on-disk format for materials, parts, areas and
//! technologies. They are deserialized from RON, JSON, or TOML data files
//! and then resolved into catalog definitions by [`crate::catalog`].
//!
//! Costs are written as plain numbers and converted to fixed-point amounts
//! during resolution.

use serde::Deserialize;
use std::collections::BTreeMap;

use velocity_core::catalog::{PartType, TechEffectKind};

// ===========================================================================
// Materials
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialData {
    pub id: String,
    pub name: String,
}

// ===========================================================================
// Parts
// ===========================================================================

/// A part definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct PartData {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub part_type: PartType,
    #[serde(default)]
    pub base_velocity: f64,
    pub cost: BTreeMap<String, f64>,
    #[serde(default)]
    pub synergy: Option<SynergyData>,
    #[serde(default)]
    pub unlock_velocity: f64,
    #[serde(default)]
    pub symbol: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SynergyData {
    pub target: PartType,
    pub value: f64,
}

// ===========================================================================
// Areas
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AreaData {
    pub id: String,
    pub name: String,
    pub threshold: f64,
    pub primary_drop: String,
}

// ===========================================================================
// Technologies
// ===========================================================================

/// A technology definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct TechData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cost: BTreeMap<String, f64>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub effect: TechEffectData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TechEffectData {
    pub kind: TechEffectKind,
    pub value: f64,
    #[serde(default)]
    pub target: Option<String>,
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TomlMaterials {
    pub materials: Vec<MaterialData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlParts {
    pub parts: Vec<PartData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlAreas {
    pub areas: Vec<AreaData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlTechs {
    pub techs: Vec<TechData>,
}

// ===========================================================================
// Tests
// ===========================================================================
