//! Resolution pipeline: reads content files and builds a [`Catalog`].
//!
//! A content directory holds up to four list files, each in any supported
//! format:
//!
//! | Base name   | Required | TOML key    |
//! |-------------|----------|-------------|
//! | `materials` | yes      | `materials` |
//! | `parts`     | yes      | `parts`     |
//! | `areas`     | yes      | `areas`     |
//! | `techs`     | no       | `techs`     |
//!
//! The shipped content is embedded in the binary as RON and exposed through
//! [`builtin_catalog`].

use std::collections::BTreeSet;
use std::path::Path;

use velocity_core::catalog::{
    AreaDefinition, Catalog, CatalogBuilder, Cost, PartDefinition, SynergyEffect, TechDefinition,
    TechEffect,
};
use velocity_core::fixed::amount_from_f64;
use velocity_core::id::{MaterialId, PartId, TechId};

use crate::loader::{
    DataLoadError, Format, deserialize_list, deserialize_str, find_data_file, require_data_file,
};
use crate::schema::{AreaData, MaterialData, PartData, TechData};

/// Parsed but unresolved content.
#[derive(Debug, Clone, Default)]
pub struct ContentData {
    pub materials: Vec<MaterialData>,
    pub parts: Vec<PartData>,
    pub areas: Vec<AreaData>,
    pub techs: Vec<TechData>,
}

const BUILTIN_MATERIALS: &str = include_str!("../data/materials.ron");
const BUILTIN_PARTS: &str = include_str!("../data/parts.ron");
const BUILTIN_AREAS: &str = include_str!("../data/areas.ron");
const BUILTIN_TECHS: &str = include_str!("../data/techs.ron");

/// The shipped game content.
pub fn builtin_catalog() -> Result<Catalog, DataLoadError> {
    let origin = |name: &str| Path::new("builtin").join(name);
    let content = ContentData {
        materials: deserialize_str(BUILTIN_MATERIALS, Format::Ron, &origin("materials.ron"))?,
        parts: deserialize_str(BUILTIN_PARTS, Format::Ron, &origin("parts.ron"))?,
        areas: deserialize_str(BUILTIN_AREAS, Format::Ron, &origin("areas.ron"))?,
        techs: deserialize_str(BUILTIN_TECHS, Format::Ron, &origin("techs.ron"))?,
    };
    resolve(content)
}

/// Read every content file in `dir` and build a catalog from them.
pub fn load_catalog(dir: &Path) -> Result<Catalog, DataLoadError> {
    let materials = deserialize_list(&require_data_file(dir, "materials")?, "materials")?;
    let parts = deserialize_list(&require_data_file(dir, "parts")?, "parts")?;
    let areas = deserialize_list(&require_data_file(dir, "areas")?, "areas")?;
    let techs = match find_data_file(dir, "techs")? {
        Some(path) => deserialize_list(&path, "techs")?,
        None => Vec::new(),
    };

    let catalog = resolve(ContentData {
        materials,
        parts,
        areas,
        techs,
    })?;
    log::info!(
        "loaded catalog from {}: {} parts, {} areas, {} techs",
        dir.display(),
        catalog.parts().len(),
        catalog.areas_by_threshold().len(),
        catalog.techs().len()
    );
    Ok(catalog)
}

/// Convert parsed content into definitions and validate them.
pub fn resolve(content: ContentData) -> Result<Catalog, DataLoadError> {
    let mut builder = CatalogBuilder::new();

    for material in content.materials {
        builder.register_material(material.id, &material.name)?;
    }
    for part in content.parts {
        builder.register_part(PartDefinition {
            id: PartId::new(part.id),
            display_name: part.name,
            part_type: part.part_type,
            base_velocity: part.base_velocity,
            cost: to_cost(part.cost),
            synergy: part.synergy.map(|s| SynergyEffect {
                target: s.target,
                value: s.value,
            }),
            unlock_velocity: part.unlock_velocity,
            symbol: part.symbol,
        })?;
    }
    for area in content.areas {
        builder.register_area(AreaDefinition {
            id: area.id.into(),
            display_name: area.name,
            velocity_threshold: area.threshold,
            primary_drop: area.primary_drop.into(),
        })?;
    }
    for tech in content.techs {
        builder.register_tech(TechDefinition {
            id: TechId::new(tech.id),
            display_name: tech.name,
            cost: to_cost(tech.cost),
            prerequisites: tech.prerequisites.into_iter().map(TechId::new).collect::<BTreeSet<_>>(),
            effect: TechEffect {
                kind: tech.effect.kind,
                value: tech.effect.value,
                target: tech.effect.target.map(PartId::new),
            },
        })?;
    }

    Ok(builder.build()?)
}

fn to_cost(raw: impl IntoIterator<Item = (String, f64)>) -> Cost {
    raw.into_iter()
        .map(|(material, amount)| (MaterialId::new(material), amount_from_f64(amount)))
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
