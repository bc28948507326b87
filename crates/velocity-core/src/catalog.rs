//! Immutable game content: materials, parts, areas and technologies.
//!
//! Content is registered on a [`CatalogBuilder`] and frozen by
//! [`CatalogBuilder::build`], which checks every cross-reference. The
//! resulting [`Catalog`] never changes and is shared behind an `Arc` by the
//! tech ledger, the grid and the game session.
//!
//! Lookups of unknown ids return `None`. Callers treat that as a no-op so a
//! stale reference in a save never halts the simulation.

use crate::fixed::Amount;
use crate::id::{AreaId, MaterialId, PartId, TechId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Material amounts keyed by material. Ordered so iteration is deterministic.
pub type Cost = BTreeMap<MaterialId, Amount>;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A raw material that areas drop and parts cost.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDefinition {
    pub id: MaterialId,
    pub display_name: String,
}

/// The four part families. Synergy rules are keyed by type, not by part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    Engine,
    Wheel,
    Frame,
    Booster,
}

impl PartType {
    pub fn all() -> [PartType; 4] {
        [
            PartType::Engine,
            PartType::Wheel,
            PartType::Frame,
            PartType::Booster,
        ]
    }
}

/// The effect a part has on its surroundings. For wheels `value` is the
/// additive global bonus; for frames and boosters it is the multiplicative
/// factor applied to adjacent engines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynergyEffect {
    pub target: PartType,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartDefinition {
    pub id: PartId,
    pub display_name: String,
    pub part_type: PartType,
    pub base_velocity: f64,
    pub cost: Cost,
    pub synergy: Option<SynergyEffect>,
    /// Highest velocity ever reached at which this part enters the shop.
    pub unlock_velocity: f64,
    /// Short glyph used by text renderers.
    pub symbol: String,
}

impl PartDefinition {
    /// The synergy value, or `default` when the part declares none.
    pub fn synergy_value_or(&self, default: f64) -> f64 {
        self.synergy.map(|s| s.value).unwrap_or(default)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaDefinition {
    pub id: AreaId,
    pub display_name: String,
    pub velocity_threshold: f64,
    pub primary_drop: MaterialId,
}

/// What a researched technology changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechEffectKind {
    /// Multiplies every engine's base contribution.
    EngineMult,
    /// Adds to every booster's synergy factor.
    BoosterBuff,
    /// Multiplies the starting global multiplier.
    GlobalMult,
    /// Multiplies the cost of the targeted part.
    CostReduc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TechEffect {
    pub kind: TechEffectKind,
    pub value: f64,
    pub target: Option<PartId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TechDefinition {
    pub id: TechId,
    pub display_name: String,
    pub cost: Cost,
    pub prerequisites: BTreeSet<TechId>,
    pub effect: TechEffect,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{owner} references unknown material {material}")]
    UnknownMaterial { owner: String, material: MaterialId },

    #[error("prerequisite {prereq} for technology {tech} does not exist")]
    UnknownPrerequisite { tech: TechId, prereq: TechId },

    #[error("technology {tech} targets unknown part {part}")]
    UnknownPartTarget { tech: TechId, part: PartId },

    #[error("cost reduction technology {0} has no target part")]
    MissingTarget(TechId),

    #[error("{owner}: invalid {field} value {value}")]
    InvalidNumber {
        owner: String,
        field: &'static str,
        value: f64,
    },

    #[error("{owner}: cost of {material} must be positive")]
    NonPositiveCost { owner: String, material: MaterialId },

    #[error("catalog defines no areas")]
    NoAreas,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`Catalog`].
/// Registration checks duplicates; `build` checks references.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    materials: Vec<MaterialDefinition>,
    parts: Vec<PartDefinition>,
    areas: Vec<AreaDefinition>,
    techs: Vec<TechDefinition>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_material(
        &mut self,
        id: impl Into<MaterialId>,
        display_name: &str,
    ) -> Result<MaterialId, CatalogError> {
        let id = id.into();
        if self.materials.iter().any(|m| m.id == id) {
            return Err(duplicate("material", id.as_str()));
        }
        self.materials.push(MaterialDefinition {
            id: id.clone(),
            display_name: display_name.to_string(),
        });
        Ok(id)
    }

    pub fn register_part(&mut self, part: PartDefinition) -> Result<PartId, CatalogError> {
        if self.parts.iter().any(|p| p.id == part.id) {
            return Err(duplicate("part", part.id.as_str()));
        }
        let id = part.id.clone();
        self.parts.push(part);
        Ok(id)
    }

    pub fn register_area(&mut self, area: AreaDefinition) -> Result<AreaId, CatalogError> {
        if self.areas.iter().any(|a| a.id == area.id) {
            return Err(duplicate("area", area.id.as_str()));
        }
        let id = area.id.clone();
        self.areas.push(area);
        Ok(id)
    }

    pub fn register_tech(&mut self, tech: TechDefinition) -> Result<TechId, CatalogError> {
        if self.techs.iter().any(|t| t.id == tech.id) {
            return Err(duplicate("technology", tech.id.as_str()));
        }
        let id = tech.id.clone();
        self.techs.push(tech);
        Ok(id)
    }

    /// Validate all references and freeze the catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        if self.areas.is_empty() {
            return Err(CatalogError::NoAreas);
        }

        let materials: BTreeSet<&MaterialId> = self.materials.iter().map(|m| &m.id).collect();
        let part_ids: BTreeSet<&PartId> = self.parts.iter().map(|p| &p.id).collect();
        let tech_ids: BTreeSet<&TechId> = self.techs.iter().map(|t| &t.id).collect();

        for part in &self.parts {
            let owner = format!("part {}", part.id);
            check_non_negative(&owner, "base_velocity", part.base_velocity)?;
            check_non_negative(&owner, "unlock_velocity", part.unlock_velocity)?;
            if let Some(synergy) = part.synergy {
                check_non_negative(&owner, "synergy", synergy.value)?;
            }
            check_cost(&owner, &part.cost, &materials)?;
        }

        for area in &self.areas {
            let owner = format!("area {}", area.id);
            check_non_negative(&owner, "velocity_threshold", area.velocity_threshold)?;
            if !materials.contains(&area.primary_drop) {
                return Err(CatalogError::UnknownMaterial {
                    owner,
                    material: area.primary_drop.clone(),
                });
            }
        }

        for tech in &self.techs {
            let owner = format!("technology {}", tech.id);
            check_cost(&owner, &tech.cost, &materials)?;
            match tech.effect.kind {
                // Additive, so a negative value is a nerf.
                TechEffectKind::BoosterBuff => {
                    check_finite(&owner, "effect", tech.effect.value)?;
                }
                TechEffectKind::EngineMult
                | TechEffectKind::GlobalMult
                | TechEffectKind::CostReduc => {
                    check_non_negative(&owner, "effect", tech.effect.value)?;
                }
            }
            for prereq in &tech.prerequisites {
                if !tech_ids.contains(prereq) {
                    return Err(CatalogError::UnknownPrerequisite {
                        tech: tech.id.clone(),
                        prereq: prereq.clone(),
                    });
                }
            }
            match (&tech.effect.kind, &tech.effect.target) {
                (TechEffectKind::CostReduc, None) => {
                    return Err(CatalogError::MissingTarget(tech.id.clone()));
                }
                (_, Some(target)) if !part_ids.contains(target) => {
                    return Err(CatalogError::UnknownPartTarget {
                        tech: tech.id.clone(),
                        part: target.clone(),
                    });
                }
                _ => {}
            }
        }

        let mut areas = self.areas;
        // Stable sort keeps registration order among equal thresholds.
        areas.sort_by(|a, b| a.velocity_threshold.total_cmp(&b.velocity_threshold));

        let material_index = index_by(&self.materials, |m| m.id.as_str());
        let part_index = index_by(&self.parts, |p| p.id.as_str());
        let area_index = index_by(&areas, |a| a.id.as_str());
        let tech_index = index_by(&self.techs, |t| t.id.as_str());

        Ok(Catalog {
            materials: self.materials,
            material_index,
            parts: self.parts,
            part_index,
            areas,
            area_index,
            techs: self.techs,
            tech_index,
        })
    }
}

fn duplicate(kind: &'static str, id: &str) -> CatalogError {
    CatalogError::DuplicateId {
        kind,
        id: id.to_string(),
    }
}

fn check_non_negative(owner: &str, field: &'static str, value: f64) -> Result<(), CatalogError> {
    check_finite(owner, field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(CatalogError::InvalidNumber {
            owner: owner.to_string(),
            field,
            value,
        })
    }
}

fn check_finite(owner: &str, field: &'static str, value: f64) -> Result<(), CatalogError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CatalogError::InvalidNumber {
            owner: owner.to_string(),
            field,
            value,
        })
    }
}

fn check_cost(
    owner: &str,
    cost: &Cost,
    materials: &BTreeSet<&MaterialId>,
) -> Result<(), CatalogError> {
    for (material, amount) in cost {
        if !materials.contains(material) {
            return Err(CatalogError::UnknownMaterial {
                owner: owner.to_string(),
                material: material.clone(),
            });
        }
        if *amount <= Amount::ZERO {
            return Err(CatalogError::NonPositiveCost {
                owner: owner.to_string(),
                material: material.clone(),
            });
        }
    }
    Ok(())
}

fn index_by<T>(items: &[T], key: impl Fn(&T) -> &str) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (key(item).to_string(), i))
        .collect()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Catalog {
    materials: Vec<MaterialDefinition>,
    material_index: HashMap<String, usize>,
    parts: Vec<PartDefinition>,
    part_index: HashMap<String, usize>,
    /// Sorted by ascending velocity threshold.
    areas: Vec<AreaDefinition>,
    area_index: HashMap<String, usize>,
    techs: Vec<TechDefinition>,
    tech_index: HashMap<String, usize>,
}

impl Catalog {
    pub fn material(&self, id: &str) -> Option<&MaterialDefinition> {
        self.material_index.get(id).map(|&i| &self.materials[i])
    }

    pub fn part(&self, id: &str) -> Option<&PartDefinition> {
        self.part_index.get(id).map(|&i| &self.parts[i])
    }

    pub fn area(&self, id: &str) -> Option<&AreaDefinition> {
        self.area_index.get(id).map(|&i| &self.areas[i])
    }

    pub fn tech(&self, id: &str) -> Option<&TechDefinition> {
        self.tech_index.get(id).map(|&i| &self.techs[i])
    }

    /// Materials in registration order.
    pub fn materials(&self) -> &[MaterialDefinition] {
        &self.materials
    }

    /// Parts in registration order.
    pub fn parts(&self) -> &[PartDefinition] {
        &self.parts
    }

    /// Technologies in registration order.
    pub fn techs(&self) -> &[TechDefinition] {
        &self.techs
    }

    /// Areas sorted by ascending velocity threshold.
    pub fn areas_by_threshold(&self) -> &[AreaDefinition] {
        &self.areas
    }

    /// Parts of one type, in registration order.
    pub fn parts_by_type(&self, part_type: PartType) -> impl Iterator<Item = &PartDefinition> {
        self.parts.iter().filter(move |p| p.part_type == part_type)
    }

    /// The area with the lowest threshold. `build` guarantees one exists.
    pub fn starting_area(&self) -> &AreaDefinition {
        &self.areas[0]
    }

    /// Areas whose threshold has been reached by `max_velocity`.
    pub fn reachable_areas(&self, max_velocity: f64) -> impl Iterator<Item = &AreaDefinition> {
        self.areas
            .iter()
            .take_while(move |a| a.velocity_threshold <= max_velocity)
    }
}
