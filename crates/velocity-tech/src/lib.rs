//! Research ledger for the Velocity Idle engine.
//!
//! Tracks which technologies have been researched and folds their effects
//! into the aggregate multipliers the grid and shop read through
//! [`TechModifiers`].
//!
//! # Overview
//!
//! Technology definitions live in the shared [`Catalog`]. The ledger only
//! owns the researched set, which is append-only: a technology is researched
//! once and stays researched for the rest of the save.
//!
//! Research is paid for in materials. [`TechLedger::research`] validates the
//! request, then debits the whole cost from the [`ResourceLedger`] in one
//! atomic call before recording the technology, so a failed request leaves
//! both ledgers untouched.
//!
//! # Effects
//!
//! - **EngineMult**: multiplies every engine's base velocity (product).
//! - **BoosterBuff**: added to every booster's synergy value (sum).
//! - **GlobalMult**: multiplies the final velocity (product).
//! - **CostReduc**: multiplies the price of one target part (product).
//!
//! All aggregates are folds over the researched set, so the order in which
//! technologies were researched never matters.

use std::collections::BTreeSet;
use std::sync::Arc;

use velocity_core::catalog::{Catalog, TechDefinition, TechEffectKind};
use velocity_core::id::{PartId, TechId};
use velocity_core::modifier::TechModifiers;
use velocity_core::resources::{ResourceError, ResourceLedger};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a research request was rejected. The ledgers are unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TechError {
    #[error("technology not found: {0}")]
    UnknownTech(TechId),

    #[error("technology {0} is already researched")]
    AlreadyResearched(TechId),

    #[error("prerequisite not met: {tech} requires {missing}")]
    PrerequisiteNotMet { tech: TechId, missing: TechId },

    #[error(transparent)]
    Insufficient(#[from] ResourceError),
}

// ---------------------------------------------------------------------------
// TechLedger
// ---------------------------------------------------------------------------

/// Researched technologies plus the catalog they are defined in.
#[derive(Debug, Clone)]
pub struct TechLedger {
    catalog: Arc<Catalog>,
    researched: BTreeSet<TechId>,
}

impl TechLedger {
    /// A ledger with nothing researched.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            researched: BTreeSet::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    // -- Query API --

    pub fn is_researched(&self, id: &str) -> bool {
        self.researched.contains(id)
    }

    /// Researched technologies in id order.
    pub fn researched(&self) -> &BTreeSet<TechId> {
        &self.researched
    }

    /// Technologies whose prerequisites are all researched and which are not
    /// researched themselves. Affordability is not considered.
    pub fn available(&self) -> impl Iterator<Item = &TechDefinition> {
        self.catalog
            .techs()
            .iter()
            .filter(|t| !self.researched.contains(&t.id) && self.missing_prerequisite(t).is_none())
    }

    /// Whether `research(id, ledger)` would succeed right now.
    pub fn can_research(&self, id: &str, resources: &ResourceLedger) -> bool {
        self.validate(id, resources).is_ok()
    }

    fn missing_prerequisite<'a>(&self, tech: &'a TechDefinition) -> Option<&'a TechId> {
        tech.prerequisites
            .iter()
            .find(|p| !self.researched.contains(*p))
    }

    fn validate(&self, id: &str, resources: &ResourceLedger) -> Result<&TechDefinition, TechError> {
        let tech = self
            .catalog
            .tech(id)
            .ok_or_else(|| TechError::UnknownTech(TechId::from(id)))?;

        if self.researched.contains(&tech.id) {
            return Err(TechError::AlreadyResearched(tech.id.clone()));
        }
        if let Some(missing) = self.missing_prerequisite(tech) {
            return Err(TechError::PrerequisiteNotMet {
                tech: tech.id.clone(),
                missing: missing.clone(),
            });
        }
        resources.check(&tech.cost)?;
        Ok(tech)
    }

    // -- Research actions --

    /// Research a technology, paying its full cost from `resources`.
    pub fn research(&mut self, id: &str, resources: &mut ResourceLedger) -> Result<(), TechError> {
        let tech = match self.validate(id, resources) {
            Ok(tech) => tech,
            Err(err) => {
                log::debug!("research of {id} rejected: {err}");
                return Err(err);
            }
        };
        resources.spend(&tech.cost)?;
        let tech_id = tech.id.clone();
        log::info!("research completed: {tech_id}");
        self.researched.insert(tech_id);
        Ok(())
    }

    /// Replace the researched set from a save. Ids the catalog does not know
    /// are dropped. Returns how many were dropped.
    pub fn restore<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = TechId>,
    {
        self.researched.clear();
        let mut dropped = 0;
        for id in ids {
            if self.catalog.tech(id.as_str()).is_some() {
                self.researched.insert(id);
            } else {
                log::warn!("dropping unknown researched tech {id} from save");
                dropped += 1;
            }
        }
        dropped
    }

    // -- Aggregates --

    /// Effects of every researched technology. Ids missing from the catalog
    /// are skipped.
    fn effects(&self) -> impl Iterator<Item = &TechDefinition> {
        self.researched
            .iter()
            .filter_map(|id| self.catalog.tech(id.as_str()))
    }

    fn product_of(&self, kind: TechEffectKind) -> f64 {
        self.effects()
            .filter(|t| t.effect.kind == kind)
            .map(|t| t.effect.value)
            .product()
    }
}

impl TechModifiers for TechLedger {
    fn engine_multiplier(&self) -> f64 {
        self.product_of(TechEffectKind::EngineMult)
    }

    fn booster_synergy_bonus(&self) -> f64 {
        self.effects()
            .filter(|t| t.effect.kind == TechEffectKind::BoosterBuff)
            .map(|t| t.effect.value)
            .sum()
    }

    fn global_multiplier(&self) -> f64 {
        self.product_of(TechEffectKind::GlobalMult)
    }

    fn cost_multiplier(&self, part: &PartId) -> f64 {
        self.effects()
            .filter(|t| {
                t.effect.kind == TechEffectKind::CostReduc && t.effect.target.as_ref() == Some(part)
            })
            .map(|t| t.effect.value)
            .product()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
