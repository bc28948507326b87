//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.
//!
//! [`test_catalog`] is a small, fixed content set mirroring the shipped
//! early game: the part values match the numbers the grid scenarios are
//! written against (engine 10, frame 1.2, booster 2.0, wheel 0.1).

use crate::catalog::*;
use crate::fixed::amount_from_u32;
use crate::id::*;
use std::collections::BTreeSet;
use std::sync::Arc;

// ===========================================================================
// Material constructors
// ===========================================================================

pub fn scrap() -> MaterialId {
    MaterialId::from("scrap")
}
pub fn rubber() -> MaterialId {
    MaterialId::from("rubber")
}
pub fn circuit() -> MaterialId {
    MaterialId::from("circuit")
}

/// Build a cost from whole-unit entries.
pub fn cost(entries: &[(&str, u32)]) -> Cost {
    entries
        .iter()
        .map(|(m, a)| (MaterialId::from(*m), amount_from_u32(*a)))
        .collect()
}

// ===========================================================================
// Definition constructors
// ===========================================================================

pub fn part_def(
    id: &str,
    part_type: PartType,
    base_velocity: f64,
    synergy: Option<f64>,
    unlock_velocity: f64,
    part_cost: Cost,
) -> PartDefinition {
    PartDefinition {
        id: id.into(),
        display_name: id.to_string(),
        part_type,
        base_velocity,
        cost: part_cost,
        synergy: synergy.map(|value| SynergyEffect {
            target: PartType::Engine,
            value,
        }),
        unlock_velocity,
        symbol: id.chars().next().map(String::from).unwrap_or_default(),
    }
}

/// An engine with no synergy, costing 10 scrap, unlocked from the start.
pub fn engine_def(id: &str, base_velocity: f64) -> PartDefinition {
    part_def(
        id,
        PartType::Engine,
        base_velocity,
        None,
        0.0,
        cost(&[("scrap", 10)]),
    )
}

pub fn tech_def(
    id: &str,
    kind: TechEffectKind,
    value: f64,
    target: Option<&str>,
) -> TechDefinition {
    TechDefinition {
        id: id.into(),
        display_name: id.to_string(),
        cost: cost(&[("scrap", 50)]),
        prerequisites: BTreeSet::new(),
        effect: TechEffect {
            kind,
            value,
            target: target.map(PartId::from),
        },
    }
}

fn area_def(id: &str, threshold: f64, drop: &str) -> AreaDefinition {
    AreaDefinition {
        id: id.into(),
        display_name: id.to_string(),
        velocity_threshold: threshold,
        primary_drop: drop.into(),
    }
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Register the test content on a builder, for tests that add more on top.
pub fn test_catalog_builder() -> CatalogBuilder {
    let mut b = CatalogBuilder::new();
    for (id, name) in [("scrap", "Scrap"), ("rubber", "Rubber"), ("circuit", "Circuit")] {
        b.register_material(id, name).unwrap();
    }

    let parts = [
        engine_def("engine_basic", 10.0),
        part_def(
            "engine_v2",
            PartType::Engine,
            50.0,
            None,
            50.0,
            cost(&[("scrap", 200), ("rubber", 50)]),
        ),
        part_def(
            "wheel_basic",
            PartType::Wheel,
            0.0,
            Some(0.1),
            0.0,
            cost(&[("scrap", 5), ("rubber", 5)]),
        ),
        part_def(
            "frame_basic",
            PartType::Frame,
            0.0,
            Some(1.2),
            0.0,
            cost(&[("scrap", 5)]),
        ),
        part_def(
            "booster_basic",
            PartType::Booster,
            0.0,
            Some(2.0),
            100.0,
            cost(&[("scrap", 50), ("circuit", 1)]),
        ),
    ];
    for part in parts {
        b.register_part(part).unwrap();
    }

    b.register_area(area_def("area_junkyard", 0.0, "scrap")).unwrap();
    b.register_area(area_def("area_highway", 100.0, "rubber")).unwrap();
    b.register_area(area_def("area_city", 2000.0, "circuit")).unwrap();

    b.register_tech(tech_def("tech_eng_eff_1", TechEffectKind::EngineMult, 1.1, None))
        .unwrap();
    let mut eff2 = tech_def("tech_eng_eff_2", TechEffectKind::EngineMult, 1.2, None);
    eff2.prerequisites.insert("tech_eng_eff_1".into());
    eff2.cost = cost(&[("scrap", 200), ("rubber", 50)]);
    b.register_tech(eff2).unwrap();
    b.register_tech(tech_def("tech_booster_1", TechEffectKind::BoosterBuff, 0.5, None))
        .unwrap();
    b.register_tech(tech_def("tech_global_1", TechEffectKind::GlobalMult, 1.5, None))
        .unwrap();
    b.register_tech(tech_def(
        "tech_cheap_engine",
        TechEffectKind::CostReduc,
        0.5,
        Some("engine_basic"),
    ))
    .unwrap();
    b
}

pub fn test_catalog() -> Catalog {
    test_catalog_builder().build().unwrap()
}

pub fn shared_test_catalog() -> Arc<Catalog> {
    Arc::new(test_catalog())
}
