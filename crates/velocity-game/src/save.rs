//! Save and load for [`GameSession`].
//!
//! Two encodings share one typed payload, [`SaveData`]:
//!
//! - **JSON** is the host-storage format (the browser build keeps it under
//!   [`STORAGE_KEY`]). It is versioned: documents older than
//!   [`SAVE_VERSION`] are rewritten by the [`MigrationRegistry`] chain
//!   before decoding, and values with the wrong JSON type are dropped so
//!   that their defaults apply.
//! - **Binary** is bitcode behind a [`SaveHeader`] carrying a magic number
//!   and the format version. It has no migration chain.
//!
//! Either way the decoded save is normalised against the catalog before it
//! becomes a session, see [`GameSession::from_save`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use velocity_core::catalog::Catalog;
use velocity_core::fixed::amount_from_f64;
use velocity_core::id::{AreaId, MaterialId, PartId, TechId};
use velocity_core::inventory::{Inventory, PartInstance};
use velocity_core::migration::{MigrationError, MigrationRegistry, detect_version};
use velocity_core::resources::ResourceLedger;
use velocity_grid::{BoardSnapshot, GRID_HEIGHT, GRID_WIDTH, SnapshotCell};

use crate::config::GameConfig;
use crate::error::SaveError;
use crate::progression::{Progression, ProgressionState};
use crate::session::GameSession;

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

/// Magic number at the start of every binary save ("VEL" + 0x01).
pub const SAVE_MAGIC: u32 = 0x5645_4C01;

/// Key hosts store the JSON save under.
pub const STORAGE_KEY: &str = "velocityIdleSave";

// ===========================================================================
// Save payload
// ===========================================================================

/// A complete save: progression state, board and write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub state: SavedState,
    #[serde(default)]
    pub grid: BoardSnapshot,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
}

/// Everything except the board. Every field is optional on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedState {
    pub velocity: f64,
    pub distance: f64,
    pub max_velocity: f64,
    pub resources: BTreeMap<MaterialId, f64>,
    pub unlocks: Vec<PartId>,
    pub current_area_id: Option<AreaId>,
    pub inventory: Vec<SavedInstance>,
    pub researched: Vec<TechId>,
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedInstance {
    pub part_id: PartId,
    #[serde(default = "first_level")]
    pub level: u32,
}

fn first_level() -> u32 {
    1
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ===========================================================================
// Binary envelope
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub magic: u32,
    pub version: u32,
    pub timestamp: u64,
}

impl SaveHeader {
    pub fn new(timestamp: u64) -> Self {
        Self {
            magic: SAVE_MAGIC,
            version: SAVE_VERSION,
            timestamp,
        }
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if self.magic != SAVE_MAGIC {
            return Err(SaveError::InvalidMagic(self.magic));
        }
        if self.version > SAVE_VERSION {
            return Err(SaveError::FutureVersion {
                found: self.version,
                supported: SAVE_VERSION,
            });
        }
        if self.version < SAVE_VERSION {
            return Err(SaveError::Malformed(format!(
                "binary saves start at version {SAVE_VERSION}, got {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// Occupied cell in a binary save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BinaryCell {
    x: u8,
    y: u8,
    part: PartId,
    level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BinarySave {
    header: SaveHeader,
    state: SavedState,
    cells: Vec<BinaryCell>,
}

impl BinarySave {
    fn from_save(save: &SaveData) -> Self {
        let mut cells = Vec::new();
        for (y, row) in save.grid.rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(cell) = cell {
                    cells.push(BinaryCell {
                        x: u8::try_from(x).unwrap_or(u8::MAX),
                        y: u8::try_from(y).unwrap_or(u8::MAX),
                        part: cell.part_id.clone(),
                        level: cell.level.unwrap_or(1),
                    });
                }
            }
        }
        Self {
            header: SaveHeader::new(save.timestamp),
            state: save.state.clone(),
            cells,
        }
    }

    fn into_save(self) -> SaveData {
        let mut rows = vec![vec![None; GRID_WIDTH as usize]; GRID_HEIGHT as usize];
        for cell in self.cells {
            let slot = rows
                .get_mut(usize::from(cell.y))
                .and_then(|row| row.get_mut(usize::from(cell.x)));
            match slot {
                Some(slot) => {
                    *slot = Some(SnapshotCell {
                        part_id: cell.part,
                        level: Some(cell.level),
                    })
                }
                None => log::warn!(
                    "dropping binary save cell ({}, {}) outside the board",
                    cell.x,
                    cell.y
                ),
            }
        }
        SaveData {
            version: self.header.version,
            state: self.state,
            grid: BoardSnapshot { rows },
            timestamp: self.header.timestamp,
        }
    }
}

// ===========================================================================
// Migrations
// ===========================================================================

/// The migration chain for JSON saves.
pub fn migrations() -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    registry.register(0, migrate_v0_to_v1);
    registry
}

/// Unversioned saves: the inventory was a list of part ids, there was no
/// best velocity, research or clear flag.
fn migrate_v0_to_v1(mut doc: Value) -> Result<Value, MigrationError> {
    let state = doc
        .get_mut("state")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| MigrationError::MigrationFailed {
            from: 0,
            to: 1,
            reason: "save has no state object".to_string(),
        })?;

    if !state.contains_key("maxVelocity") {
        let velocity = state.get("velocity").cloned().unwrap_or(Value::from(0.0));
        state.insert("maxVelocity".to_string(), velocity);
    }

    if let Some(Value::Array(items)) = state.get_mut("inventory") {
        for item in items.iter_mut() {
            if let Value::String(part) = item {
                let mut entry = Map::new();
                entry.insert("partId".to_string(), Value::String(std::mem::take(part)));
                entry.insert("level".to_string(), Value::from(1));
                *item = Value::Object(entry);
            }
        }
    }

    state
        .entry("researched")
        .or_insert_with(|| Value::Array(Vec::new()));
    state.entry("cleared").or_insert(Value::Bool(false));
    Ok(doc)
}

// ===========================================================================
// Repair
// ===========================================================================

/// Parse the outer envelope. Anything that is not an object with a `state`
/// object is unrecoverable.
fn parse_envelope(text: &str) -> Result<Value, SaveError> {
    let doc: Value = serde_json::from_str(text)?;
    match doc.get("state") {
        Some(Value::Object(_)) => Ok(doc),
        Some(_) => Err(SaveError::Malformed("state is not an object".to_string())),
        None if doc.is_object() => Err(SaveError::Malformed("missing state".to_string())),
        None => Err(SaveError::Malformed("save is not an object".to_string())),
    }
}

fn is_level(v: &Value) -> bool {
    v.as_u64().is_some_and(|level| u32::try_from(level).is_ok())
}

/// Remove values whose JSON type cannot decode so their defaults apply.
fn repair(doc: &mut Value) {
    if let Some(state) = doc.get_mut("state").and_then(Value::as_object_mut) {
        repair_state(state);
    }
    if let Some(map) = doc.as_object_mut() {
        if map.get("timestamp").is_some_and(|t| t.as_u64().is_none()) {
            map.remove("timestamp");
        }
        if let Some(grid) = map.get_mut("grid") {
            repair_grid(grid);
        }
    }
}

fn repair_state(state: &mut Map<String, Value>) {
    for key in ["velocity", "distance", "maxVelocity"] {
        if state.get(key).is_some_and(|v| !v.is_number()) {
            state.remove(key);
        }
    }
    if state.get("cleared").is_some_and(|v| !v.is_boolean()) {
        state.remove("cleared");
    }
    if state.get("currentAreaId").is_some_and(|v| !v.is_string()) {
        state.remove("currentAreaId");
    }

    if let Some(resources) = state.get_mut("resources") {
        match resources.as_object_mut() {
            Some(map) => map.retain(|_, amount| amount.is_number()),
            None => *resources = Value::Object(Map::new()),
        }
    }

    for key in ["unlocks", "researched"] {
        if let Some(list) = state.get_mut(key) {
            match list.as_array_mut() {
                Some(items) => items.retain(Value::is_string),
                None => *list = Value::Array(Vec::new()),
            }
        }
    }

    if let Some(inventory) = state.get_mut("inventory") {
        match inventory.as_array_mut() {
            Some(items) => {
                items.retain(|item| item.get("partId").is_some_and(Value::is_string));
                for item in items.iter_mut() {
                    if let Some(entry) = item.as_object_mut() {
                        if entry.get("level").is_some_and(|l| !is_level(l)) {
                            entry.remove("level");
                        }
                    }
                }
            }
            None => *inventory = Value::Array(Vec::new()),
        }
    }
}

fn repair_grid(grid: &mut Value) {
    let Some(rows) = grid.as_array_mut() else {
        *grid = Value::Array(Vec::new());
        return;
    };
    for row in rows.iter_mut() {
        let Some(cells) = row.as_array_mut() else {
            *row = Value::Array(Vec::new());
            continue;
        };
        for cell in cells.iter_mut() {
            let valid = cell.get("partId").is_some_and(Value::is_string);
            if !valid {
                *cell = Value::Null;
            } else if let Some(entry) = cell.as_object_mut() {
                if entry.get("level").is_some_and(|l| !is_level(l)) {
                    entry.remove("level");
                }
            }
        }
    }
}

/// Decode a JSON save, migrating and repairing it on the way.
pub fn decode_json(text: &str) -> Result<SaveData, SaveError> {
    let doc = parse_envelope(text)?;
    let version = detect_version(&doc);
    if version > SAVE_VERSION {
        return Err(SaveError::FutureVersion {
            found: version,
            supported: SAVE_VERSION,
        });
    }
    let mut doc = migrations().migrate(doc, version, SAVE_VERSION)?;
    repair(&mut doc);
    Ok(serde_json::from_value(doc)?)
}

/// Decode a binary save.
pub fn decode_bytes(data: &[u8]) -> Result<SaveData, SaveError> {
    if data.is_empty() {
        return Err(SaveError::TooShort);
    }
    let save: BinarySave =
        bitcode::deserialize(data).map_err(|e| SaveError::Decode(e.to_string()))?;
    save.header.validate()?;
    Ok(save.into_save())
}

// ===========================================================================
// Session integration
// ===========================================================================

impl GameSession {
    /// Snapshot the session as a current-version save.
    pub fn save(&self) -> SaveData {
        let state = self.progression.state();
        SaveData {
            version: SAVE_VERSION,
            state: SavedState {
                velocity: state.velocity,
                distance: state.distance,
                max_velocity: state.max_velocity,
                resources: self.resources.to_f64_map(),
                unlocks: state.unlocked_parts.iter().cloned().collect(),
                current_area_id: Some(state.current_area.clone()),
                inventory: self
                    .inventory
                    .iter()
                    .map(|(_, instance)| SavedInstance {
                        part_id: instance.part.clone(),
                        level: instance.level,
                    })
                    .collect(),
                researched: self.tech.researched().iter().cloned().collect(),
                cleared: state.cleared,
            },
            grid: self.grid.export_board(),
            timestamp: now_millis(),
        }
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(&self.save())?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        let binary = BinarySave::from_save(&self.save());
        bitcode::serialize(&binary).map_err(|e| SaveError::Encode(e.to_string()))
    }

    pub fn load_json(
        catalog: Arc<Catalog>,
        config: GameConfig,
        text: &str,
    ) -> Result<Self, SaveError> {
        let save = decode_json(text)?;
        Ok(Self::from_save(catalog, config, save))
    }

    pub fn load_bytes(
        catalog: Arc<Catalog>,
        config: GameConfig,
        data: &[u8],
    ) -> Result<Self, SaveError> {
        let save = decode_bytes(data)?;
        Ok(Self::from_save(catalog, config, save))
    }

    /// Load a JSON save, or start a new game if the envelope is unreadable.
    pub fn load_or_new(catalog: Arc<Catalog>, config: GameConfig, text: &str) -> Self {
        match decode_json(text) {
            Ok(save) => Self::from_save(catalog, config, save),
            Err(err) => {
                log::warn!("discarding unreadable save, starting a new game: {err}");
                Self::new(catalog, config)
            }
        }
    }

    /// Build a session from a decoded save, dropping everything the catalog
    /// no longer knows.
    pub fn from_save(catalog: Arc<Catalog>, config: GameConfig, save: SaveData) -> Self {
        let mut session = Self::new(catalog.clone(), config);
        let SaveData { state, grid, .. } = save;

        let mut resources = ResourceLedger::new();
        for (material, amount) in state.resources {
            if catalog.material(material.as_str()).is_some() {
                resources.set(material, amount_from_f64(amount));
            } else {
                log::warn!("dropping unknown material {material} from save");
            }
        }
        resources.backfill(&catalog);
        session.resources = resources;

        let mut inventory = Inventory::new();
        for entry in state.inventory {
            if catalog.part(entry.part_id.as_str()).is_some() {
                inventory.add(PartInstance::with_level(entry.part_id, entry.level));
            } else {
                log::warn!("dropping unknown part {} from inventory", entry.part_id);
            }
        }
        session.inventory = inventory;

        session.tech.restore(state.researched);
        let report = session.grid.import_board(&grid);

        let saved = ProgressionState {
            velocity: state.velocity,
            max_velocity: state.max_velocity,
            distance: state.distance,
            current_area: state
                .current_area_id
                .unwrap_or_else(|| catalog.starting_area().id.clone()),
            unlocked_parts: state.unlocks.into_iter().collect(),
            cleared: state.cleared,
        };
        session.progression = Progression::restore(
            catalog,
            session.config.progression.clone(),
            &session.config.economy.starting_unlocks,
            saved,
        );
        session
            .progression
            .refresh_velocity(&session.grid, &session.tech);

        log::info!(
            "save loaded: {} parts placed, {} dropped, best velocity {:.1}",
            report.placed,
            report.dropped,
            session.progression.state().max_velocity
        );
        session
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use velocity_core::fixed::{Amount, amount_from_u32, amount_to_f64};
    use velocity_core::test_utils::*;

    fn load(text: &str) -> GameSession {
        GameSession::load_json(shared_test_catalog(), GameConfig::default(), text).unwrap()
    }

    /// A session with something in every saved field.
    fn played_session() -> GameSession {
        let mut s = GameSession::new(shared_test_catalog(), GameConfig::default());
        s.resources_mut().credit(&scrap(), amount_from_u32(500));
        s.resources_mut().credit(&rubber(), amount_from_u32(40));

        let engine = s.inventory().find(&PartId::from("engine_basic")).unwrap();
        let frame = s.inventory().find(&PartId::from("frame_basic")).unwrap();
        s.place_from_inventory(engine, 1, 1).unwrap();
        s.place_from_inventory(frame, 1, 0).unwrap();
        s.upgrade_part(1, 1).unwrap();
        s.research("tech_eng_eff_1").unwrap();
        s.tick(2.0);
        s
    }

    // -----------------------------------------------------------------------
    // Test 1: JSON round trip
    // -----------------------------------------------------------------------
    #[test]
    fn json_round_trip_preserves_session() {
        let s = played_session();
        let text = s.to_json().unwrap();
        let loaded = load(&text);

        assert_eq!(loaded.grid().export_board(), s.grid().export_board());
        assert_eq!(loaded.tech().researched(), s.tech().researched());
        assert_eq!(loaded.resources().to_f64_map(), s.resources().to_f64_map());
        assert_eq!(loaded.inventory().len(), s.inventory().len());
        assert_eq!(loaded.state(), s.state());
        assert!((loaded.velocity() - s.velocity()).abs() < 1e-9);
    }

    #[test]
    fn json_shape_uses_storage_field_names() {
        let s = played_session();
        let doc: Value = serde_json::from_str(&s.to_json().unwrap()).unwrap();

        assert_eq!(doc["version"], json!(SAVE_VERSION));
        assert!(doc["timestamp"].as_u64().is_some());
        assert_eq!(doc["state"]["currentAreaId"], json!("area_junkyard"));
        assert!(doc["state"]["maxVelocity"].is_number());
        assert_eq!(doc["state"]["inventory"][0]["level"], json!(1));
        assert_eq!(doc["grid"].as_array().unwrap().len(), 10);
        assert_eq!(doc["grid"][1][1], json!({"partId": "engine_basic", "level": 2}));
        assert_eq!(doc["grid"][0][0], Value::Null);
    }

    // -----------------------------------------------------------------------
    // Test 2: unversioned saves
    // -----------------------------------------------------------------------
    #[test]
    fn legacy_save_is_migrated() {
        let text = json!({
            "state": {
                "velocity": 24.0,
                "distance": 100.0,
                "resources": {"scrap": 12.5},
                "unlocks": ["engine_basic"],
                "currentAreaId": "area_junkyard",
                "inventory": ["wheel_basic", "frame_basic"]
            },
            "grid": [[{"partId": "engine_basic"}]],
            "timestamp": 1_700_000_000_000u64
        })
        .to_string();

        let s = load(&text);
        assert_eq!(s.state().max_velocity, 24.0);
        assert_eq!(s.state().distance, 100.0);
        assert_eq!(s.resources().balance("rubber"), Amount::ZERO);
        assert_eq!(s.resources().balance("scrap"), amount_from_f64(12.5));
        assert_eq!(s.inventory().len(), 2);
        assert!(s.inventory().iter().all(|(_, i)| i.level == 1));
        assert_eq!(s.grid().cell(0, 0).unwrap().level, 1);
        // Velocity comes from the board, not the stale saved value.
        assert_eq!(s.state().velocity, 10.0);
        assert!(s.is_unlocked("booster_basic"));
        assert!(s.tech().researched().is_empty());
    }

    #[test]
    fn migration_chain_reaches_current_version() {
        let registry = migrations();
        assert!(registry.can_migrate(0, SAVE_VERSION));

        let doc = json!({"state": {"velocity": 5.0, "inventory": ["engine_basic"]}});
        let migrated = registry.migrate(doc, 0, SAVE_VERSION).unwrap();
        assert_eq!(detect_version(&migrated), SAVE_VERSION);
        assert_eq!(migrated["state"]["maxVelocity"], json!(5.0));
        assert_eq!(
            migrated["state"]["inventory"][0],
            json!({"partId": "engine_basic", "level": 1})
        );
        assert_eq!(migrated["state"]["cleared"], json!(false));
    }

    // -----------------------------------------------------------------------
    // Test 3: bad values inside a good envelope
    // -----------------------------------------------------------------------
    #[test]
    fn corrupt_fields_fall_back_to_defaults() {
        let text = json!({
            "version": 1,
            "state": {
                "velocity": "fast",
                "distance": null,
                "maxVelocity": 30.0,
                "resources": {"scrap": "lots", "rubber": 5},
                "unlocks": [1, "engine_basic"],
                "currentAreaId": 7,
                "inventory": [42, {"partId": "wheel_basic", "level": -3}],
                "researched": "all of them",
                "cleared": "no"
            },
            "grid": [[{"partId": 3}, {"partId": "engine_basic", "level": 2.5}], "row"]
        })
        .to_string();

        let s = load(&text);
        assert_eq!(s.state().max_velocity, 30.0);
        assert_eq!(s.state().distance, 0.0);
        assert_eq!(s.resources().balance("scrap"), Amount::ZERO);
        assert_eq!(s.resources().balance("rubber"), amount_from_u32(5));
        assert_eq!(s.state().current_area.as_str(), "area_junkyard");
        assert_eq!(s.inventory().len(), 1);
        assert!(s.grid().cell(0, 0).is_none());
        assert_eq!(s.grid().cell(1, 0).unwrap().level, 1);
        assert!(!s.state().cleared);
    }

    #[test]
    fn large_saved_balances_load_in_full() {
        let s = load(r#"{"state":{"resources":{"scrap":5000000000,"rubber":123456789012.5}}}"#);
        assert_eq!(amount_to_f64(s.resources().balance("scrap")), 5_000_000_000.0);
        assert_eq!(amount_to_f64(s.resources().balance("rubber")), 123_456_789_012.5);

        let reloaded = load(&s.to_json().unwrap());
        assert_eq!(reloaded.resources(), s.resources());
    }

    #[test]
    fn stale_ids_are_dropped() {
        let text = json!({
            "version": 1,
            "state": {
                "maxVelocity": 10.0,
                "resources": {"scrap": 3, "unobtanium": 99},
                "unlocks": ["engine_basic", "warp_drive"],
                "inventory": [{"partId": "warp_drive", "level": 2}, {"partId": "frame_basic"}],
                "researched": ["tech_eng_eff_1", "tech_time_travel"]
            },
            "grid": [[{"partId": "warp_drive", "level": 1}, {"partId": "engine_basic", "level": 1}]]
        })
        .to_string();

        let s = load(&text);
        assert!(s.resources().iter().all(|(m, _)| m.as_str() != "unobtanium"));
        assert!(!s.state().unlocked_parts.contains("warp_drive"));
        assert_eq!(s.inventory().len(), 1);
        assert_eq!(s.tech().researched().len(), 1);
        assert_eq!(s.grid().part_count(), 1);
        assert!((s.velocity() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn unreachable_area_resets_and_win_is_recomputed() {
        let text = json!({
            "version": 1,
            "state": {"maxVelocity": 50.0, "currentAreaId": "area_city"}
        })
        .to_string();
        let s = load(&text);
        assert_eq!(s.state().current_area.as_str(), "area_junkyard");

        let text = json!({
            "version": 1,
            "state": {"maxVelocity": 250000.0, "currentAreaId": "area_city", "cleared": false}
        })
        .to_string();
        let s = load(&text);
        assert_eq!(s.state().current_area.as_str(), "area_city");
        assert!(s.state().cleared);
    }

    // -----------------------------------------------------------------------
    // Test 4: unreadable envelopes
    // -----------------------------------------------------------------------
    #[test]
    fn malformed_envelopes_are_errors() {
        assert!(matches!(decode_json("not json"), Err(SaveError::Json(_))));
        assert!(matches!(decode_json("[1, 2]"), Err(SaveError::Malformed(_))));
        assert!(matches!(
            decode_json(r#"{"state": 3}"#),
            Err(SaveError::Malformed(_))
        ));
        assert!(matches!(
            decode_json(r#"{"version": 99, "state": {}}"#),
            Err(SaveError::FutureVersion { found: 99, .. })
        ));
    }

    #[test]
    fn load_or_new_falls_back_to_fresh_game() {
        let s = GameSession::load_or_new(shared_test_catalog(), GameConfig::default(), "{{{");
        assert_eq!(s.inventory().len(), 3);
        assert!(s.grid().is_empty());

        let saved = played_session().to_json().unwrap();
        let s = GameSession::load_or_new(shared_test_catalog(), GameConfig::default(), &saved);
        assert_eq!(s.grid().part_count(), 2);
    }

    // -----------------------------------------------------------------------
    // Test 5: binary saves
    // -----------------------------------------------------------------------
    #[test]
    fn binary_round_trip_preserves_session() {
        let s = played_session();
        let bytes = s.to_bytes().unwrap();
        let loaded =
            GameSession::load_bytes(shared_test_catalog(), GameConfig::default(), &bytes).unwrap();

        assert_eq!(loaded.grid().export_board(), s.grid().export_board());
        assert_eq!(loaded.state(), s.state());
        assert_eq!(loaded.resources().to_f64_map(), s.resources().to_f64_map());
        assert_eq!(loaded.tech().researched(), s.tech().researched());
    }

    #[test]
    fn binary_header_is_validated() {
        let mut binary = BinarySave::from_save(&played_session().save());
        binary.header.magic = 0xDEAD_BEEF;
        let bytes = bitcode::serialize(&binary).unwrap();
        assert!(matches!(
            decode_bytes(&bytes),
            Err(SaveError::InvalidMagic(0xDEAD_BEEF))
        ));

        binary.header = SaveHeader::new(0);
        binary.header.version = SAVE_VERSION + 1;
        let bytes = bitcode::serialize(&binary).unwrap();
        assert!(matches!(
            decode_bytes(&bytes),
            Err(SaveError::FutureVersion { .. })
        ));
    }

    #[test]
    fn binary_garbage_is_rejected() {
        assert!(matches!(decode_bytes(&[]), Err(SaveError::TooShort)));
        let bytes = played_session().to_bytes().unwrap();
        assert!(matches!(
            decode_bytes(&bytes[..bytes.len() / 2]),
            Err(SaveError::Decode(_))
        ));
    }

    #[test]
    fn binary_cells_outside_board_are_dropped() {
        let binary = BinarySave {
            header: SaveHeader::new(0),
            state: SavedState::default(),
            cells: vec![
                BinaryCell {
                    x: 2,
                    y: 3,
                    part: PartId::from("engine_basic"),
                    level: 4,
                },
                BinaryCell {
                    x: 12,
                    y: 0,
                    part: PartId::from("engine_basic"),
                    level: 1,
                },
            ],
        };
        let save = binary.into_save();
        let cell = save.grid.get(2, 3).unwrap();
        assert_eq!(cell.level, Some(4));
        let placed = save.grid.rows.iter().flatten().filter(|c| c.is_some()).count();
        assert_eq!(placed, 1);
    }
}
