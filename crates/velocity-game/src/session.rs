//! The game session: one owner for every piece of mutable game state.
//!
//! A [`GameSession`] wires the shared catalog to the board, the research
//! ledger, the resource ledger, the inventory and the progression state.
//! Player actions are either called directly or submitted as [`Command`]s
//! and applied, in submission order, at the start of the next
//! [`GameSession::tick`].

use std::sync::Arc;

use velocity_core::catalog::{Catalog, Cost, PartDefinition, TechDefinition};
use velocity_core::command::{Command, CommandQueue};
use velocity_core::event::{EventBus, EventFilter, EventKind, GameEvent, PassiveListener};
use velocity_core::fixed::{Amount, Ticks, amount_from_u32, amount_to_f64, floor_amount};
use velocity_core::id::{AreaId, PartId, TechId};
use velocity_core::inventory::{InstanceId, Inventory, PartInstance};
use velocity_core::modifier::TechModifiers;
use velocity_core::resources::ResourceLedger;
use velocity_grid::{GridEngine, GridError, GridPosition, PlacedPart, VelocityBreakdown};
use velocity_tech::TechLedger;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::progression::{Progression, ProgressionState};

/// Capacity of the session's event buffer.
const EVENT_CAPACITY: usize = 256;

/// Result of applying one queued [`Command`].
#[derive(Debug)]
pub enum CommandOutcome {
    Purchased(InstanceId),
    Placed,
    Stored(InstanceId),
    Moved,
    /// The part's new level.
    Upgraded(u32),
    Researched(TechId),
    AreaSelected(AreaId),
    Rejected(GameError),
}

impl CommandOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, CommandOutcome::Rejected(_))
    }
}

/// One shop row: an unlocked part and what it costs right now.
#[derive(Debug, Clone)]
pub struct ShopEntry<'a> {
    pub part: &'a PartDefinition,
    pub cost: Cost,
    pub affordable: bool,
}

pub struct GameSession {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) config: GameConfig,
    pub(crate) grid: GridEngine,
    pub(crate) tech: TechLedger,
    pub(crate) resources: ResourceLedger,
    pub(crate) inventory: Inventory,
    pub(crate) progression: Progression,
    pub(crate) events: EventBus,
    pub(crate) commands: CommandQueue,
    pub(crate) tick: Ticks,
}

impl GameSession {
    /// A fresh game: empty board, zero balances, the configured starting
    /// inventory and unlocks.
    pub fn new(catalog: Arc<Catalog>, config: GameConfig) -> Self {
        let mut inventory = Inventory::new();
        for part in &config.economy.starting_inventory {
            if catalog.part(part.as_str()).is_some() {
                inventory.add(PartInstance::new(part.clone()));
            } else {
                log::warn!("starting inventory names unknown part {part}");
            }
        }

        let progression = Progression::new(
            catalog.clone(),
            config.progression.clone(),
            &config.economy.starting_unlocks,
        );

        Self {
            grid: GridEngine::with_config(catalog.clone(), config.synergy.clone()),
            tech: TechLedger::new(catalog.clone()),
            resources: ResourceLedger::for_catalog(&catalog),
            inventory,
            progression,
            events: EventBus::new(EVENT_CAPACITY),
            commands: CommandQueue::new(),
            tick: 0,
            catalog,
            config,
        }
    }

    /// Like [`GameSession::new`], but the command queue keeps the last
    /// `max_history` applied commands with the tick they ran on.
    pub fn with_command_history(
        catalog: Arc<Catalog>,
        config: GameConfig,
        max_history: usize,
    ) -> Self {
        let mut session = Self::new(catalog, config);
        session.commands = CommandQueue::with_max_history(max_history);
        session
    }

    /// A fresh game on the shipped content with default tuning.
    pub fn with_builtin_content() -> Result<Self, GameError> {
        let catalog = velocity_data::builtin_catalog()?;
        Ok(Self::new(Arc::new(catalog), GameConfig::default()))
    }

    // -- Accessors --

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridEngine {
        &self.grid
    }

    pub fn tech(&self) -> &TechLedger {
        &self.tech
    }

    pub fn resources(&self) -> &ResourceLedger {
        &self.resources
    }

    /// Direct ledger access for tools and tests. Game rules never need it.
    pub fn resources_mut(&mut self) -> &mut ResourceLedger {
        &mut self.resources
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn state(&self) -> &ProgressionState {
        self.progression.state()
    }

    /// Ticks run so far.
    pub fn current_tick(&self) -> Ticks {
        self.tick
    }

    /// Velocity of the current board. Unlike `state().velocity` this does
    /// not wait for the next tick.
    pub fn velocity(&self) -> f64 {
        self.grid.velocity(&self.tech)
    }

    pub fn velocity_breakdown(&self) -> VelocityBreakdown {
        self.grid.velocity_breakdown(&self.tech)
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Take every buffered event.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Call `listener` for every event of `kind` handed out by
    /// [`GameSession::deliver_events`].
    pub fn on_event(&mut self, kind: EventKind, listener: PassiveListener) {
        self.events.on(kind, listener);
    }

    pub fn on_event_filtered(
        &mut self,
        kind: EventKind,
        filter: EventFilter,
        listener: PassiveListener,
    ) {
        self.events.on_filtered(kind, Some(filter), listener);
    }

    /// Stop recording events of `kind`. Hosts that only poll milestones use
    /// this to keep board chatter out of the buffer.
    pub fn suppress_event(&mut self, kind: EventKind) {
        self.events.suppress(kind);
    }

    /// Run the registered listeners over the buffered events and clear the
    /// buffer. Returns the number of events delivered.
    pub fn deliver_events(&mut self) -> usize {
        self.events.deliver()
    }

    /// Events lost because nobody drained the buffer in time.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped_count()
    }

    // -- Simulation --

    /// Queue a command for the next tick.
    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn submit_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.push_batch(commands);
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    /// Applied commands with their tick, oldest first. Empty unless the
    /// session was built with [`GameSession::with_command_history`].
    pub fn command_history(&self) -> &[(Ticks, Command)] {
        self.commands.history()
    }

    /// Apply queued commands, then advance progression by `dt` seconds.
    /// Returns one outcome per applied command, in submission order.
    pub fn tick(&mut self, dt: f64) -> Vec<CommandOutcome> {
        self.tick += 1;
        let outcomes: Vec<CommandOutcome> = self
            .commands
            .drain(self.tick)
            .into_iter()
            .map(|command| self.apply(command))
            .collect();

        self.progression.tick(
            dt,
            &self.grid,
            &self.tech,
            &mut self.resources,
            &mut self.events,
            self.tick,
        );
        outcomes
    }

    /// Apply one command immediately.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        let result = match command {
            Command::BuyPart { ref part } => {
                self.buy_part(part.as_str()).map(CommandOutcome::Purchased)
            }
            Command::PlaceFromInventory { instance, x, y } => self
                .place_from_inventory(instance, x, y)
                .map(|()| CommandOutcome::Placed),
            Command::StorePart { x, y } => self.store_part(x, y).map(CommandOutcome::Stored),
            Command::MovePart { from, to } => {
                self.move_part(from, to).map(|()| CommandOutcome::Moved)
            }
            Command::UpgradePart { x, y } => self.upgrade_part(x, y).map(CommandOutcome::Upgraded),
            Command::Research { ref tech } => self
                .research(tech.as_str())
                .map(|()| CommandOutcome::Researched(tech.clone())),
            Command::SelectArea { ref area } => self
                .select_area(area.as_str())
                .map(|()| CommandOutcome::AreaSelected(area.clone())),
        };
        result.unwrap_or_else(|err| {
            log::debug!("rejected {command:?}: {err}");
            CommandOutcome::Rejected(err)
        })
    }

    // -- Shop --

    /// Whether `part` is in the shop.
    pub fn is_unlocked(&self, part: &str) -> bool {
        self.progression.is_unlocked(part)
    }

    /// Unlocked parts in catalog order.
    pub fn unlocked_parts(&self) -> impl Iterator<Item = &PartDefinition> {
        self.catalog
            .parts()
            .iter()
            .filter(|part| self.progression.is_unlocked(part.id.as_str()))
    }

    pub fn shop(&self) -> Vec<ShopEntry<'_>> {
        self.unlocked_parts()
            .map(|part| {
                let cost = scale_cost(&part.cost, self.tech.cost_multiplier(&part.id));
                let affordable = self.resources.can_afford(&cost);
                ShopEntry {
                    part,
                    cost,
                    affordable,
                }
            })
            .collect()
    }

    /// Purchase price of `part` after research discounts.
    pub fn effective_cost(&self, part: &str) -> Result<Cost, GameError> {
        let def = self
            .catalog
            .part(part)
            .ok_or_else(|| GameError::UnknownPart(PartId::from(part)))?;
        Ok(scale_cost(&def.cost, self.tech.cost_multiplier(&def.id)))
    }

    /// Buy one level-1 instance of an unlocked part into inventory.
    pub fn buy_part(&mut self, part: &str) -> Result<InstanceId, GameError> {
        let cost = self.effective_cost(part)?;
        if !self.progression.is_unlocked(part) {
            return Err(GameError::PartLocked(PartId::from(part)));
        }
        self.resources.spend(&cost)?;

        let part = PartId::from(part);
        let instance = self.inventory.add(PartInstance::new(part.clone()));
        self.events.emit(GameEvent::PartPurchased {
            part,
            tick: self.tick,
        });
        Ok(instance)
    }

    // -- Board --

    fn placed_at(&self, x: i32, y: i32) -> Result<&PlacedPart, GridError> {
        let pos = GridPosition::new(x, y);
        if !pos.in_bounds() {
            return Err(GridError::OutOfBounds(pos));
        }
        self.grid.cell(x, y).ok_or(GridError::Empty(pos))
    }

    /// Price of the next upgrade for the part at `(x, y)`:
    /// `floor(base * growth^level * factor * discount)` per material.
    pub fn upgrade_cost(&self, x: i32, y: i32) -> Result<Cost, GameError> {
        let placed = self.placed_at(x, y)?;
        let def = self
            .catalog
            .part(placed.part.as_str())
            .ok_or_else(|| GameError::UnknownPart(placed.part.clone()))?;
        let factor =
            self.config.economy.upgrade_scale(placed.level) * self.tech.cost_multiplier(&def.id);
        Ok(scale_cost(&def.cost, factor))
    }

    /// Pay for and apply one level on the part at `(x, y)`. Returns the new level.
    pub fn upgrade_part(&mut self, x: i32, y: i32) -> Result<u32, GameError> {
        let cost = self.upgrade_cost(x, y)?;
        self.resources.spend(&cost)?;
        let level = self.grid.upgrade(x, y)?;
        if let Some(placed) = self.grid.cell(x, y) {
            self.events.emit(GameEvent::PartUpgraded {
                part: placed.part.clone(),
                x,
                y,
                level,
                tick: self.tick,
            });
        }
        Ok(level)
    }

    /// Put an owned instance on an empty cell. The instance keeps its level
    /// and leaves the inventory.
    pub fn place_from_inventory(
        &mut self,
        instance: InstanceId,
        x: i32,
        y: i32,
    ) -> Result<(), GameError> {
        let PartInstance { part, level } = self
            .inventory
            .get(instance)
            .cloned()
            .ok_or(GameError::UnknownInstance)?;
        self.grid.place(x, y, part.as_str(), level)?;
        self.inventory.take(instance);
        self.events.emit(GameEvent::PartPlaced {
            part,
            x,
            y,
            tick: self.tick,
        });
        Ok(())
    }

    /// Take the part at `(x, y)` back into inventory, level intact.
    pub fn store_part(&mut self, x: i32, y: i32) -> Result<InstanceId, GameError> {
        let placed = self
            .grid
            .remove(x, y)?
            .ok_or(GridError::Empty(GridPosition::new(x, y)))?;
        let instance = self
            .inventory
            .add(PartInstance::with_level(placed.part.clone(), placed.level));
        self.events.emit(GameEvent::PartRemoved {
            part: placed.part,
            x,
            y,
            tick: self.tick,
        });
        Ok(instance)
    }

    /// Move a placed part. An occupied target swaps the two parts.
    pub fn move_part(&mut self, from: (i32, i32), to: (i32, i32)) -> Result<(), GameError> {
        self.grid.move_part(from, to)?;
        Ok(())
    }

    // -- Research --

    pub fn can_research(&self, tech: &str) -> bool {
        self.tech.can_research(tech, &self.resources)
    }

    pub fn research(&mut self, tech: &str) -> Result<(), GameError> {
        self.tech.research(tech, &mut self.resources)?;
        self.events.emit(GameEvent::ResearchCompleted {
            tech: TechId::from(tech),
            tick: self.tick,
        });
        Ok(())
    }

    /// Unresearched technologies whose prerequisites are all researched.
    pub fn available_techs(&self) -> Vec<&TechDefinition> {
        self.tech.available().collect()
    }

    // -- Areas --

    pub fn select_area(&mut self, area: &str) -> Result<(), GameError> {
        self.progression
            .select_area(area, &mut self.events, self.tick)
    }
}

/// Scale every amount in `base` by `factor` and floor it. Positive amounts
/// never drop below 1.
fn scale_cost(base: &Cost, factor: f64) -> Cost {
    let one = amount_from_u32(1);
    base.iter()
        .map(|(material, amount)| {
            let scaled = floor_amount(amount_to_f64(*amount) * factor);
            let scaled = if *amount > Amount::ZERO {
                scaled.max(one)
            } else {
                scaled
            };
            (material.clone(), scaled)
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
