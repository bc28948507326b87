//! Velocity Core -- shared foundations for the Velocity Idle engine.
//!
//! This crate holds the pieces every other crate in the workspace builds on:
//! string identifiers, fixed-point resource amounts, the immutable content
//! [`catalog::Catalog`], the [`resources::ResourceLedger`], the narrow
//! [`modifier::TechModifiers`] seam the grid reads research bonuses through,
//! game events, the single-writer command queue, and save migrations.
//!
//! # Crate Map
//!
//! - `velocity-core` (this crate) -- ids, amounts, catalog, ledger, events.
//! - `velocity-tech` -- researched technologies and their aggregate modifiers.
//! - `velocity-grid` -- the 10x10 board and the velocity computation.
//! - `velocity-data` -- catalog and config loading from RON/TOML/JSON.
//! - `velocity-game` -- progression ticks, shop, inventory, persistence.
//!
//! # Key Types
//!
//! - [`catalog::Catalog`] -- Immutable part/area/tech/material definitions,
//!   built through [`catalog::CatalogBuilder`] and shared behind an `Arc`.
//! - [`resources::ResourceLedger`] -- Non-negative material balances with
//!   all-or-nothing spending.
//! - [`modifier::TechModifiers`] -- Read-only research bonus queries.
//! - [`inventory::Inventory`] -- Owned, unplaced part instances.
//! - [`event::EventBus`] -- Buffered game events with passive listeners.
//! - [`command::CommandQueue`] -- UI mutations serialized for the next tick.
//! - [`migration::MigrationRegistry`] -- Versioned save migration chain.

pub mod catalog;
pub mod command;
pub mod event;
pub mod fixed;
pub mod id;
pub mod inventory;
pub mod migration;
pub mod modifier;
pub mod resources;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
