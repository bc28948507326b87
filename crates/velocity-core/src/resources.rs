//! Material balances.
//!
//! Balances only grow through [`ResourceLedger::credit`] and only shrink
//! through [`ResourceLedger::spend`], which is all-or-nothing: either every
//! material in the cost is debited or nothing is. Balances never go negative.

use crate::catalog::{Catalog, Cost};
use crate::fixed::{Amount, amount_from_f64, amount_to_f64};
use crate::id::MaterialId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    #[error("insufficient {material}: need {required}, have {available}")]
    Insufficient {
        material: MaterialId,
        required: Amount,
        available: Amount,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLedger {
    balances: BTreeMap<MaterialId, Amount>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger holding zero of every material in the catalog.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let mut ledger = Self::new();
        ledger.backfill(catalog);
        ledger
    }

    /// Insert a zero balance for every catalog material that has none.
    pub fn backfill(&mut self, catalog: &Catalog) {
        for material in catalog.materials() {
            self.balances
                .entry(material.id.clone())
                .or_insert(Amount::ZERO);
        }
    }

    /// Current balance. Unknown materials read as zero.
    pub fn balance(&self, material: &str) -> Amount {
        self.balances.get(material).copied().unwrap_or(Amount::ZERO)
    }

    /// Add to a balance. Negative amounts are ignored.
    pub fn credit(&mut self, material: &MaterialId, amount: Amount) {
        if amount <= Amount::ZERO {
            return;
        }
        let entry = self
            .balances
            .entry(material.clone())
            .or_insert(Amount::ZERO);
        *entry = match entry.checked_add(amount) {
            Some(sum) => sum,
            None => {
                log::warn!("{material} balance saturated");
                Amount::MAX
            }
        };
    }

    /// Convenience for crediting a fractional f64 amount (resource drip).
    pub fn credit_f64(&mut self, material: &MaterialId, amount: f64) {
        self.credit(material, amount_from_f64(amount));
    }

    /// First shortfall in `cost`, if any.
    pub fn check(&self, cost: &Cost) -> Result<(), ResourceError> {
        for (material, required) in cost {
            let available = self.balance(material.as_str());
            if available < *required {
                return Err(ResourceError::Insufficient {
                    material: material.clone(),
                    required: *required,
                    available,
                });
            }
        }
        Ok(())
    }

    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.check(cost).is_ok()
    }

    /// Debit every material in `cost`, or nothing if any one is short.
    pub fn spend(&mut self, cost: &Cost) -> Result<(), ResourceError> {
        self.check(cost)?;
        for (material, required) in cost {
            if let Some(balance) = self.balances.get_mut(material) {
                *balance -= *required;
            }
        }
        Ok(())
    }

    /// Overwrite a balance, clamping negatives to zero. Used when restoring a save.
    pub fn set(&mut self, material: MaterialId, amount: Amount) {
        self.balances.insert(material, amount.max(Amount::ZERO));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MaterialId, Amount)> {
        self.balances.iter().map(|(k, v)| (k, *v))
    }

    /// Balances as f64 for persistence and display.
    pub fn to_f64_map(&self) -> BTreeMap<MaterialId, f64> {
        self.balances
            .iter()
            .map(|(k, v)| (k.clone(), amount_to_f64(*v)))
            .collect()
    }
}
