use crate::id::PartId;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Identifies one owned, unplaced part instance.
    pub struct InstanceId;
}

/// A part the player owns but has not placed on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInstance {
    pub part: PartId,
    /// Upgrade level carried over when a placed part is stored. Always >= 1.
    pub level: u32,
}

impl PartInstance {
    pub fn new(part: PartId) -> Self {
        Self { part, level: 1 }
    }

    pub fn with_level(part: PartId, level: u32) -> Self {
        Self {
            part,
            level: level.max(1),
        }
    }
}

/// Owned part instances. Iteration follows slot order, not purchase order.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    instances: SlotMap<InstanceId, PartInstance>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instance: PartInstance) -> InstanceId {
        self.instances.insert(instance)
    }

    pub fn get(&self, id: InstanceId) -> Option<&PartInstance> {
        self.instances.get(id)
    }

    pub fn take(&mut self, id: InstanceId) -> Option<PartInstance> {
        self.instances.remove(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &PartInstance)> {
        self.instances.iter()
    }

    /// Number of owned instances of one part.
    pub fn count_of(&self, part: &PartId) -> usize {
        self.instances.values().filter(|i| &i.part == part).count()
    }

    /// First instance of `part`, if any.
    pub fn find(&self, part: &PartId) -> Option<InstanceId> {
        self.instances
            .iter()
            .find(|(_, i)| &i.part == part)
            .map(|(id, _)| id)
    }

    /// Instances as a plain list, for persistence.
    pub fn to_vec(&self) -> Vec<PartInstance> {
        self.instances.values().cloned().collect()
    }
}
