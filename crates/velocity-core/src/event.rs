//! Game events with a pre-allocated ring buffer.
//!
//! Events are emitted by the session while it applies commands and runs a
//! tick, then handed to the UI either by [`EventBus::deliver`] (calls the
//! registered passive listeners) or [`EventBus::drain`] (returns them to a
//! polling host). Both consume the buffered events.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`]. Suppressed
//! events are never buffered and never counted.

use crate::fixed::Ticks;
use crate::id::{AreaId, PartId, TechId};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A game event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    // -- Progression --
    /// A part entered the shop. Fired at most once per part.
    PartUnlocked { part: PartId, tick: Ticks },
    /// One or more parts were unlocked during a tick.
    ShopChanged { tick: Ticks },
    /// An area became selectable.
    AreaUnlocked { area: AreaId, tick: Ticks },
    /// The player switched the active area.
    AreaChanged { area: AreaId, tick: Ticks },
    /// The win velocity was reached. Fired once per session.
    GameCleared { max_velocity: f64, tick: Ticks },

    // -- Economy --
    PartPurchased { part: PartId, tick: Ticks },
    ResearchCompleted { tech: TechId, tick: Ticks },

    // -- Board --
    PartPlaced {
        part: PartId,
        x: i32,
        y: i32,
        tick: Ticks,
    },
    PartRemoved {
        part: PartId,
        x: i32,
        y: i32,
        tick: Ticks,
    },
    PartUpgraded {
        part: PartId,
        x: i32,
        y: i32,
        level: u32,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PartUnlocked,
    ShopChanged,
    AreaUnlocked,
    AreaChanged,
    GameCleared,
    PartPurchased,
    ResearchCompleted,
    PartPlaced,
    PartRemoved,
    PartUpgraded,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 10;

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::PartUnlocked { .. } => EventKind::PartUnlocked,
            GameEvent::ShopChanged { .. } => EventKind::ShopChanged,
            GameEvent::AreaUnlocked { .. } => EventKind::AreaUnlocked,
            GameEvent::AreaChanged { .. } => EventKind::AreaChanged,
            GameEvent::GameCleared { .. } => EventKind::GameCleared,
            GameEvent::PartPurchased { .. } => EventKind::PartPurchased,
            GameEvent::ResearchCompleted { .. } => EventKind::ResearchCompleted,
            GameEvent::PartPlaced { .. } => EventKind::PartPlaced,
            GameEvent::PartRemoved { .. } => EventKind::PartRemoved,
            GameEvent::PartUpgraded { .. } => EventKind::PartUpgraded,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            GameEvent::PartUnlocked { tick, .. }
            | GameEvent::ShopChanged { tick }
            | GameEvent::AreaUnlocked { tick, .. }
            | GameEvent::AreaChanged { tick, .. }
            | GameEvent::GameCleared { tick, .. }
            | GameEvent::PartPurchased { tick, .. }
            | GameEvent::ResearchCompleted { tick, .. }
            | GameEvent::PartPlaced { tick, .. }
            | GameEvent::PartRemoved { tick, .. }
            | GameEvent::PartUpgraded { tick, .. } => *tick,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<GameEvent>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Events overwritten before anyone read them.
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            dropped: 0,
        }
    }

    /// Push an event. If full, the oldest event is dropped.
    pub fn push(&mut self, event: GameEvent) {
        if self.len == self.capacity() {
            self.dropped += 1;
        } else {
            self.len += 1;
        }
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        // Once full, head points at the oldest entry.
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    /// Remove and return all events, oldest first.
    pub fn take_all(&mut self) -> Vec<GameEvent> {
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        let capacity = self.capacity();
        let mut out = Vec::with_capacity(self.len);
        for i in 0..self.len {
            if let Some(event) = self.events[(start + i) % capacity].take() {
                out.push(event);
            }
        }
        self.head = 0;
        self.len = 0;
        out
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&GameEvent)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&GameEvent) -> bool>;

struct ListenerEntry {
    listener: PassiveListener,
    filter: Option<EventFilter>,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("listener", &"<fn>")
            .field(
                "filter",
                &if self.filter.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Buffered game events plus per-kind listeners and suppression flags.
#[derive(Debug)]
pub struct EventBus {
    buffer: EventBuffer,
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    emitted: [u64; EVENT_KIND_COUNT],
}

impl EventBus {
    /// Create a bus that buffers at most `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: EventBuffer::new(capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            emitted: [0; EVENT_KIND_COUNT],
        }
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-ops if its kind is suppressed.
    pub fn emit(&mut self, event: GameEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        self.emitted[idx] += 1;
        self.buffer.push(event);
    }

    /// Register a listener for one event kind. Listeners run in
    /// registration order.
    pub fn on(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_filtered(kind, None, listener);
    }

    pub fn on_filtered(
        &mut self,
        kind: EventKind,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.listeners[kind.index()].push(ListenerEntry { listener, filter });
    }

    /// Hand every buffered event to its listeners, oldest first, then clear
    /// the buffer. Returns the number of events delivered.
    pub fn deliver(&mut self) -> usize {
        let events = self.buffer.take_all();
        for event in &events {
            for entry in &mut self.listeners[event.kind().index()] {
                if let Some(ref filter) = entry.filter
                    && !filter(event)
                {
                    continue;
                }
                (entry.listener)(event);
            }
        }
        events.len()
    }

    /// Remove buffered events without calling listeners, oldest first.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.buffer.take_all()
    }

    pub fn buffered(&self) -> impl Iterator<Item = &GameEvent> {
        self.buffer.iter()
    }

    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.emitted[kind.index()]
    }

    pub fn dropped_count(&self) -> u64 {
        self.buffer.dropped_count()
    }

    /// Clear buffered events. Keeps listeners and suppression settings.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
