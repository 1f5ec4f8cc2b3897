//! Latest-value store.
//!
//! Keeps the most recent price per symbol under last-write-wins by *event
//! time*: an update is accepted only if it is newer than the resident
//! entry, so late-arriving older ticks can never roll a price back.
//!
//! The map is only reachable through [`LatestValueStore::apply`] and
//! [`LatestValueStore::get`]; locks never leak to callers. With the default
//! single shard the whole map sits behind one readers-writer lock. More
//! shards split it into independent lock domains by key hash.

use std::collections::HashMap;
use std::collections::hash_map::{Entry, RandomState};
use std::hash::BuildHasher;
use std::str::FromStr;

use corelib::{StoreEntry, UpdateRecord};
use parking_lot::RwLock;

/// What happens when an update carries the same event time as the resident entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep what is there; only strictly newer updates replace.
    #[default]
    KeepResident,
    /// The later arrival wins.
    LastApplied,
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep-resident" | "keep_resident" => Ok(TieBreak::KeepResident),
            "last-applied" | "last_applied" => Ok(TieBreak::LastApplied),
            other => Err(format!(
                "unknown tie-break policy {other:?} (expected keep-resident or last-applied)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Independent lock domains (minimum 1).
    pub shards: usize,
    pub tie_break: TieBreak,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            shards: 1,
            tie_break: TieBreak::KeepResident,
        }
    }
}

/// Result of [`LatestValueStore::apply`]. `Stale` is a policy outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Replaced,
    Stale,
}

type Shard = RwLock<HashMap<String, StoreEntry>>;

pub struct LatestValueStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
    tie_break: TieBreak,
}

impl Default for LatestValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestValueStore {
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    pub fn with_options(opts: StoreOptions) -> Self {
        let shards = (0..opts.shards.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        Self {
            shards,
            hasher: RandomState::new(),
            tie_break: opts.tie_break,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    fn shard(&self, symbol: &str) -> &Shard {
        if self.shards.len() == 1 {
            return &self.shards[0];
        }
        let idx = (self.hasher.hash_one(symbol) % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    fn accepts(&self, resident: i64, incoming: i64) -> bool {
        match self.tie_break {
            TieBreak::KeepResident => incoming > resident,
            TieBreak::LastApplied => incoming >= resident,
        }
    }

    /// Merge one update. The write lock is held only for the compare-and-replace.
    pub fn apply(&self, record: UpdateRecord) -> ApplyOutcome {
        let shard = self.shard(&record.symbol);
        let UpdateRecord {
            symbol,
            price,
            event_time,
        } = record;

        let mut map = shard.write();
        match map.entry(symbol) {
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if !self.accepts(entry.event_time, event_time) {
                    return ApplyOutcome::Stale;
                }
                entry.price = price;
                entry.event_time = event_time;
                ApplyOutcome::Replaced
            }
            Entry::Vacant(slot) => {
                let symbol = slot.key().clone();
                slot.insert(StoreEntry {
                    symbol,
                    price,
                    event_time,
                });
                ApplyOutcome::Inserted
            }
        }
    }

    /// Copy of the resident entry, or `None` if the symbol has never been seen.
    pub fn get(&self, symbol: &str) -> Option<StoreEntry> {
        self.shard(symbol).read().get(symbol).cloned()
    }

    /// Number of tracked symbols.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }
}
