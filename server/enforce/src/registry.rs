use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

use crate::{model::Mutation, UserId};

/// One of the three fixed enforcement targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Disconnect,
    Mute,
    Deafen,
}

impl SlotKind {
    pub const ALL: [SlotKind; 3] = [SlotKind::Disconnect, SlotKind::Mute, SlotKind::Deafen];

    /// Settings key the slot is persisted under.
    pub fn settings_key(&self) -> &'static str {
        match self {
            SlotKind::Disconnect => "disconnect_user_id",
            SlotKind::Mute => "mute_user_id",
            SlotKind::Deafen => "deafen_user_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlotKind::Disconnect => "Disconnect",
            SlotKind::Mute => "Mute",
            SlotKind::Deafen => "Deafen",
        }
    }

    pub fn mutation(&self) -> Mutation {
        match self {
            SlotKind::Disconnect => Mutation::ForceChannelNull,
            SlotKind::Mute => Mutation::SetMuted,
            SlotKind::Deafen => Mutation::SetDeafened,
        }
    }
}

/// Point-in-time copy of all slots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSnapshot {
    slots: HashMap<SlotKind, UserId>,
}

impl TargetSnapshot {
    pub fn get(&self, slot: SlotKind) -> Option<UserId> {
        self.slots.get(&slot).copied()
    }

    pub fn is_bound_to(&self, slot: SlotKind, user: UserId) -> bool {
        self.get(slot) == Some(user)
    }
}

/// Menu row for one slot as seen from a candidate target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotEntry {
    pub slot: SlotKind,
    pub active: bool,
}

impl SlotEntry {
    pub fn display(&self) -> String {
        if self.active {
            format!("{} (active)", self.slot.label())
        } else {
            self.slot.label().to_string()
        }
    }
}

/// Watched identities, one per slot. Cloning shares the same slots.
#[derive(Clone, Default)]
pub struct TargetRegistry {
    inner: Arc<RwLock<HashMap<SlotKind, UserId>>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `slot` to `user`, or clears it when it already holds `user`.
    /// Returns the binding after the call.
    pub fn bind(&self, slot: SlotKind, user: UserId) -> Option<UserId> {
        let mut g = self.inner.write();
        if g.get(&slot) == Some(&user) {
            g.remove(&slot);
            debug!(slot = slot.settings_key(), user_id = %user, "slot cleared");
            None
        } else {
            g.insert(slot, user);
            debug!(slot = slot.settings_key(), user_id = %user, "slot bound");
            Some(user)
        }
    }

    /// Sets the slot unconditionally; `None` clears it.
    pub fn set(&self, slot: SlotKind, user: Option<UserId>) {
        let mut g = self.inner.write();
        match user {
            Some(u) => g.insert(slot, u),
            None => g.remove(&slot),
        };
    }

    pub fn clear(&self, slot: SlotKind) {
        self.inner.write().remove(&slot);
    }

    pub fn get(&self, slot: SlotKind) -> Option<UserId> {
        self.inner.read().get(&slot).copied()
    }

    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot { slots: self.inner.read().clone() }
    }

    pub fn entries_for(&self, user: UserId) -> Vec<SlotEntry> {
        let snap = self.snapshot();
        SlotKind::ALL
            .iter()
            .map(|&slot| SlotEntry { slot, active: snap.is_bound_to(slot, user) })
            .collect()
    }
}
