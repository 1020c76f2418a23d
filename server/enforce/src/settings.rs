//! Durable storage for the three watched slots.
//!
//! Slots live under fixed keys in a JSON object. Other keys in the same file are
//! left untouched on save, so the host can keep its own configuration beside them.

use parking_lot::Mutex;
use serde_json::{Map, Value as Json};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    errors::{EnforceError, EnforceResult},
    registry::{SlotKind, TargetRegistry},
    UserId,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotSettings {
    pub disconnect_user_id: Option<UserId>,
    pub mute_user_id: Option<UserId>,
    pub deafen_user_id: Option<UserId>,
}

impl SlotSettings {
    pub fn get(&self, slot: SlotKind) -> Option<UserId> {
        match slot {
            SlotKind::Disconnect => self.disconnect_user_id,
            SlotKind::Mute => self.mute_user_id,
            SlotKind::Deafen => self.deafen_user_id,
        }
    }

    pub fn set(&mut self, slot: SlotKind, user: Option<UserId>) {
        match slot {
            SlotKind::Disconnect => self.disconnect_user_id = user,
            SlotKind::Mute => self.mute_user_id = user,
            SlotKind::Deafen => self.deafen_user_id = user,
        }
    }

    /// Reads the slot keys out of a settings object. Missing, `null` and `""`
    /// all mean unbound.
    pub fn from_json(obj: &Map<String, Json>) -> EnforceResult<Self> {
        let mut out = Self::default();
        for slot in SlotKind::ALL {
            let user = match obj.get(slot.settings_key()) {
                None | Some(Json::Null) => None,
                Some(Json::String(s)) if s.trim().is_empty() => None,
                Some(Json::String(s)) => Some(UserId(
                    Uuid::parse_str(s.trim())
                        .map_err(|_| EnforceError::InvalidArgument("slot user id is not a uuid"))?,
                )),
                Some(_) => return Err(EnforceError::InvalidArgument("slot user id must be a string")),
            };
            out.set(slot, user);
        }
        Ok(out)
    }

    pub fn write_into(&self, obj: &mut Map<String, Json>) {
        for slot in SlotKind::ALL {
            let v = match self.get(slot) {
                Some(u) => Json::String(u.0.to_string()),
                None => Json::Null,
            };
            obj.insert(slot.settings_key().to_string(), v);
        }
    }
}

impl TargetRegistry {
    pub fn from_settings(settings: &SlotSettings) -> Self {
        let reg = TargetRegistry::new();
        reg.load_settings(settings);
        reg
    }

    pub fn load_settings(&self, settings: &SlotSettings) {
        for slot in SlotKind::ALL {
            self.set(slot, settings.get(slot));
        }
    }

    /// Toggle with the same semantics as [`bind`](Self::bind), committed to
    /// `store` first. On a failed save the slot keeps its previous value.
    pub fn bind_persisted(
        &self,
        store: &dyn SettingsStore,
        slot: SlotKind,
        user: UserId,
    ) -> EnforceResult<Option<UserId>> {
        let mut next = self.to_settings();
        let bound = if next.get(slot) == Some(user) { None } else { Some(user) };
        next.set(slot, bound);

        store.save(&next)?;
        self.set(slot, bound);
        Ok(bound)
    }

    pub fn to_settings(&self) -> SlotSettings {
        let snap = self.snapshot();
        let mut out = SlotSettings::default();
        for slot in SlotKind::ALL {
            out.set(slot, snap.get(slot));
        }
        out
    }
}

pub trait SettingsStore: Send + Sync {
    fn load(&self) -> EnforceResult<SlotSettings>;
    fn save(&self, settings: &SlotSettings) -> EnforceResult<()>;
}

/// JSON file store. A missing file loads as all-unbound.
#[derive(Clone, Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> EnforceResult<Map<String, Json>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Json>(&raw)? {
            Json::Object(obj) => Ok(obj),
            _ => Err(EnforceError::InvalidArgument("settings file must hold a json object")),
        }
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self) -> EnforceResult<SlotSettings> {
        SlotSettings::from_json(&self.read_object()?)
    }

    fn save(&self, settings: &SlotSettings) -> EnforceResult<()> {
        let mut obj = self.read_object()?;
        settings.write_into(&mut obj);

        // write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Json::Object(obj))?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "slot settings saved");
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettings {
    inner: Mutex<SlotSettings>,
}

impl MemorySettings {
    pub fn new(initial: SlotSettings) -> Self {
        Self { inner: Mutex::new(initial) }
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> EnforceResult<SlotSettings> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, settings: &SlotSettings) -> EnforceResult<()> {
        *self.inner.lock() = settings.clone();
        Ok(())
    }
}
