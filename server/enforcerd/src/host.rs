use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};
use tracing::{info, warn};

use vp_enforce::{
    Channel, EnforcementEngine, Grant, InFlight, PresenceEvent, SettingsStore, SlotKind, UserId,
};

/// Directory and permission data kept beside the slot keys in the settings file.
#[derive(Debug, Default, Deserialize)]
pub struct HostSettings {
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub grants: Vec<Grant>,
    #[serde(default)]
    pub admins: Vec<UserId>,
}

impl HostSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
    }
}

/// One stdin line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    VoiceStateUpdates { voice_states: Vec<PresenceEvent> },
    Bind { slot: SlotKind, user_id: UserId },
    Status,
}

pub struct Host {
    engine: EnforcementEngine,
    store: Arc<dyn SettingsStore>,
}

impl Host {
    pub fn new(engine: EnforcementEngine, store: Arc<dyn SettingsStore>) -> Self {
        Self { engine, store }
    }

    pub fn handle_line(&self, line: &str) -> Result<Vec<InFlight>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Vec::new());
        }
        let cmd: HostCommand = serde_json::from_str(line).context("parse host command")?;
        self.handle(cmd)
    }

    pub fn handle(&self, cmd: HostCommand) -> Result<Vec<InFlight>> {
        match cmd {
            HostCommand::VoiceStateUpdates { voice_states } => {
                Ok(self.engine.on_presence_batch(&voice_states))
            }
            HostCommand::Bind { slot, user_id } => {
                self.bind(slot, user_id)?;
                Ok(Vec::new())
            }
            HostCommand::Status => {
                let snap = self.engine.registry().snapshot();
                for slot in SlotKind::ALL {
                    match snap.get(slot) {
                        Some(u) => info!(slot = slot.label(), user_id = %u, "bound"),
                        None => info!(slot = slot.label(), "unbound"),
                    }
                }
                Ok(Vec::new())
            }
        }
    }

    fn bind(&self, slot: SlotKind, user: UserId) -> Result<()> {
        if user == self.engine.actor() {
            warn!(slot = slot.label(), "refusing to watch the acting identity");
            return Ok(());
        }

        let registry = self.engine.registry();
        registry
            .bind_persisted(&*self.store, slot, user)
            .context("persist slot settings")?;

        let labels: Vec<String> = registry.entries_for(user).iter().map(|e| e.display()).collect();
        info!(user_id = %user, slots = ?labels, "slot toggled");
        Ok(())
    }
}
