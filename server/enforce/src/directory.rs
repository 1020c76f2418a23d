use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ChannelId, ServerId};

/// Resolves a voice channel to the server that owns it.
pub trait Directory: Send + Sync {
    fn resolve_server(&self, channel: ChannelId) -> Option<ServerId>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub server_id: ServerId,
    #[serde(default)]
    pub name: String,
}

#[derive(Default)]
pub struct ChannelDirectory {
    channels: RwLock<HashMap<ChannelId, Channel>>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        let dir = Self::new();
        for ch in channels {
            dir.insert(ch);
        }
        dir
    }

    pub fn insert(&self, ch: Channel) -> Option<Channel> {
        self.channels.write().insert(ch.id, ch)
    }

    pub fn remove(&self, id: ChannelId) -> Option<Channel> {
        self.channels.write().remove(&id)
    }

}

impl Directory for ChannelDirectory {
    fn resolve_server(&self, channel: ChannelId) -> Option<ServerId> {
        self.channels.read().get(&channel).map(|c| c.server_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_channels_only() {
        let server = ServerId::new();
        let ch = Channel { id: ChannelId::new(), server_id: server, name: "lobby".into() };
        let dir = ChannelDirectory::from_channels([ch.clone()]);

        assert_eq!(dir.resolve_server(ch.id), Some(server));
        assert_eq!(dir.resolve_server(ChannelId::new()), None);

        dir.remove(ch.id);
        assert_eq!(dir.resolve_server(ch.id), None);
    }
}
