use serde::{Deserialize, Serialize};

use crate::{ChannelId, UserId};

/// One voice-state change as delivered by the event source.
///
/// `channel_id == None` means the user left voice entirely. `mute`/`deaf` are
/// only present when the source observed a state for them; `Some(false)` is an
/// explicit unmute/undeafen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: UserId,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub old_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub mute: Option<bool>,
    #[serde(default)]
    pub deaf: Option<bool>,
}

impl PresenceEvent {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, channel_id: None, old_channel_id: None, mute: None, deaf: None }
    }

    pub fn in_channel(mut self, channel_id: ChannelId) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn moved_from(mut self, old_channel_id: ChannelId) -> Self {
        self.old_channel_id = Some(old_channel_id);
        self
    }

    pub fn muted(mut self, mute: bool) -> Self {
        self.mute = Some(mute);
        self
    }

    pub fn deafened(mut self, deaf: bool) -> Self {
        self.deaf = Some(deaf);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_deserialize_as_none() {
        let user = UserId::new();
        let ev: PresenceEvent = serde_json::from_value(json!({ "user_id": user })).unwrap();
        assert_eq!(ev, PresenceEvent::new(user));
    }

    #[test]
    fn null_channel_means_left_voice() {
        let user = UserId::new();
        let old = ChannelId::new();
        let ev: PresenceEvent = serde_json::from_value(json!({
            "user_id": user,
            "channel_id": null,
            "old_channel_id": old,
            "mute": false,
        }))
        .unwrap();
        assert_eq!(ev.channel_id, None);
        assert_eq!(ev.old_channel_id, Some(old));
        assert_eq!(ev.mute, Some(false));
        assert_eq!(ev.deaf, None);
    }
}
