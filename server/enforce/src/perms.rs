use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{directory::Directory, ChannelId, ServerId, UserId};

/// Capabilities the oracle is asked about. Voice enforcement gates on moving
/// members only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    MoveMembers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    Deny,
}

/// Yes/no capability check for an acting identity in a channel.
pub trait PermissionOracle: Send + Sync {
    fn decide(&self, actor: UserId, channel: ChannelId, cap: Capability) -> PermissionDecision;

    fn can(&self, actor: UserId, channel: ChannelId, cap: Capability) -> bool {
        self.decide(actor, channel, cap) == PermissionDecision::Allow
    }
}

/// Grant entry as written in host configuration. Exactly one of `channel_id` or
/// `server_id` scopes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub user_id: UserId,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub server_id: Option<ServerId>,
    pub capabilities: Vec<Capability>,
}

#[derive(Default)]
struct Grants {
    admins: HashSet<UserId>,
    channel: HashMap<(UserId, ChannelId), HashSet<Capability>>,
    server: HashMap<(UserId, ServerId), HashSet<Capability>>,
}

/// In-memory oracle. Server-scoped grants apply to every channel the directory
/// places in that server; admins pass every check.
pub struct PermissionTable {
    directory: Arc<dyn Directory>,
    grants: RwLock<Grants>,
}

impl PermissionTable {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory, grants: RwLock::new(Grants::default()) }
    }

    pub fn grant_admin(&self, user: UserId) {
        self.grants.write().admins.insert(user);
    }

    pub fn grant_channel(&self, user: UserId, channel: ChannelId, cap: Capability) {
        self.grants.write().channel.entry((user, channel)).or_default().insert(cap);
    }

    pub fn grant_server(&self, user: UserId, server: ServerId, cap: Capability) {
        self.grants.write().server.entry((user, server)).or_default().insert(cap);
    }

    pub fn revoke_channel(&self, user: UserId, channel: ChannelId, cap: Capability) {
        if let Some(caps) = self.grants.write().channel.get_mut(&(user, channel)) {
            caps.remove(&cap);
        }
    }

    pub fn revoke_server(&self, user: UserId, server: ServerId, cap: Capability) {
        if let Some(caps) = self.grants.write().server.get_mut(&(user, server)) {
            caps.remove(&cap);
        }
    }

    pub fn apply(&self, grant: &Grant) {
        for &cap in &grant.capabilities {
            if let Some(ch) = grant.channel_id {
                self.grant_channel(grant.user_id, ch, cap);
            }
            if let Some(srv) = grant.server_id {
                self.grant_server(grant.user_id, srv, cap);
            }
        }
    }
}

impl PermissionOracle for PermissionTable {
    fn decide(&self, actor: UserId, channel: ChannelId, cap: Capability) -> PermissionDecision {
        let g = self.grants.read();
        if g.admins.contains(&actor) {
            return PermissionDecision::Allow;
        }
        if g.channel.get(&(actor, channel)).is_some_and(|caps| caps.contains(&cap)) {
            return PermissionDecision::Allow;
        }
        let server_grant = self
            .directory
            .resolve_server(channel)
            .and_then(|srv| g.server.get(&(actor, srv)))
            .is_some_and(|caps| caps.contains(&cap));
        if server_grant {
            PermissionDecision::Allow
        } else {
            PermissionDecision::Deny
        }
    }
}
