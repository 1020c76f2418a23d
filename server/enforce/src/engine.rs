use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::{
    directory::Directory,
    dispatch::Dispatcher,
    events::PresenceEvent,
    model::{ActionRequest, DispatchOutcome},
    perms::{Capability, PermissionOracle},
    registry::{SlotKind, TargetRegistry, TargetSnapshot},
    telemetry::{EnforceMetrics, SkipReason},
    ServerId, UserId,
};

/// A request that has been handed to the runtime. Dropping it leaves the
/// request running.
pub struct InFlight {
    pub request: ActionRequest,
    pub handle: JoinHandle<DispatchOutcome>,
}

/// Turns presence batches into member mutations for the watched identities.
///
/// The registry is read once per batch; the directory and permission oracle are
/// consulted per event. Dispatch never blocks the batch.
pub struct EnforcementEngine {
    actor: UserId,
    registry: TargetRegistry,
    directory: Arc<dyn Directory>,
    perms: Arc<dyn PermissionOracle>,
    dispatcher: Dispatcher,
    metrics: EnforceMetrics,
}

impl EnforcementEngine {
    pub fn new(
        actor: UserId,
        registry: TargetRegistry,
        directory: Arc<dyn Directory>,
        perms: Arc<dyn PermissionOracle>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self { actor, registry, directory, perms, dispatcher, metrics: EnforceMetrics::default() }
    }

    pub fn with_metrics(mut self, metrics: EnforceMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    /// Handles one batch in order. Must be called from within a tokio runtime.
    pub fn on_presence_batch(&self, events: &[PresenceEvent]) -> Vec<InFlight> {
        self.metrics.events(events.len() as u64);

        // gate runs for every event, bound or not
        let snap = self.registry.snapshot();
        let mut out = Vec::new();
        for ev in events {
            let requests = match self.plan(&snap, ev) {
                Ok(r) => r,
                Err(reason) => {
                    trace!(user_id = %ev.user_id, reason = reason.as_str(), "event skipped");
                    self.metrics.skipped(reason);
                    continue;
                }
            };
            for request in requests {
                debug!(
                    server_id = %request.server_id,
                    user_id = %request.user_id,
                    mutation = request.mutation.as_str(),
                    "enforcing"
                );
                let handle = self.dispatcher.spawn(request);
                out.push(InFlight { request, handle });
            }
        }
        out
    }

    fn plan(&self, snap: &TargetSnapshot, ev: &PresenceEvent) -> Result<Vec<ActionRequest>, SkipReason> {
        let server_id = self.gate(ev)?;
        Ok(SlotKind::ALL
            .into_iter()
            .filter(|&slot| snap.is_bound_to(slot, ev.user_id) && triggers(slot, ev))
            .map(|slot| ActionRequest { server_id, user_id: ev.user_id, mutation: slot.mutation() })
            .collect())
    }

    fn gate(&self, ev: &PresenceEvent) -> Result<ServerId, SkipReason> {
        let channel = ev.channel_id.ok_or(SkipReason::Unresolvable)?;
        let server = self.directory.resolve_server(channel).ok_or(SkipReason::Unresolvable)?;
        if !self.perms.can(self.actor, channel, Capability::MoveMembers) {
            return Err(SkipReason::PermissionDenied);
        }
        Ok(server)
    }
}

fn triggers(slot: SlotKind, ev: &PresenceEvent) -> bool {
    match slot {
        SlotKind::Disconnect => ev.channel_id.is_some(),
        SlotKind::Mute => ev.mute == Some(false),
        SlotKind::Deafen => ev.deaf == Some(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_conditions() {
        let u = UserId::new();
        let left = PresenceEvent::new(u);
        let joined = PresenceEvent::new(u).in_channel(crate::ChannelId::new());

        assert!(!triggers(SlotKind::Disconnect, &left));
        assert!(triggers(SlotKind::Disconnect, &joined));

        assert!(triggers(SlotKind::Mute, &joined.clone().muted(false)));
        assert!(!triggers(SlotKind::Mute, &joined.clone().muted(true)));
        assert!(!triggers(SlotKind::Mute, &joined));

        assert!(triggers(SlotKind::Deafen, &joined.clone().deafened(false)));
        assert!(!triggers(SlotKind::Deafen, &joined.clone().deafened(true)));
        assert!(!triggers(SlotKind::Deafen, &joined));
    }

    use crate::{
        directory::{Channel, ChannelDirectory},
        dispatch::{Credential, MutationTransport, StaticCredential},
        errors::TransportError,
        notify::TracingSink,
        perms::PermissionDecision,
        ChannelId,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Unreachable;

    #[async_trait::async_trait]
    impl MutationTransport for Unreachable {
        async fn patch_member(&self, _: &Credential, _: &ActionRequest) -> Result<u16, TransportError> {
            Err(TransportError::Request("offline".into()))
        }
    }

    /// Fixed answer; counts how often it is asked.
    struct CountingOracle {
        allow: bool,
        calls: AtomicUsize,
    }

    impl PermissionOracle for CountingOracle {
        fn decide(&self, _: UserId, _: ChannelId, _: Capability) -> PermissionDecision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.allow { PermissionDecision::Allow } else { PermissionDecision::Deny }
        }
    }

    fn engine(allow: bool) -> (EnforcementEngine, Arc<CountingOracle>, ChannelId) {
        let channel = ChannelId::new();
        let dir = Arc::new(ChannelDirectory::from_channels([Channel {
            id: channel,
            server_id: ServerId::new(),
            name: "ops".into(),
        }]));
        let oracle = Arc::new(CountingOracle { allow, calls: AtomicUsize::new(0) });
        let dispatcher = Dispatcher::new(
            Arc::new(StaticCredential(None)),
            Arc::new(Unreachable),
            Arc::new(TracingSink),
        );
        let engine = EnforcementEngine::new(UserId::new(), TargetRegistry::new(), dir, oracle.clone(), dispatcher);
        (engine, oracle, channel)
    }

    #[test]
    fn gate_runs_with_no_slot_bound() {
        let (engine, oracle, channel) = engine(true);
        let events = [
            PresenceEvent::new(UserId::new()).in_channel(channel),
            PresenceEvent::new(UserId::new()).in_channel(channel).muted(false),
            PresenceEvent::new(UserId::new()),
        ];

        assert!(engine.on_presence_batch(&events).is_empty());
        // the channel-less event stops at the directory
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn plan_reports_skip_reason() {
        let (engine, _, channel) = engine(false);
        let u = UserId::new();
        engine.registry().bind(SlotKind::Disconnect, u);
        let snap = engine.registry().snapshot();

        assert_eq!(
            engine.plan(&snap, &PresenceEvent::new(u).in_channel(channel)),
            Err(SkipReason::PermissionDenied)
        );
        assert_eq!(
            engine.plan(&snap, &PresenceEvent::new(u).in_channel(ChannelId::new())),
            Err(SkipReason::Unresolvable)
        );
    }
}
