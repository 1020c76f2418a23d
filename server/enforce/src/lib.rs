pub mod directory;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ids;
pub mod model;
pub mod notify;
pub mod perms;
pub mod registry;
pub mod settings;
pub mod telemetry;

pub use directory::{Channel, ChannelDirectory, Directory};
pub use dispatch::{
    Credential, CredentialProvider, Dispatcher, EnvCredential, HttpTransport, HttpTransportConfig,
    MutationTransport, StaticCredential,
};
pub use engine::{EnforcementEngine, InFlight};
pub use errors::{EnforceError, EnforceResult, TransportError};
pub use events::PresenceEvent;
pub use ids::{ChannelId, ServerId, UserId};
pub use model::{ActionRequest, DispatchOutcome, Mutation, Notification, Severity};
pub use notify::{NotificationSink, TracingSink};
pub use perms::{Capability, Grant, PermissionDecision, PermissionOracle, PermissionTable};
pub use registry::{SlotEntry, SlotKind, TargetRegistry, TargetSnapshot};
pub use settings::{JsonFileSettings, MemorySettings, SettingsStore, SlotSettings};
pub use telemetry::{EnforceMetrics, SkipReason};
