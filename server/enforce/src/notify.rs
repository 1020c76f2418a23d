use tracing::{info, warn};

use crate::model::{Notification, Severity};

/// Fire-and-forget operator feedback.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, n: Notification);
}

#[derive(Clone, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Success => info!(at = %n.at, "{}", n.message),
            Severity::Failure => warn!(at = %n.at, "{}", n.message),
        }
    }
}
