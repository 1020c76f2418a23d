use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};

use crate::ids::{ServerId, UserId};

/// Member mutation issued against a server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    ForceChannelNull,
    SetMuted,
    SetDeafened,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::ForceChannelNull => "force_channel_null",
            Mutation::SetMuted => "set_muted",
            Mutation::SetDeafened => "set_deafened",
        }
    }

    /// PATCH body for the member endpoint.
    pub fn body(&self) -> Json {
        match self {
            Mutation::ForceChannelNull => json!({ "channel_id": null }),
            Mutation::SetMuted => json!({ "mute": true }),
            Mutation::SetDeafened => json!({ "deaf": true }),
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Mutation::ForceChannelNull => "member disconnected from voice",
            Mutation::SetMuted => "member muted",
            Mutation::SetDeafened => "member deafened",
        }
    }
}

/// Outbound intent produced by a fired trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRequest {
    pub server_id: ServerId,
    pub user_id: UserId,
    pub mutation: Mutation,
}

/// Terminal result of one dispatch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success(Mutation),
    AuthUnavailable,
    Rejected(u16),
    NetworkFailure,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Success(_) => "success",
            DispatchOutcome::AuthUnavailable => "auth_unavailable",
            DispatchOutcome::Rejected(_) => "rejected",
            DispatchOutcome::NetworkFailure => "network_failure",
        }
    }

    pub fn notification(&self) -> Notification {
        match self {
            DispatchOutcome::Success(m) => Notification::success(m.success_message()),
            DispatchOutcome::AuthUnavailable => Notification::failure("auth token unavailable"),
            DispatchOutcome::Rejected(status) => {
                Notification::failure(format!("operation failed ({status})"))
            }
            DispatchOutcome::NetworkFailure => Notification::failure("network error"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Failure,
}

/// Operator-facing transient message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self { message: message.into(), severity, at: Utc::now() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Failure)
    }
}
