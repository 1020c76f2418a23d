//! Outbound mutation calls.
//!
//! Every [`ActionRequest`] is attempted exactly once: fetch a credential, issue
//! one PATCH, map the response to a [`DispatchOutcome`], notify. There is no
//! retry or queueing; a failed request is terminal for that request only.

use async_trait::async_trait;
use std::{fmt, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    errors::TransportError,
    model::{ActionRequest, DispatchOutcome},
    notify::NotificationSink,
    telemetry::EnforceMetrics,
    ServerId, UserId,
};

/// Authorization value sent verbatim in the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

pub trait CredentialProvider: Send + Sync {
    fn current_token(&self) -> Option<Credential>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticCredential(pub Option<Credential>);

impl CredentialProvider for StaticCredential {
    fn current_token(&self) -> Option<Credential> {
        self.0.clone()
    }
}

/// Reads the token from an environment variable on every call, so a rotated
/// token is picked up without a restart.
#[derive(Clone, Debug)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredential {
    fn current_token(&self) -> Option<Credential> {
        std::env::var(&self.var)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Credential)
    }
}

/// Member PATCH. `Ok` carries the HTTP status of whatever response came back;
/// `Err` means no response at all.
#[async_trait]
pub trait MutationTransport: Send + Sync {
    async fn patch_member(&self, cred: &Credential, req: &ActionRequest) -> Result<u16, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    api_base: String,
}

impl HttpTransport {
    pub fn new(cfg: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
        Ok(Self { client, api_base: cfg.api_base.trim_end_matches('/').to_string() })
    }

    pub fn member_url(&self, server: ServerId, user: UserId) -> String {
        format!("{}/servers/{}/members/{}", self.api_base, server, user)
    }
}

#[async_trait]
impl MutationTransport for HttpTransport {
    async fn patch_member(&self, cred: &Credential, req: &ActionRequest) -> Result<u16, TransportError> {
        let resp = self
            .client
            .patch(self.member_url(req.server_id, req.user_id))
            .header(reqwest::header::AUTHORIZATION, cred.as_str())
            .json(&req.mutation.body())
            .send()
            .await?;
        Ok(resp.status().as_u16())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    credentials: Arc<dyn CredentialProvider>,
    transport: Arc<dyn MutationTransport>,
    sink: Arc<dyn NotificationSink>,
    metrics: EnforceMetrics,
}

impl Dispatcher {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        transport: Arc<dyn MutationTransport>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { credentials, transport, sink, metrics: EnforceMetrics::default() }
    }

    pub fn with_metrics(mut self, metrics: EnforceMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Runs one request to completion and reports it.
    pub async fn execute(&self, req: ActionRequest) -> DispatchOutcome {
        let outcome = self.attempt(&req).await;

        debug!(
            server_id = %req.server_id,
            user_id = %req.user_id,
            mutation = req.mutation.as_str(),
            outcome = outcome.as_str(),
            "dispatch finished"
        );
        self.metrics.outcome(&outcome);
        self.sink.notify(outcome.notification());
        outcome
    }

    /// Detached variant of [`execute`](Self::execute). Dropping the handle does
    /// not cancel the request.
    pub fn spawn(&self, req: ActionRequest) -> JoinHandle<DispatchOutcome> {
        self.metrics.dispatched(req.mutation);
        let this = self.clone();
        tokio::spawn(async move { this.execute(req).await })
    }

    async fn attempt(&self, req: &ActionRequest) -> DispatchOutcome {
        let Some(cred) = self.credentials.current_token() else {
            return DispatchOutcome::AuthUnavailable;
        };

        match self.transport.patch_member(&cred, req).await {
            Ok(status) if (200..300).contains(&status) => DispatchOutcome::Success(req.mutation),
            Ok(status) => DispatchOutcome::Rejected(status),
            Err(e) => {
                warn!(user_id = %req.user_id, mutation = req.mutation.as_str(), "member patch failed: {e}");
                DispatchOutcome::NetworkFailure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mutation, Notification, Severity};
    use parking_lot::Mutex;

    struct FixedTransport(Result<u16, ()>);

    #[async_trait]
    impl MutationTransport for FixedTransport {
        async fn patch_member(&self, _: &Credential, _: &ActionRequest) -> Result<u16, TransportError> {
            self.0.map_err(|_| TransportError::Request("connection reset".into()))
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<Notification>>);

    impl NotificationSink for Collect {
        fn notify(&self, n: Notification) {
            self.0.lock().push(n);
        }
    }

    fn req() -> ActionRequest {
        ActionRequest { server_id: ServerId::new(), user_id: UserId::new(), mutation: Mutation::SetDeafened }
    }

    fn dispatcher(token: Option<&str>, transport: FixedTransport) -> (Dispatcher, Arc<Collect>) {
        let sink = Arc::new(Collect::default());
        let d = Dispatcher::new(
            Arc::new(StaticCredential(token.map(Credential::new))),
            Arc::new(transport),
            sink.clone(),
        );
        (d, sink)
    }

    #[tokio::test]
    async fn success_on_2xx() {
        let (d, sink) = dispatcher(Some("tok"), FixedTransport(Ok(204)));
        assert_eq!(d.execute(req()).await, DispatchOutcome::Success(Mutation::SetDeafened));

        let seen = sink.0.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].severity, Severity::Success);
        assert_eq!(seen[0].message, "member deafened");
    }

    #[tokio::test]
    async fn rejected_carries_status() {
        let (d, sink) = dispatcher(Some("tok"), FixedTransport(Ok(403)));
        assert_eq!(d.execute(req()).await, DispatchOutcome::Rejected(403));
        assert_eq!(sink.0.lock()[0].message, "operation failed (403)");
    }

    #[tokio::test]
    async fn transport_error_is_network_failure() {
        let (d, sink) = dispatcher(Some("tok"), FixedTransport(Err(())));
        assert_eq!(d.execute(req()).await, DispatchOutcome::NetworkFailure);
        assert_eq!(sink.0.lock()[0].severity, Severity::Failure);
    }

    #[tokio::test]
    async fn missing_token_skips_transport() {
        // transport would succeed; the credential gate must stop it first
        let (d, sink) = dispatcher(None, FixedTransport(Ok(200)));
        assert_eq!(d.execute(req()).await, DispatchOutcome::AuthUnavailable);
        assert_eq!(sink.0.lock()[0].message, "auth token unavailable");
    }

    #[test]
    fn env_credential_ignores_blank() {
        let var = format!("VP_ENFORCE_TEST_TOKEN_{}", uuid::Uuid::new_v4().simple());
        let provider = EnvCredential::new(&var);
        assert_eq!(provider.current_token(), None);

        std::env::set_var(&var, "  ");
        assert_eq!(provider.current_token(), None);

        std::env::set_var(&var, "secret");
        assert_eq!(provider.current_token(), Some(Credential::new("secret")));
        std::env::remove_var(&var);
    }

    #[test]
    fn credential_debug_is_redacted() {
        assert_eq!(format!("{:?}", Credential::new("secret")), "Credential(<redacted>)");
    }

    #[test]
    fn member_url_strips_trailing_slash() {
        let t = HttpTransport::new(HttpTransportConfig {
            api_base: "https://voice.example/api/".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let (s, u) = (ServerId::new(), UserId::new());
        assert_eq!(t.member_url(s, u), format!("https://voice.example/api/servers/{s}/members/{u}"));
    }
}
