mod config;
mod host;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use vp_enforce::{
    ChannelDirectory, DispatchOutcome, Dispatcher, EnforceMetrics, EnforcementEngine, EnvCredential, HttpTransport,
    HttpTransportConfig, JsonFileSettings, PermissionTable, SettingsStore, TargetRegistry,
    TracingSink, UserId,
};

use crate::host::{Host, HostSettings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = Config::parse();

    // Metrics
    if let Some(listen) = cfg.metrics_listen.as_deref() {
        let addr: SocketAddr = listen.parse().context("metrics listen addr")?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("install prometheus exporter")?;
        info!("metrics on {}", addr);
    }
    let metrics = EnforceMetrics::new(cfg.metrics_namespace.clone());

    // Settings: slot bindings plus directory/grant data
    let settings_path = Path::new(&cfg.settings);
    let store = Arc::new(JsonFileSettings::new(settings_path));
    let slots = store.load().context("load slot settings")?;
    let host_settings = HostSettings::load(settings_path)?;

    let directory = Arc::new(ChannelDirectory::from_channels(host_settings.channels));
    let perms = Arc::new(PermissionTable::new(directory.clone()));
    for g in &host_settings.grants {
        perms.apply(g);
    }
    for admin in host_settings.admins {
        perms.grant_admin(admin);
    }

    let transport = HttpTransport::new(HttpTransportConfig {
        api_base: cfg.api_base.clone(),
        timeout: Duration::from_millis(cfg.http_timeout_ms),
    })
    .context("build http transport")?;

    let dispatcher = Dispatcher::new(
        Arc::new(EnvCredential::new(&cfg.token_env)),
        Arc::new(transport),
        Arc::new(TracingSink),
    )
    .with_metrics(metrics.clone());

    let actor = UserId(cfg.actor_user_id);
    let registry = TargetRegistry::from_settings(&slots);
    let engine = EnforcementEngine::new(actor, registry, directory, perms, dispatcher)
        .with_metrics(metrics);
    let host = Host::new(engine, store);

    info!(actor = %actor, settings = %settings_path.display(), "enforcer started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("read stdin")? {
                    Some(l) => match host.handle_line(&l) {
                        Ok(in_flight) => {
                            pending.retain(|h: &JoinHandle<DispatchOutcome>| !h.is_finished());
                            pending.extend(in_flight.into_iter().map(|f| f.handle));
                        }
                        Err(e) => warn!("host command error: {:#}", e),
                    },
                    None => {
                        info!(pending = pending.len(), "event source closed");
                        // let requests already on the wire report before exit
                        for h in pending.drain(..) {
                            let _ = h.await;
                        }
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown");
                break;
            }
        }
    }

    Ok(())
}
