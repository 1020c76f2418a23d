use clap::Parser;
use uuid::Uuid;

#[derive(Parser, Debug, Clone)]
#[command(name = "vp-enforcerd", about = "Voice platform watched-member enforcer")]
pub struct Config {
    /// JSON settings file holding slot bindings, channels and grants
    #[arg(long, env = "VP_ENFORCER_SETTINGS", default_value = "enforcer.json")]
    pub settings: String,

    /// Base URL of the member API, e.g. https://voice.example/api
    #[arg(long, env = "VP_API_BASE")]
    pub api_base: String,

    /// Identity the enforcer acts as (permission checks run against it)
    #[arg(long, env = "VP_ACTOR_USER_ID")]
    pub actor_user_id: Uuid,

    /// Environment variable read for the auth token on every request
    #[arg(long, default_value = "VP_TOKEN")]
    pub token_env: String,

    /// Per-request timeout for member PATCH calls
    #[arg(long, default_value_t = 10_000)]
    pub http_timeout_ms: u64,

    /// Prometheus listener, e.g. 127.0.0.1:9105 (disabled if unset)
    #[arg(long)]
    pub metrics_listen: Option<String>,

    #[arg(long, default_value = "vp")]
    pub metrics_namespace: String,
}
