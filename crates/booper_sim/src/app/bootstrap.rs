use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use booper_core::SessionConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::loop_runner::{LoopConfig, RenderMode};

const SEED_ENV_VAR: &str = "BOOPER_SEED";
const TPS_ENV_VAR: &str = "BOOPER_TPS";
const SIM_SECONDS_ENV_VAR: &str = "BOOPER_SIM_SECONDS";
const RENDER_MODE_ENV_VAR: &str = "BOOPER_RENDER_MODE";
const BOOP_INTERVAL_ENV_VAR: &str = "BOOPER_BOOP_INTERVAL_MS";
const MAX_TICKS_ENV_VAR: &str = "BOOPER_MAX_TICKS_PER_FRAME";
const PERSIST_ENV_VAR: &str = "BOOPER_PERSIST_LEDGER";

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) session_config: SessionConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Reef Booper Startup ===");

    let session_config = SessionConfig {
        seed: env_or(SEED_ENV_VAR, SessionConfig::default().seed),
        ..SessionConfig::default()
    };
    let defaults = LoopConfig::default();
    let loop_config = LoopConfig {
        target_tps: env_or(TPS_ENV_VAR, defaults.target_tps),
        max_ticks_per_frame: env_or(MAX_TICKS_ENV_VAR, defaults.max_ticks_per_frame),
        simulated_seconds: env_or(SIM_SECONDS_ENV_VAR, defaults.simulated_seconds),
        render_mode: env_or(RENDER_MODE_ENV_VAR, defaults.render_mode),
        boop_interval: Duration::from_millis(env_or(
            BOOP_INTERVAL_ENV_VAR,
            defaults.boop_interval.as_millis() as u64,
        )),
        persist_ledger: env_or(PERSIST_ENV_VAR, defaults.persist_ledger),
        ..defaults
    };

    AppWiring {
        loop_config,
        session_config,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn env_or<T>(var: &'static str, fallback: T) -> T
where
    T: FromStr + Display,
{
    match env::var(var) {
        Ok(value) => parse_override(var, &value, fallback),
        Err(env::VarError::NotPresent) => fallback,
        Err(error) => {
            warn!(env_var = var, error = %error, "env_var_unreadable; using default");
            fallback
        }
    }
}

fn parse_override<T>(var: &'static str, value: &str, fallback: T) -> T
where
    T: FromStr + Display,
{
    match value.trim().parse::<T>() {
        Ok(parsed) => {
            info!(env_var = var, value = %parsed, "config_override");
            parsed
        }
        Err(_) => {
            warn!(
                env_var = var,
                value,
                fallback = %fallback,
                "invalid env var value; falling back to default"
            );
            fallback
        }
    }
}
