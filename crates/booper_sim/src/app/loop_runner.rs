use std::fmt;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use booper_core::sim::{
    load_ledger, save_ledger, Completion, LedgerSaveError, SessionStats, LEDGER_FILE_NAME,
};
use booper_core::{
    load_content, resolve_app_paths, Clock, ContentLoadError, DiscoveryLedger, InteractionOutcome,
    ManualClock, SessionController, SimEvent, StartupError, Vec3, Viewport,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::autopilot::Diver;
use super::bootstrap::AppWiring;

const DIVER_START: Vec3 = Vec3::new(0.0, 40.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderMode {
    ThreeD,
    TwoD,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "3d" => Ok(Self::ThreeD),
            "2d" => Ok(Self::TwoD),
            other => Err(format!("unknown render mode '{other}'")),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreeD => f.write_str("3d"),
            Self::TwoD => f.write_str("2d"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    /// Wall time each headless host frame pretends to take.
    pub(crate) host_frame_delta: Duration,
    pub(crate) max_frame_delta: Duration,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) simulated_seconds: f32,
    pub(crate) render_mode: RenderMode,
    pub(crate) boop_interval: Duration,
    pub(crate) viewport: Viewport,
    pub(crate) metrics_log_interval: Duration,
    pub(crate) persist_ledger: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            host_frame_delta: Duration::from_secs_f64(1.0 / 60.0),
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            simulated_seconds: 120.0,
            render_mode: RenderMode::ThreeD,
            boop_interval: Duration::from_millis(1_500),
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            metrics_log_interval: Duration::from_secs(10),
            persist_ledger: true,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load content: {0}")]
    Content(#[from] ContentLoadError),
    #[error(transparent)]
    Ledger(#[from] LedgerSaveError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SessionSummary {
    pub(crate) frames: u64,
    pub(crate) ticks: u64,
    pub(crate) stats: SessionStats,
    pub(crate) total_score: u64,
    pub(crate) completion: Completion,
    pub(crate) diver_position: Vec3,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_session(&app) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                ticks = summary.ticks,
                successes = summary.stats.successes,
                cooldown_blocks = summary.stats.cooldown_blocks,
                misses = summary.stats.misses,
                total_score = summary.total_score,
                discovered = summary.completion.discovered,
                species_total = summary.completion.total,
                "session_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "session_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_session(app: &AppWiring) -> Result<SessionSummary, RunError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        saves_dir = %app_paths.saves_dir.display(),
        "startup"
    );
    let content = load_content(&app_paths.assets_dir)?;

    let ledger_path = app_paths.saves_dir.join(LEDGER_FILE_NAME);
    let ledger = if app.loop_config.persist_ledger {
        load_ledger(&ledger_path)?.unwrap_or_default()
    } else {
        DiscoveryLedger::new()
    };

    let mut controller = SessionController::with_ledger(app.session_config, content, ledger);
    let clock = ManualClock::new(0);
    let summary = run_headless(&mut controller, &app.loop_config, &clock);

    if app.loop_config.persist_ledger {
        save_ledger(&ledger_path, controller.ledger())?;
    }
    Ok(summary)
}

/// Fixed-timestep loop over a simulated host frame stream. Time only moves
/// through `clock`, so a run is reproducible for a given seed and config.
pub(crate) fn run_headless(
    controller: &mut SessionController,
    config: &LoopConfig,
    clock: &ManualClock,
) -> SessionSummary {
    let target_tps = config.target_tps.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let host_frame_delta = normalize_non_zero_duration(config.host_frame_delta, fixed_dt);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(10));
    let total_duration = simulated_duration(config.simulated_seconds);

    info!(
        target_tps,
        host_frame_delta_ms = host_frame_delta.as_millis() as u64,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        simulated_ms = total_duration.as_millis() as u64,
        render_mode = %config.render_mode,
        "loop_config"
    );

    let start_ms = clock.now_ms();
    let mut diver = Diver::new(
        config.render_mode,
        config.viewport,
        config.boop_interval,
        controller.clamp_viewpoint(DIVER_START),
    );
    let mut accumulator = Duration::ZERO;
    let mut elapsed = Duration::ZERO;
    let mut next_metrics_at = metrics_log_interval;
    let mut frames = 0u64;
    let mut ticks = 0u64;

    for event in controller.drain_events() {
        log_event(&event);
    }

    while elapsed < total_duration {
        let frame_dt = host_frame_delta;
        elapsed = elapsed.saturating_add(frame_dt);
        let target_ms = start_ms.saturating_add(elapsed.as_millis() as u64);
        clock.advance_ms(target_ms.saturating_sub(clock.now_ms()));

        accumulator = accumulator.saturating_add(clamp_frame_delta(frame_dt, max_frame_delta));
        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            diver.steer(controller, fixed_dt_seconds, clock.now_ms());
            controller.tick(fixed_dt_seconds);
            ticks = ticks.saturating_add(1);
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        diver.maybe_boop(controller, clock.now_ms());
        for event in controller.drain_events() {
            log_event(&event);
        }
        frames = frames.saturating_add(1);

        if elapsed >= next_metrics_at {
            next_metrics_at = next_metrics_at.saturating_add(metrics_log_interval);
            let diver_position = diver.position();
            let zone = controller
                .player_zone(diver_position)
                .map(|zone| zone.label.as_str())
                .unwrap_or("unknown");
            let proximity = controller.nearest_creature(diver_position);
            let completion = controller.completion();
            info!(
                sim_seconds = elapsed.as_secs_f32(),
                ticks,
                zone,
                nearest_distance = proximity.map(|p| p.distance).unwrap_or(f32::INFINITY),
                in_range = proximity.map(|p| p.in_range).unwrap_or(false),
                total_score = controller.ledger().total_score(),
                discovered = completion.discovered,
                species_total = completion.total,
                "loop_metrics"
            );
        }
    }

    SessionSummary {
        frames,
        ticks,
        stats: controller.stats(),
        total_score: controller.ledger().total_score(),
        completion: controller.completion(),
        diver_position: diver.position(),
    }
}

fn log_event(event: &SimEvent) {
    match event {
        SimEvent::SpawnCompleted { instance_count } => {
            info!(instance_count, "population_ready");
        }
        SimEvent::InteractionResolved(InteractionOutcome::Success(target)) => {
            debug!(creature = target.creature.0, distance = target.distance, "boop_success");
        }
        SimEvent::InteractionResolved(outcome) => {
            debug!(outcome = ?outcome, "boop_unsuccessful");
        }
        SimEvent::LedgerChanged {
            species_key,
            new_count,
        } => {
            if *new_count == 1 {
                info!(species = %species_key, "species_discovered");
            }
        }
        SimEvent::ScoreChanged { new_score } => {
            debug!(new_score, "score_changed");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn simulated_duration(seconds: f32) -> Duration {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO)
}
