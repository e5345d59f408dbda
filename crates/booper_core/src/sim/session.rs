use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::content::{AxisRange, Bounds, ContentBundle, SpeciesCatalog, SpeciesId, Zone, ZoneRegistry};
use crate::math::Vec3;

use super::events::{EventBus, SimEvent, SimEventCounts};
use super::interaction::{
    AimEvent, InteractionDetector, InteractionOutcome, InteractionTuning, RaycastFilter,
};
use super::ledger::{Completion, DiscoveryLedger};
use super::movement::{MovementAi, MovementTuning};
use super::population::{CreatureId, CreaturePopulation};

const MOVEMENT_RNG_STREAM: u64 = 1;

/// Volume the player viewpoint may occupy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaBounds(pub Bounds);

impl Default for ArenaBounds {
    fn default() -> Self {
        Self(Bounds {
            x: AxisRange::new(-125.0, 125.0),
            y: AxisRange::new(-75.0, 75.0),
            z: AxisRange::new(-125.0, 125.0),
        })
    }
}

impl ArenaBounds {
    pub fn clamp(&self, point: Vec3) -> Vec3 {
        self.0.clamp(point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub seed: u64,
    pub interaction: InteractionTuning,
    pub movement: MovementTuning,
    pub arena: ArenaBounds,
    /// HUD "in range" threshold for the proximity query.
    pub proximity_range: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            interaction: InteractionTuning::default(),
            movement: MovementTuning::default(),
            arena: ArenaBounds::default(),
            proximity_range: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionLogEntry {
    pub timestamp_ms: u64,
    pub common_name: String,
    pub habitat: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub successes: u32,
    pub cooldown_blocks: u32,
    pub misses: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    pub creature: CreatureId,
    pub species: SpeciesId,
    pub distance: f32,
    pub in_range: bool,
}

/// Everything that changes during a session. Owned by [`SessionController`].
#[derive(Debug)]
pub struct SimulationState {
    zones: ZoneRegistry,
    species: SpeciesCatalog,
    population: CreaturePopulation,
    ledger: DiscoveryLedger,
    movement_rng: ChaCha8Rng,
    events: EventBus,
    session_log: Vec<SessionLogEntry>,
    stats: SessionStats,
}

/// Single writer for the simulation. Both rendering backends drive the same
/// controller: ticks from their frame loop, aims from their input layer.
#[derive(Debug)]
pub struct SessionController {
    config: SessionConfig,
    movement: MovementAi,
    detector: InteractionDetector,
    state: SimulationState,
}

impl SessionController {
    pub fn new(config: SessionConfig, content: ContentBundle) -> Self {
        Self::with_ledger(config, content, DiscoveryLedger::new())
    }

    /// Starts a session with a restored ledger and spawns the population.
    pub fn with_ledger(
        config: SessionConfig,
        content: ContentBundle,
        ledger: DiscoveryLedger,
    ) -> Self {
        let mut spawn_rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut movement_rng = ChaCha8Rng::seed_from_u64(config.seed);
        movement_rng.set_stream(MOVEMENT_RNG_STREAM);

        let population = CreaturePopulation::spawn(&content.species, &content.zones, &mut spawn_rng);
        let instance_count = population.len();
        info!(
            seed = config.seed,
            instance_count,
            species_count = content.species.len(),
            zone_count = content.zones.len(),
            "spawn_completed"
        );

        let mut events = EventBus::default();
        events.emit(SimEvent::SpawnCompleted { instance_count });

        Self {
            config,
            movement: MovementAi::new(config.movement),
            detector: InteractionDetector::new(config.interaction),
            state: SimulationState {
                zones: content.zones,
                species: content.species,
                population,
                ledger,
                movement_rng,
                events,
                session_log: Vec::new(),
                stats: SessionStats::default(),
            },
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tick(&mut self, dt: f32) {
        let state = &mut self.state;
        self.movement
            .tick(&mut state.population, &state.species, dt, &mut state.movement_rng);
    }

    pub fn handle_aim(&mut self, aim: AimEvent) -> InteractionOutcome {
        let origin = self.config.arena.clamp(aim.origin);
        let state = &mut self.state;
        let outcome = self.detector.resolve(
            &mut state.population,
            &state.species,
            origin,
            aim.aim_direction,
            aim.timestamp_ms,
        );
        self.apply_outcome(outcome, aim.timestamp_ms);
        outcome
    }

    /// Same as [`Self::handle_aim`] with a backend-provided raycast narrowing
    /// the candidates first.
    pub fn handle_aim_with_filter(
        &mut self,
        aim: AimEvent,
        filter: &dyn RaycastFilter,
    ) -> InteractionOutcome {
        let origin = self.config.arena.clamp(aim.origin);
        let state = &mut self.state;
        let outcome = self.detector.resolve_with_filter(
            &mut state.population,
            &state.species,
            origin,
            aim.aim_direction,
            aim.timestamp_ms,
            filter,
        );
        self.apply_outcome(outcome, aim.timestamp_ms);
        outcome
    }

    fn apply_outcome(&mut self, outcome: InteractionOutcome, timestamp_ms: u64) {
        let state = &mut self.state;
        state
            .events
            .emit(SimEvent::InteractionResolved(outcome));
        match outcome {
            InteractionOutcome::Success(target) => {
                state.stats.successes = state.stats.successes.saturating_add(1);
                let Some(species) = state.species.species(target.species) else {
                    return;
                };
                let new_count = state.ledger.record(&species.key);
                let new_score = state.ledger.award_point();
                info!(
                    species = %species.key,
                    creature = target.creature.0,
                    distance = target.distance,
                    new_count,
                    new_score,
                    "creature_booped"
                );
                state.events.emit(SimEvent::LedgerChanged {
                    species_key: species.key.clone(),
                    new_count,
                });
                state.events.emit(SimEvent::ScoreChanged { new_score });
                state.session_log.push(SessionLogEntry {
                    timestamp_ms,
                    common_name: species.common_name.clone(),
                    habitat: species.habitat.clone(),
                    position: target.position.rounded(),
                });
            }
            InteractionOutcome::Blocked(target, reason) => {
                state.stats.cooldown_blocks = state.stats.cooldown_blocks.saturating_add(1);
                debug!(creature = target.creature.0, reason = ?reason, "boop_blocked");
            }
            InteractionOutcome::Miss => {
                state.stats.misses = state.stats.misses.saturating_add(1);
                debug!("boop_missed");
            }
        }
    }

    /// Nearest creature to `point` regardless of aim, for the HUD distance
    /// indicator.
    pub fn nearest_creature(&self, point: Vec3) -> Option<Proximity> {
        let mut nearest: Option<Proximity> = None;
        for instance in self.state.population.instances() {
            let distance = instance.position().distance(point);
            if nearest.map_or(true, |current| distance < current.distance) {
                nearest = Some(Proximity {
                    creature: instance.id(),
                    species: instance.species(),
                    distance,
                    in_range: distance < self.config.proximity_range,
                });
            }
        }
        nearest
    }

    pub fn player_zone(&self, point: Vec3) -> Option<&Zone> {
        self.state.zones.zone_containing(self.config.arena.clamp(point))
    }

    pub fn clamp_viewpoint(&self, point: Vec3) -> Vec3 {
        self.config.arena.clamp(point)
    }

    /// Hosts drain once per frame. Undrained events beyond
    /// `MAX_PENDING_EVENTS` are discarded oldest first.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.state.events.drain()
    }

    pub fn event_counts(&self) -> SimEventCounts {
        self.state.events.emitted_counts()
    }

    pub fn population(&self) -> &CreaturePopulation {
        &self.state.population
    }

    pub fn zones(&self) -> &ZoneRegistry {
        &self.state.zones
    }

    pub fn species(&self) -> &SpeciesCatalog {
        &self.state.species
    }

    pub fn ledger(&self) -> &DiscoveryLedger {
        &self.state.ledger
    }

    pub fn completion(&self) -> Completion {
        self.state.ledger.completion(&self.state.species)
    }

    pub fn session_log(&self) -> &[SessionLogEntry] {
        &self.state.session_log
    }

    pub fn stats(&self) -> SessionStats {
        self.state.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::load_content_from_str;

    const ZONES_JSON: &str = r##"{
        "default_zone": "open_ocean",
        "habitats": [
            {
                "id": "reef",
                "label": "Reef",
                "bounds": { "x": [0, 10], "y": [0, 5], "z": [0, 10] },
                "fog_color": "#1e90ff",
                "ambient_color": "#87ceeb"
            },
            {
                "id": "open_ocean",
                "label": "Open Ocean",
                "bounds": { "x": [-125, 125], "y": [-75, 75], "z": [-125, 125] },
                "fog_color": "#00334d",
                "ambient_color": "#335577"
            }
        ]
    }"##;

    const SPECIES_JSON: &str = r##"{
        "creatures": [
            {
                "id": "clownfish",
                "common_name": "Clownfish",
                "habitat": "reef",
                "rarity": "common",
                "speed_mps": 1.0,
                "min_depth_m": 70,
                "max_depth_m": 75
            }
        ]
    }"##;

    fn controller() -> SessionController {
        let content = load_content_from_str(ZONES_JSON, SPECIES_JSON).expect("content");
        SessionController::new(
            SessionConfig {
                seed: 7,
                ..SessionConfig::default()
            },
            content,
        )
    }

    fn aim_at_first_creature(controller: &SessionController, timestamp_ms: u64) -> AimEvent {
        let target = controller.population().instances()[0].position();
        let origin = target + Vec3::new(0.0, 0.0, -5.0);
        AimEvent {
            origin,
            aim_direction: target - origin,
            timestamp_ms,
        }
    }

    #[test]
    fn new_session_spawns_and_announces_it() {
        let mut controller = controller();
        let count = controller.population().len();
        assert!((4..=6).contains(&count));
        assert_eq!(
            controller.drain_events(),
            vec![SimEvent::SpawnCompleted {
                instance_count: count
            }]
        );
    }

    #[test]
    fn successful_boop_updates_ledger_score_log_and_events() {
        let mut controller = controller();
        controller.drain_events();
        let aim = aim_at_first_creature(&controller, 1_000);
        let outcome = controller.handle_aim(aim);
        assert!(matches!(outcome, InteractionOutcome::Success(_)));

        assert_eq!(controller.ledger().count("clownfish"), 1);
        assert_eq!(controller.ledger().total_score(), 1);
        assert_eq!(
            controller.completion(),
            Completion {
                discovered: 1,
                total: 1
            }
        );

        let events = controller.drain_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SimEvent::InteractionResolved(outcome));
        assert_eq!(
            events[1],
            SimEvent::LedgerChanged {
                species_key: "clownfish".to_string(),
                new_count: 1
            }
        );
        assert_eq!(events[2], SimEvent::ScoreChanged { new_score: 1 });

        let log = controller.session_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].timestamp_ms, 1_000);
        assert_eq!(log[0].common_name, "Clownfish");
        assert_eq!(log[0].habitat, "reef");
        assert_eq!(controller.stats().successes, 1);
    }

    #[test]
    fn blocked_and_missed_boops_only_emit_resolution() {
        let mut controller = controller();
        let aim = aim_at_first_creature(&controller, 0);
        controller.handle_aim(aim);
        controller.drain_events();

        let retry = AimEvent {
            timestamp_ms: 5_000,
            ..aim
        };
        let blocked = controller.handle_aim(retry);
        assert!(matches!(blocked, InteractionOutcome::Blocked(..)));

        let away = AimEvent {
            aim_direction: Vec3::new(0.0, 0.0, -1.0),
            origin: Vec3::new(-100.0, 0.0, -100.0),
            timestamp_ms: 6_000,
        };
        assert_eq!(controller.handle_aim(away), InteractionOutcome::Miss);

        let events = controller.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(controller.ledger().total_score(), 1);
        assert_eq!(
            controller.stats(),
            SessionStats {
                successes: 1,
                cooldown_blocks: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn tick_keeps_creatures_inside_their_zone() {
        let mut controller = controller();
        for _ in 0..600 {
            controller.tick(1.0 / 30.0);
        }
        let reef = controller.zones().zone_by_key("reef").expect("reef").bounds;
        for instance in controller.population().instances() {
            assert!(reef.contains(instance.position()));
        }
    }

    #[test]
    fn proximity_reports_nearest_creature_and_range() {
        let controller = controller();
        let near = controller
            .nearest_creature(Vec3::new(5.0, 2.5, 5.0))
            .expect("creature");
        assert!(near.in_range);
        let far = controller
            .nearest_creature(Vec3::new(120.0, 0.0, 120.0))
            .expect("creature");
        assert!(!far.in_range);
        assert!(far.distance > near.distance);
    }

    #[test]
    fn player_zone_uses_clamped_viewpoint_and_default_zone() {
        let controller = controller();
        let reef = controller.player_zone(Vec3::new(5.0, 2.0, 5.0)).expect("zone");
        assert_eq!(reef.key, "reef");
        let outside = controller
            .player_zone(Vec3::new(900.0, 0.0, 0.0))
            .expect("zone");
        assert_eq!(outside.key, "open_ocean");
        assert_eq!(
            controller.clamp_viewpoint(Vec3::new(900.0, -200.0, 3.0)),
            Vec3::new(125.0, -75.0, 3.0)
        );
    }

    #[test]
    fn empty_content_session_always_misses() {
        let content = load_content_from_str(ZONES_JSON, r#"{ "creatures": [] }"#).expect("content");
        let mut controller = SessionController::new(SessionConfig::default(), content);
        assert!(controller.population().is_empty());
        let outcome = controller.handle_aim(AimEvent {
            origin: Vec3::ZERO,
            aim_direction: Vec3::new(0.0, 0.0, 1.0),
            timestamp_ms: 0,
        });
        assert_eq!(outcome, InteractionOutcome::Miss);
        assert!(controller.nearest_creature(Vec3::ZERO).is_none());
    }

    #[test]
    fn restored_ledger_keeps_counting() {
        let content = load_content_from_str(ZONES_JSON, SPECIES_JSON).expect("content");
        let mut ledger = DiscoveryLedger::new();
        ledger.record("clownfish");
        ledger.award_point();
        let mut controller = SessionController::with_ledger(SessionConfig::default(), content, ledger);
        let aim = aim_at_first_creature(&controller, 0);
        controller.handle_aim(aim);
        assert_eq!(controller.ledger().count("clownfish"), 2);
        assert_eq!(controller.ledger().total_score(), 2);
    }
}
