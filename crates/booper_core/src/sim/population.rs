use rand::Rng;
use tracing::{debug, warn};

use crate::content::{Bounds, Species, SpeciesCatalog, SpeciesId, Zone, ZoneId, ZoneRegistry};
use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId(pub u32);

/// One live creature. Fields are read through accessors; only the
/// simulation systems inside this crate mutate them.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatureInstance {
    id: CreatureId,
    species: SpeciesId,
    zone: ZoneId,
    placement: Bounds,
    position: Vec3,
    velocity: Vec3,
    target_position: Vec3,
    facing: Vec3,
    idle_timer: f32,
    last_boop_ms: Option<u64>,
}

impl CreatureInstance {
    pub fn id(&self) -> CreatureId {
        self.id
    }

    pub fn species(&self) -> SpeciesId {
        self.species
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    /// Volume the instance is confined to: its zone, narrowed vertically to
    /// the species' preferred depth band when the two overlap.
    pub fn placement(&self) -> Bounds {
        self.placement
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn target_position(&self) -> Vec3 {
        self.target_position
    }

    /// Unit heading for the renderer; only refreshed while the creature moves.
    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    pub fn idle_timer(&self) -> f32 {
        self.idle_timer
    }

    pub fn last_boop_ms(&self) -> Option<u64> {
        self.last_boop_ms
    }

    pub(crate) fn set_kinematics(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
    }

    pub(crate) fn set_target(&mut self, target: Vec3) {
        self.target_position = target;
    }

    pub(crate) fn set_facing(&mut self, facing: Vec3) {
        self.facing = facing;
    }

    pub(crate) fn set_idle_timer(&mut self, idle_timer: f32) {
        self.idle_timer = idle_timer;
    }

    pub(crate) fn mark_booped(&mut self, now_ms: u64) {
        self.last_boop_ms = Some(now_ms);
    }
}

pub fn placement_volume(zone: &Zone, species: &Species) -> Bounds {
    zone.bounds.with_y_band(species.preferred_y_band())
}

#[derive(Debug, Clone, Default)]
pub struct CreaturePopulation {
    instances: Vec<CreatureInstance>,
}

impl CreaturePopulation {
    /// Places every species of the catalog into the registry's zones. The
    /// output depends only on the catalog, the registry and the RNG stream.
    pub fn spawn<R: Rng + ?Sized>(
        catalog: &SpeciesCatalog,
        zones: &ZoneRegistry,
        rng: &mut R,
    ) -> CreaturePopulation {
        let mut population = CreaturePopulation::default();
        for species in catalog.iter() {
            let count = species.rarity.sample_spawn_count(rng);
            match zones.zone_by_key(&species.habitat) {
                Some(zone) => {
                    for _ in 0..count {
                        population.place(species, zone, rng);
                    }
                }
                None => warn!(
                    species = %species.key,
                    habitat = %species.habitat,
                    "spawn_skipped_missing_zone"
                ),
            }

            for rule in &species.supplemental_spawns {
                let extra = rule.amount.sample(rng);
                let Some(zone) = zones.zone_by_key(&rule.target_zone) else {
                    warn!(
                        species = %species.key,
                        zone = %rule.target_zone,
                        "supplemental_spawn_skipped_missing_zone"
                    );
                    continue;
                };
                for _ in 0..extra {
                    population.place(species, zone, rng);
                }
            }
            debug!(
                species = %species.key,
                instance_count = population.count_for_species(species.id),
                "species_spawned"
            );
        }
        population
    }

    fn place<R: Rng + ?Sized>(&mut self, species: &Species, zone: &Zone, rng: &mut R) {
        let placement = placement_volume(zone, species);
        let position = placement.sample(rng);
        let id = CreatureId(self.instances.len() as u32);
        self.instances.push(CreatureInstance {
            id,
            species: species.id,
            zone: zone.id,
            placement,
            position,
            velocity: Vec3::ZERO,
            target_position: position,
            facing: Vec3::new(1.0, 0.0, 0.0),
            idle_timer: 0.0,
            last_boop_ms: None,
        });
    }

    pub fn instances(&self) -> &[CreatureInstance] {
        &self.instances
    }

    pub fn get(&self, id: CreatureId) -> Option<&CreatureInstance> {
        self.instances.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn count_for_species(&self, species: SpeciesId) -> usize {
        self.instances
            .iter()
            .filter(|instance| instance.species == species)
            .count()
    }

    pub fn count_in_zone(&self, zone: ZoneId) -> usize {
        self.instances
            .iter()
            .filter(|instance| instance.zone == zone)
            .count()
    }

    pub(crate) fn get_mut(&mut self, id: CreatureId) -> Option<&mut CreatureInstance> {
        self.instances.get_mut(id.0 as usize)
    }

    pub(crate) fn instances_mut(&mut self) -> &mut [CreatureInstance] {
        &mut self.instances
    }

    #[cfg(test)]
    pub(crate) fn from_instances_for_test(instances: Vec<CreatureInstance>) -> Self {
        Self { instances }
    }
}

#[cfg(test)]
pub(crate) fn test_instance(
    id: u32,
    species: SpeciesId,
    zone: ZoneId,
    placement: Bounds,
    position: Vec3,
) -> CreatureInstance {
    CreatureInstance {
        id: CreatureId(id),
        species,
        zone,
        placement,
        position,
        velocity: Vec3::ZERO,
        target_position: position,
        facing: Vec3::new(1.0, 0.0, 0.0),
        idle_timer: 0.0,
        last_boop_ms: None,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::content::{
        load_content_from_str, ContentBundle, SpeciesRecord, SpeciesResource, SpawnRuleRecord,
        ZoneRecord, ZoneResource, BoundsRecord,
    };

    fn zone_record(id: &str, x: [f32; 2], y: [f32; 2], z: [f32; 2]) -> ZoneRecord {
        ZoneRecord {
            id: Some(id.to_string()),
            label: Some(id.to_string()),
            bounds: Some(BoundsRecord { x, y, z }),
            fog_color: Some("#003366".to_string()),
            ambient_color: Some("#336699".to_string()),
            typical_depth_range: None,
        }
    }

    fn species_record(id: &str, habitat: &str, rarity: &str, depth: [f32; 2]) -> SpeciesRecord {
        SpeciesRecord {
            id: Some(id.to_string()),
            common_name: Some(id.to_string()),
            habitat: Some(habitat.to_string()),
            rarity: Some(rarity.to_string()),
            speed_mps: Some(2.0),
            min_depth_m: Some(depth[0]),
            max_depth_m: Some(depth[1]),
            ..SpeciesRecord::default()
        }
    }

    fn bundle(zones: Vec<ZoneRecord>, default_zone: &str, species: Vec<SpeciesRecord>) -> ContentBundle {
        let (zones, _) = ZoneRegistry::from_resource(ZoneResource {
            default_zone: default_zone.to_string(),
            habitats: zones,
        })
        .expect("zones");
        let (species, _) = SpeciesCatalog::from_resource(SpeciesResource { creatures: species });
        ContentBundle {
            zones,
            species,
            ..ContentBundle::default()
        }
    }

    #[test]
    fn common_species_in_reef_spawns_inside_zone() {
        // Depth 70..75 maps to y 0..5, fully inside the reef band.
        let content = bundle(
            vec![zone_record("reef", [0.0, 10.0], [0.0, 5.0], [0.0, 10.0])],
            "reef",
            vec![species_record("clownfish", "reef", "common", [70.0, 75.0])],
        );
        for seed in 0..32 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let population = CreaturePopulation::spawn(&content.species, &content.zones, &mut rng);
            assert!((4..=6).contains(&population.len()), "seed {seed}");
            for instance in population.instances() {
                let p = instance.position();
                assert!((0.0..=10.0).contains(&p.x));
                assert!((0.0..=10.0).contains(&p.z));
                assert!((0.0..=5.0).contains(&p.y));
            }
        }
    }

    #[test]
    fn y_is_limited_to_the_species_band_inside_the_zone() {
        let content = bundle(
            vec![zone_record("column", [0.0, 10.0], [-75.0, 75.0], [0.0, 10.0])],
            "column",
            vec![species_record("lanternfish", "column", "common", [100.0, 120.0])],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let population = CreaturePopulation::spawn(&content.species, &content.zones, &mut rng);
        for instance in population.instances() {
            let y = instance.position().y;
            assert!((-45.0..=-25.0).contains(&y), "y={y}");
        }
    }

    #[test]
    fn disjoint_depth_band_clamps_to_zone_band() {
        let content = bundle(
            vec![zone_record("shallows", [0.0, 10.0], [60.0, 75.0], [0.0, 10.0])],
            "shallows",
            vec![species_record("abyss_fish", "shallows", "rare", [1000.0, 2000.0])],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let population = CreaturePopulation::spawn(&content.species, &content.zones, &mut rng);
        assert_eq!(population.len(), 1);
        let instance = &population.instances()[0];
        assert!((60.0..=75.0).contains(&instance.position().y));
        assert_eq!(instance.placement().y.min, 60.0);
        assert_eq!(instance.placement().y.max, 75.0);
    }

    #[test]
    fn missing_home_zone_skips_only_that_species() {
        let content = bundle(
            vec![zone_record("reef", [0.0, 10.0], [0.0, 75.0], [0.0, 10.0])],
            "reef",
            vec![
                species_record("lost", "atlantis", "rare", [0.0, 10.0]),
                species_record("grouper", "reef", "rare", [0.0, 10.0]),
            ],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let population = CreaturePopulation::spawn(&content.species, &content.zones, &mut rng);
        assert_eq!(population.len(), 1);
        let grouper = content.species.species_by_key("grouper").expect("grouper");
        assert_eq!(population.instances()[0].species(), grouper.id);
    }

    #[test]
    fn supplemental_rules_add_instances_in_other_zones() {
        let mut jelly = species_record("moon_jelly", "reef", "rare", [0.0, 20.0]);
        jelly.supplemental_spawns = vec![
            SpawnRuleRecord {
                zone: Some("ocean".to_string()),
                count: Some(2),
                ..SpawnRuleRecord::default()
            },
            SpawnRuleRecord {
                zone: Some("kelp".to_string()),
                chance: Some(1.0),
                ..SpawnRuleRecord::default()
            },
            SpawnRuleRecord {
                zone: Some("trench".to_string()),
                count: Some(3),
                ..SpawnRuleRecord::default()
            },
        ];
        let content = bundle(
            vec![
                zone_record("reef", [0.0, 10.0], [0.0, 75.0], [0.0, 10.0]),
                zone_record("ocean", [20.0, 40.0], [0.0, 75.0], [20.0, 40.0]),
                zone_record("kelp", [-40.0, -20.0], [0.0, 75.0], [-40.0, -20.0]),
            ],
            "ocean",
            vec![jelly],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let population = CreaturePopulation::spawn(&content.species, &content.zones, &mut rng);
        let reef = content.zones.zone_id_by_key("reef").expect("reef");
        let ocean = content.zones.zone_id_by_key("ocean").expect("ocean");
        let kelp = content.zones.zone_id_by_key("kelp").expect("kelp");
        assert_eq!(population.count_in_zone(reef), 1);
        assert_eq!(population.count_in_zone(ocean), 2);
        assert_eq!(population.count_in_zone(kelp), 1);
        assert_eq!(population.len(), 4);
        for instance in population.instances() {
            let zone = content.zones.zone(instance.zone()).expect("zone");
            assert!(zone.bounds.contains(instance.position()));
        }
    }

    #[test]
    fn range_rule_adds_between_min_and_max_without_touching_primary_count() {
        let zones = vec![
            zone_record("reef", [0.0, 10.0], [0.0, 75.0], [0.0, 10.0]),
            zone_record("ocean", [20.0, 40.0], [0.0, 75.0], [20.0, 40.0]),
        ];
        let home_only = bundle(
            zones.clone(),
            "ocean",
            vec![species_record("green_turtle", "reef", "uncommon", [0.0, 20.0])],
        );
        let mut turtle = species_record("green_turtle", "reef", "uncommon", [0.0, 20.0]);
        turtle.supplemental_spawns = vec![SpawnRuleRecord {
            zone: Some("ocean".to_string()),
            min: Some(1),
            max: Some(2),
            ..SpawnRuleRecord::default()
        }];
        let content = bundle(zones, "ocean", vec![turtle]);
        let reef = content.zones.zone_id_by_key("reef").expect("reef");
        let ocean = content.zones.zone_id_by_key("ocean").expect("ocean");

        let mut extras_seen = Vec::new();
        for seed in 0..64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let population = CreaturePopulation::spawn(&content.species, &content.zones, &mut rng);
            let mut baseline_rng = ChaCha8Rng::seed_from_u64(seed);
            let baseline =
                CreaturePopulation::spawn(&home_only.species, &home_only.zones, &mut baseline_rng);

            let primary = population.count_in_zone(reef);
            let extra = population.count_in_zone(ocean);
            assert!((3..=4).contains(&primary), "seed {seed}");
            assert_eq!(primary, baseline.len(), "seed {seed}");
            assert!((1..=2).contains(&extra), "seed {seed} extra {extra}");
            assert_eq!(population.len(), primary + extra);
            if !extras_seen.contains(&extra) {
                extras_seen.push(extra);
            }
        }
        extras_seen.sort_unstable();
        assert_eq!(extras_seen, vec![1, 2]);
    }

    #[test]
    fn same_seed_reproduces_the_same_population() {
        let content = load_content_from_str(
            include_str!("../../../../assets/habitats.json"),
            include_str!("../../../../assets/creatures.json"),
        )
        .expect("bundled content");
        let mut first_rng = ChaCha8Rng::seed_from_u64(42);
        let mut second_rng = ChaCha8Rng::seed_from_u64(42);
        let first = CreaturePopulation::spawn(&content.species, &content.zones, &mut first_rng);
        let second = CreaturePopulation::spawn(&content.species, &content.zones, &mut second_rng);
        assert!(!first.is_empty());
        assert_eq!(first.instances(), second.instances());
    }
}
