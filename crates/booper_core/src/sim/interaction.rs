use std::cmp::Ordering;

use crate::content::{SpeciesCatalog, SpeciesId};
use crate::math::Vec3;

use super::population::{CreatureId, CreaturePopulation};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionTuning {
    pub cooldown_ms: u64,
    /// Alignment above which the long range applies.
    pub aimed_alignment: f32,
    pub aimed_max_distance: f32,
    /// Alignment above which the short range applies; below it nothing is
    /// eligible.
    pub loose_alignment: f32,
    pub loose_max_distance: f32,
}

impl Default for InteractionTuning {
    fn default() -> Self {
        Self {
            cooldown_ms: 10_000,
            aimed_alignment: 0.7,
            aimed_max_distance: 25.0,
            loose_alignment: 0.3,
            loose_max_distance: 15.0,
        }
    }
}

impl InteractionTuning {
    pub fn max_distance_for(&self, alignment: f32) -> Option<f32> {
        if alignment > self.aimed_alignment {
            Some(self.aimed_max_distance)
        } else if alignment > self.loose_alignment {
            Some(self.loose_max_distance)
        } else {
            None
        }
    }
}

/// A trigger pull from any input layer: pointer lock, tap, click, or a 2-D
/// screen point projected into the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimEvent {
    pub origin: Vec3,
    pub aim_direction: Vec3,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoopTarget {
    pub creature: CreatureId,
    pub species: SpeciesId,
    pub position: Vec3,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Cooldown { remaining_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionOutcome {
    Success(BoopTarget),
    Blocked(BoopTarget, BlockReason),
    Miss,
}

/// Optional geometric pre-pass for backends that can cast a ray against what
/// they render. It only narrows the candidates; eligibility, selection and
/// cooldown still come from [`InteractionDetector`].
pub trait RaycastFilter {
    fn candidates(
        &self,
        origin: Vec3,
        direction: Vec3,
        population: &CreaturePopulation,
        catalog: &SpeciesCatalog,
    ) -> Vec<CreatureId>;
}

/// Ray against a bounding sphere per creature, sized from the species'
/// average length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereRaycast {
    pub far: f32,
    pub min_radius: f32,
}

impl Default for SphereRaycast {
    fn default() -> Self {
        Self {
            far: 30.0,
            min_radius: 0.5,
        }
    }
}

impl RaycastFilter for SphereRaycast {
    fn candidates(
        &self,
        origin: Vec3,
        direction: Vec3,
        population: &CreaturePopulation,
        catalog: &SpeciesCatalog,
    ) -> Vec<CreatureId> {
        let Some(direction) = direction.try_normalize() else {
            return Vec::new();
        };
        population
            .instances()
            .iter()
            .filter(|instance| {
                let radius = catalog
                    .species(instance.species())
                    .map(|species| species.avg_length_m * 0.5)
                    .unwrap_or(0.0)
                    .max(self.min_radius);
                let to_center = instance.position() - origin;
                let along = to_center.dot(direction);
                if along < -radius || along - radius > self.far {
                    return false;
                }
                let closest_sq = to_center.length_squared() - along * along;
                closest_sq <= radius * radius
            })
            .map(|instance| instance.id())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionDetector {
    tuning: InteractionTuning,
}

impl InteractionDetector {
    pub fn new(tuning: InteractionTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> InteractionTuning {
        self.tuning
    }

    /// Resolves a boop with the distance + alignment heuristic alone.
    pub fn resolve(
        &self,
        population: &mut CreaturePopulation,
        catalog: &SpeciesCatalog,
        origin: Vec3,
        aim_direction: Vec3,
        now_ms: u64,
    ) -> InteractionOutcome {
        let target = self.select_target(population, catalog, origin, aim_direction, None);
        self.apply_cooldown(population, target, now_ms)
    }

    /// Resolves a boop after narrowing candidates with `filter`. When no
    /// filtered candidate is eligible the full heuristic set is used, so a
    /// precise ray never does worse than the pointer-free path.
    pub fn resolve_with_filter(
        &self,
        population: &mut CreaturePopulation,
        catalog: &SpeciesCatalog,
        origin: Vec3,
        aim_direction: Vec3,
        now_ms: u64,
        filter: &dyn RaycastFilter,
    ) -> InteractionOutcome {
        let candidates = filter.candidates(origin, aim_direction, population, catalog);
        let target = self
            .select_target(population, catalog, origin, aim_direction, Some(&candidates))
            .or_else(|| self.select_target(population, catalog, origin, aim_direction, None));
        self.apply_cooldown(population, target, now_ms)
    }

    /// Nearest eligible creature, ties broken by species key then creature id.
    /// Pure: cooldowns are not consulted.
    pub fn select_target(
        &self,
        population: &CreaturePopulation,
        catalog: &SpeciesCatalog,
        origin: Vec3,
        aim_direction: Vec3,
        candidates: Option<&[CreatureId]>,
    ) -> Option<BoopTarget> {
        if !origin.is_finite() {
            return None;
        }
        let aim = aim_direction.try_normalize()?;
        let species_key = |species: SpeciesId| catalog.species(species).map(|s| s.key.as_str());

        let mut best: Option<BoopTarget> = None;
        for instance in population.instances() {
            if let Some(candidates) = candidates {
                if !candidates.contains(&instance.id()) {
                    continue;
                }
            }
            let offset = instance.position() - origin;
            let distance = offset.length();
            let alignment = match offset.try_normalize() {
                Some(to_creature) => aim.dot(to_creature),
                None => 1.0,
            };
            let Some(max_distance) = self.tuning.max_distance_for(alignment) else {
                continue;
            };
            if distance >= max_distance {
                continue;
            }

            let candidate = BoopTarget {
                creature: instance.id(),
                species: instance.species(),
                position: instance.position(),
                distance,
            };
            let replace = match &best {
                None => true,
                Some(current) => {
                    let ordering = candidate
                        .distance
                        .partial_cmp(&current.distance)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| species_key(candidate.species).cmp(&species_key(current.species)))
                        .then_with(|| candidate.creature.cmp(&current.creature));
                    ordering == Ordering::Less
                }
            };
            if replace {
                best = Some(candidate);
            }
        }
        best
    }

    fn apply_cooldown(
        &self,
        population: &mut CreaturePopulation,
        target: Option<BoopTarget>,
        now_ms: u64,
    ) -> InteractionOutcome {
        let Some(target) = target else {
            return InteractionOutcome::Miss;
        };
        let Some(instance) = population.get_mut(target.creature) else {
            return InteractionOutcome::Miss;
        };
        if let Some(last_boop_ms) = instance.last_boop_ms() {
            let elapsed = now_ms.saturating_sub(last_boop_ms);
            if elapsed < self.tuning.cooldown_ms {
                return InteractionOutcome::Blocked(
                    target,
                    BlockReason::Cooldown {
                        remaining_ms: self.tuning.cooldown_ms - elapsed,
                    },
                );
            }
        }
        instance.mark_booped(now_ms);
        InteractionOutcome::Success(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{AxisRange, Bounds, SpeciesRecord, SpeciesResource, ZoneId};
    use crate::sim::population::test_instance;

    fn catalog() -> SpeciesCatalog {
        let record = |id: &str| SpeciesRecord {
            id: Some(id.to_string()),
            common_name: Some(id.to_string()),
            habitat: Some("ocean".to_string()),
            rarity: Some("common".to_string()),
            avg_length_m: Some(2.0),
            min_depth_m: Some(0.0),
            max_depth_m: Some(500.0),
            ..SpeciesRecord::default()
        };
        SpeciesCatalog::from_resource(SpeciesResource {
            creatures: vec![record("zebra_fish"), record("angelfish")],
        })
        .0
    }

    fn arena() -> Bounds {
        Bounds {
            x: AxisRange::new(-100.0, 100.0),
            y: AxisRange::new(-100.0, 100.0),
            z: AxisRange::new(-100.0, 100.0),
        }
    }

    fn population(creatures: &[(SpeciesId, Vec3)]) -> CreaturePopulation {
        CreaturePopulation::from_instances_for_test(
            creatures
                .iter()
                .enumerate()
                .map(|(idx, (species, position))| {
                    test_instance(idx as u32, *species, ZoneId(0), arena(), *position)
                })
                .collect(),
        )
    }

    const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    #[test]
    fn aimed_creature_within_long_range_is_booped() {
        let catalog = catalog();
        let mut population = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 20.0))]);
        let outcome =
            InteractionDetector::default().resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 0);
        let InteractionOutcome::Success(target) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(target.creature, CreatureId(0));
        assert!((target.distance - 20.0).abs() < 1e-4);
        assert_eq!(population.instances()[0].last_boop_ms(), Some(0));
    }

    #[test]
    fn creature_off_to_the_side_is_a_miss() {
        let catalog = catalog();
        let mut population = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 20.0))]);
        let outcome = InteractionDetector::default().resolve(
            &mut population,
            &catalog,
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            0,
        );
        assert_eq!(outcome, InteractionOutcome::Miss);
        assert_eq!(population.instances()[0].last_boop_ms(), None);
    }

    #[test]
    fn loose_alignment_uses_short_range() {
        let detector = InteractionDetector::default();
        // alignment 0.5: within 15 only.
        let aim = Vec3::new(0.866_025_4, 0.0, 0.5);
        let catalog = catalog();
        let mut far = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 20.0))]);
        assert_eq!(
            detector.resolve(&mut far, &catalog, Vec3::ZERO, aim, 0),
            InteractionOutcome::Miss
        );
        let mut near = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 12.0))]);
        assert!(matches!(
            detector.resolve(&mut near, &catalog, Vec3::ZERO, aim, 0),
            InteractionOutcome::Success(_)
        ));
    }

    #[test]
    fn range_limit_is_exclusive() {
        let catalog = catalog();
        let mut population = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 25.0))]);
        assert_eq!(
            InteractionDetector::default().resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 0),
            InteractionOutcome::Miss
        );
    }

    #[test]
    fn nearest_eligible_creature_wins() {
        let catalog = catalog();
        let mut population = population(&[
            (SpeciesId(0), Vec3::new(0.0, 0.0, 18.0)),
            (SpeciesId(1), Vec3::new(0.0, 1.0, 9.0)),
            (SpeciesId(1), Vec3::new(0.0, 0.0, -3.0)),
        ]);
        let outcome =
            InteractionDetector::default().resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 0);
        let InteractionOutcome::Success(target) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(target.creature, CreatureId(1));
    }

    #[test]
    fn equal_distances_break_ties_by_species_key() {
        let catalog = catalog();
        // zebra_fish registered first, angelfish sorts first.
        let mut population = population(&[
            (SpeciesId(0), Vec3::new(0.0, 0.0, 10.0)),
            (SpeciesId(1), Vec3::new(0.0, 0.0, 10.0)),
        ]);
        let outcome =
            InteractionDetector::default().resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 0);
        let InteractionOutcome::Success(target) = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(target.species, SpeciesId(1));
    }

    #[test]
    fn cooldown_blocks_until_ten_seconds_have_elapsed() {
        let catalog = catalog();
        let detector = InteractionDetector::default();
        let mut population = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 20.0))]);
        assert!(matches!(
            detector.resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 0),
            InteractionOutcome::Success(_)
        ));
        let blocked = detector.resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 5_000);
        let InteractionOutcome::Blocked(target, reason) = blocked else {
            panic!("expected cooldown block, got {blocked:?}");
        };
        assert_eq!(target.creature, CreatureId(0));
        assert_eq!(reason, BlockReason::Cooldown { remaining_ms: 5_000 });
        assert_eq!(population.instances()[0].last_boop_ms(), Some(0));

        assert!(matches!(
            detector.resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 9_999),
            InteractionOutcome::Blocked(..)
        ));
        assert!(matches!(
            detector.resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 10_000),
            InteractionOutcome::Success(_)
        ));
        assert_eq!(population.instances()[0].last_boop_ms(), Some(10_000));
    }

    #[test]
    fn blocked_nearest_creature_does_not_fall_through_to_the_next() {
        let catalog = catalog();
        let detector = InteractionDetector::default();
        let mut population = population(&[
            (SpeciesId(0), Vec3::new(0.0, 0.0, 5.0)),
            (SpeciesId(1), Vec3::new(0.0, 0.0, 15.0)),
        ]);
        detector.resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 0);
        let outcome = detector.resolve(&mut population, &catalog, Vec3::ZERO, FORWARD, 1_000);
        assert!(matches!(
            outcome,
            InteractionOutcome::Blocked(BoopTarget { creature: CreatureId(0), .. }, _)
        ));
        assert_eq!(population.instances()[1].last_boop_ms(), None);
    }

    #[test]
    fn empty_population_and_zero_aim_are_misses() {
        let catalog = catalog();
        let detector = InteractionDetector::default();
        let mut empty = CreaturePopulation::default();
        assert_eq!(
            detector.resolve(&mut empty, &catalog, Vec3::ZERO, FORWARD, 0),
            InteractionOutcome::Miss
        );
        let mut population = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 5.0))]);
        assert_eq!(
            detector.resolve(&mut population, &catalog, Vec3::ZERO, Vec3::ZERO, 0),
            InteractionOutcome::Miss
        );
    }

    #[test]
    fn unnormalized_aim_is_accepted() {
        let catalog = catalog();
        let mut population = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 20.0))]);
        assert!(matches!(
            InteractionDetector::default().resolve(
                &mut population,
                &catalog,
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, 7.0),
                0
            ),
            InteractionOutcome::Success(_)
        ));
    }

    #[test]
    fn sphere_raycast_narrows_to_creatures_on_the_ray() {
        let catalog = catalog();
        let population = population(&[
            (SpeciesId(0), Vec3::new(0.5, 0.0, 20.0)),
            (SpeciesId(1), Vec3::new(4.0, 0.0, 10.0)),
            (SpeciesId(1), Vec3::new(0.0, 0.0, -10.0)),
        ]);
        let hits = SphereRaycast::default().candidates(Vec3::ZERO, FORWARD, &population, &catalog);
        assert_eq!(hits, vec![CreatureId(0)]);
    }

    #[test]
    fn raycast_prefilter_prefers_the_creature_under_the_crosshair() {
        let catalog = catalog();
        let detector = InteractionDetector::default();
        let mut population = population(&[
            (SpeciesId(0), Vec3::new(0.0, 0.0, 20.0)),
            (SpeciesId(1), Vec3::new(4.0, 0.0, 10.0)),
        ]);
        let outcome = detector.resolve_with_filter(
            &mut population,
            &catalog,
            Vec3::ZERO,
            FORWARD,
            0,
            &SphereRaycast::default(),
        );
        assert!(matches!(
            outcome,
            InteractionOutcome::Success(BoopTarget { creature: CreatureId(0), .. })
        ));
    }

    #[test]
    fn raycast_without_hits_falls_back_to_the_heuristic() {
        let catalog = catalog();
        let detector = InteractionDetector::default();
        let mut population = population(&[(SpeciesId(0), Vec3::new(5.0, 0.0, 12.0))]);
        let outcome = detector.resolve_with_filter(
            &mut population,
            &catalog,
            Vec3::ZERO,
            FORWARD,
            0,
            &SphereRaycast::default(),
        );
        assert!(matches!(outcome, InteractionOutcome::Success(_)));
    }

    #[test]
    fn raycast_hit_on_cooldown_is_still_blocked() {
        let catalog = catalog();
        let detector = InteractionDetector::default();
        let mut population = population(&[(SpeciesId(0), Vec3::new(0.0, 0.0, 20.0))]);
        let ray = SphereRaycast::default();
        detector.resolve_with_filter(&mut population, &catalog, Vec3::ZERO, FORWARD, 0, &ray);
        assert!(matches!(
            detector.resolve_with_filter(&mut population, &catalog, Vec3::ZERO, FORWARD, 100, &ray),
            InteractionOutcome::Blocked(..)
        ));
    }
}
