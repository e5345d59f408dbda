use rand::Rng;

use crate::content::SpeciesCatalog;
use crate::math::Vec3;

use super::population::{CreatureInstance, CreaturePopulation};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementTuning {
    pub idle_min_seconds: f32,
    pub idle_max_seconds: f32,
    /// Rate of the exponential approach of velocity toward desired velocity.
    pub smoothing_rate: f32,
    pub arrival_radius: f32,
    pub facing_min_speed: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            idle_min_seconds: 3.0,
            idle_max_seconds: 8.0,
            smoothing_rate: 2.0,
            arrival_radius: 1.0,
            facing_min_speed: 0.1,
        }
    }
}

/// Idle/seek wander steering shared by every rendering backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementAi {
    tuning: MovementTuning,
}

impl MovementAi {
    pub fn new(tuning: MovementTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> MovementTuning {
        self.tuning
    }

    /// Advances every instance by `dt` seconds. Invalid `dt` is a no-op.
    pub fn tick<R: Rng + ?Sized>(
        &self,
        population: &mut CreaturePopulation,
        catalog: &SpeciesCatalog,
        dt: f32,
        rng: &mut R,
    ) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        for instance in population.instances_mut() {
            let Some(species) = catalog.species(instance.species()) else {
                continue;
            };
            self.step_instance(instance, species.speed_mps, dt, rng);
        }
    }

    fn step_instance<R: Rng + ?Sized>(
        &self,
        instance: &mut CreatureInstance,
        speed: f32,
        dt: f32,
        rng: &mut R,
    ) {
        let tuning = self.tuning;
        let placement = instance.placement();

        let mut idle_timer = instance.idle_timer() + dt;
        let threshold = if tuning.idle_max_seconds > tuning.idle_min_seconds {
            rng.gen_range(tuning.idle_min_seconds..tuning.idle_max_seconds)
        } else {
            tuning.idle_min_seconds
        };
        if idle_timer > threshold {
            idle_timer = 0.0;
            instance.set_target(placement.sample(rng));
        }
        instance.set_idle_timer(idle_timer);

        let position = instance.position();
        let to_target = instance.target_position() - position;
        let distance = to_target.length();
        let desired = if distance < tuning.arrival_radius {
            Vec3::ZERO
        } else {
            to_target * (speed / distance)
        };

        let blend = 1.0 - (-tuning.smoothing_rate * dt).exp();
        let mut velocity = instance.velocity().lerp(desired, blend);
        let unclamped = position + velocity * dt;
        let next = placement.clamp(unclamped);
        if next.x != unclamped.x {
            velocity.x = 0.0;
        }
        if next.y != unclamped.y {
            velocity.y = 0.0;
        }
        if next.z != unclamped.z {
            velocity.z = 0.0;
        }
        instance.set_kinematics(next, velocity);

        if velocity.length() > tuning.facing_min_speed {
            if let Some(facing) = velocity.try_normalize() {
                instance.set_facing(facing);
            }
        }
    }
}
