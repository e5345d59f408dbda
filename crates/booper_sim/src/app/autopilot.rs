use std::time::Duration;

use booper_core::sim::SphereRaycast;
use booper_core::{
    aim_from_screen, world_to_screen, AimEvent, Camera2D, InteractionOutcome, SessionController,
    Vec3, Viewport,
};

use super::loop_runner::RenderMode;

const DIVER_SPEED_MPS: f32 = 6.0;
const BOOP_STANDOFF: f32 = 8.0;

/// Scripted player for headless runs. Swims to the nearest creature that is
/// off cooldown and pulls the trigger on a fixed interval, through the input
/// path of the selected backend.
#[derive(Debug)]
pub(crate) struct Diver {
    position: Vec3,
    mode: RenderMode,
    viewport: Viewport,
    boop_interval_ms: u64,
    next_boop_ms: u64,
    ray: SphereRaycast,
}

impl Diver {
    pub(crate) fn new(
        mode: RenderMode,
        viewport: Viewport,
        boop_interval: Duration,
        start: Vec3,
    ) -> Self {
        Self {
            position: start,
            mode,
            viewport,
            boop_interval_ms: u64::try_from(boop_interval.as_millis()).unwrap_or(u64::MAX),
            next_boop_ms: 0,
            ray: SphereRaycast::default(),
        }
    }

    pub(crate) fn position(&self) -> Vec3 {
        self.position
    }

    pub(crate) fn steer(&mut self, controller: &SessionController, dt: f32, now_ms: u64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let Some(target) = self.pick_target(controller, now_ms) else {
            return;
        };
        // Hold position level with the target, a standoff away horizontally.
        let away = Vec3::new(self.position.x - target.x, 0.0, self.position.z - target.z)
            .try_normalize()
            .unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        let desired = target + away * BOOP_STANDOFF;
        let offset = desired - self.position;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }
        let step = distance.min(DIVER_SPEED_MPS * dt);
        self.position = controller.clamp_viewpoint(self.position + offset * (step / distance));
    }

    pub(crate) fn maybe_boop(
        &mut self,
        controller: &mut SessionController,
        now_ms: u64,
    ) -> Option<InteractionOutcome> {
        if now_ms < self.next_boop_ms {
            return None;
        }
        let target = self.pick_target(controller, now_ms)?;
        self.next_boop_ms = now_ms.saturating_add(self.boop_interval_ms);

        let outcome = match self.mode {
            RenderMode::ThreeD => controller.handle_aim_with_filter(
                AimEvent {
                    origin: self.position,
                    aim_direction: target - self.position,
                    timestamp_ms: now_ms,
                },
                &self.ray,
            ),
            RenderMode::TwoD => {
                let camera = Camera2D::centered_on(self.position);
                let click = world_to_screen(target, &camera, self.viewport);
                controller.handle_aim(aim_from_screen(
                    click,
                    &camera,
                    self.viewport,
                    self.position,
                    now_ms,
                ))
            }
        };
        Some(outcome)
    }

    fn pick_target(&self, controller: &SessionController, now_ms: u64) -> Option<Vec3> {
        let cooldown_ms = controller.config().interaction.cooldown_ms;
        controller
            .population()
            .instances()
            .iter()
            .filter(|instance| {
                instance
                    .last_boop_ms()
                    .map_or(true, |last| now_ms.saturating_sub(last) >= cooldown_ms)
            })
            .map(|instance| instance.position())
            .min_by(|a, b| {
                a.distance(self.position)
                    .total_cmp(&b.distance(self.position))
            })
    }
}
