//! Top-down projection used by the 2-D backend. World x maps to screen x,
//! world z maps to screen y (down), and y (depth) is not drawn.

use crate::math::{Vec2, Vec3};
use crate::sim::AimEvent;

pub const PIXELS_PER_WORLD: f32 = 4.0;
pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;
pub const CAMERA_ZOOM_MIN: f32 = 0.25;
pub const CAMERA_ZOOM_MAX: f32 = 4.0;
pub const CAMERA_ZOOM_STEP: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    /// World (x, z) at the center of the viewport.
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            zoom: CAMERA_ZOOM_DEFAULT,
        }
    }
}

impl Camera2D {
    pub fn centered_on(world: Vec3) -> Self {
        Self {
            position: Vec2::new(world.x, world.z),
            ..Self::default()
        }
    }

    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_camera_zoom(zoom);
    }

    pub fn apply_zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let target_zoom = self.zoom + steps as f32 * CAMERA_ZOOM_STEP;
        self.set_zoom_clamped(target_zoom);
    }

    fn scale(&self) -> f32 {
        PIXELS_PER_WORLD * self.effective_zoom()
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

pub fn world_to_screen(world: Vec3, camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let scale = camera.scale();
    Vec2::new(
        (world.x - camera.position.x) * scale + viewport.width as f32 * 0.5,
        (world.z - camera.position.y) * scale + viewport.height as f32 * 0.5,
    )
}

pub fn world_to_screen_px(world: Vec3, camera: &Camera2D, viewport: Viewport) -> (i32, i32) {
    let screen = world_to_screen(world, camera, viewport);
    (screen.x.round() as i32, screen.y.round() as i32)
}

/// Inverse of [`world_to_screen`]; the returned point sits at `depth_y`.
pub fn screen_to_world(screen: Vec2, camera: &Camera2D, viewport: Viewport, depth_y: f32) -> Vec3 {
    let scale = camera.scale();
    Vec3::new(
        (screen.x - viewport.width as f32 * 0.5) / scale + camera.position.x,
        depth_y,
        (screen.y - viewport.height as f32 * 0.5) / scale + camera.position.y,
    )
}

/// A click on the map becomes an aim from the player toward the clicked point
/// at the player's own depth. Clicking on the player yields a zero aim, which
/// resolves as a miss.
pub fn aim_from_screen(
    screen: Vec2,
    camera: &Camera2D,
    viewport: Viewport,
    player_position: Vec3,
    timestamp_ms: u64,
) -> AimEvent {
    let clicked = screen_to_world(screen, camera, viewport, player_position.y);
    AimEvent {
        origin: player_position,
        aim_direction: clicked - player_position,
        timestamp_ms,
    }
}
