use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use terrain::TerrainStats;

use super::ui::UiInputCaptureRes;

/// Point the camera orbits around.
#[derive(Component)]
pub struct Viewer;

#[derive(Component)]
pub struct OrbitCamera;

#[derive(Resource, Clone)]
pub struct OrbitCameraSettings {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub mouse_rotate_sensitivity: f32,
}

impl Default for OrbitCameraSettings {
    fn default() -> Self {
        Self {
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: 0.75,
            distance: 500.0,
            min_distance: 10.0,
            max_distance: 4000.0,
            min_pitch: 0.1,
            max_pitch: 1.5,
            rotate_speed: 1.2,
            zoom_speed: 0.12,
            mouse_rotate_sensitivity: 0.005,
        }
    }
}

pub fn setup_viewer(mut commands: Commands) {
    commands.spawn((Viewer, Transform::default()));
    commands.spawn((OrbitCamera, Camera3d::default(), Transform::default()));
}

/// Re-centres the orbit whenever a new terrain has been generated.
pub fn focus_on_terrain(
    stats: Res<TerrainStats>,
    mut settings: ResMut<OrbitCameraSettings>,
    mut q_focus: Query<&mut Transform, With<Viewer>>,
) {
    if !stats.is_changed() || stats.chunks == 0 {
        return;
    }
    let mut focus = match q_focus.single_mut() {
        Ok(t) => t,
        Err(_) => return,
    };

    let extent = stats.world_extent;
    focus.translation = Vec3::new(
        extent.x / 2.0,
        (stats.min_height + stats.max_height) / 2.0,
        extent.z / 2.0,
    );

    let radius = extent.x / 2.0 + extent.z / 2.0;
    settings.max_distance = radius * 4.0;
    settings.distance = radius.clamp(settings.min_distance, settings.max_distance);
}

pub fn orbit_camera_input(
    time: Res<Time>,
    keys: Res<ButtonInput<KeyCode>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut settings: ResMut<OrbitCameraSettings>,
    ui_capture: Res<UiInputCaptureRes>,
) {
    let dt = time.delta_secs();

    if !ui_capture.keyboard {
        if keys.pressed(KeyCode::KeyQ) || keys.pressed(KeyCode::ArrowLeft) {
            settings.yaw += settings.rotate_speed * dt;
        }
        if keys.pressed(KeyCode::KeyE) || keys.pressed(KeyCode::ArrowRight) {
            settings.yaw -= settings.rotate_speed * dt;
        }
        if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
            settings.pitch += settings.rotate_speed * dt;
        }
        if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
            settings.pitch -= settings.rotate_speed * dt;
        }
    }

    if !ui_capture.pointer {
        let mut scroll: f32 = 0.0;
        for ev in mouse_wheel.read() {
            scroll += ev.y;
        }
        if scroll.abs() > 0.0 {
            let factor = (1.0 - scroll * settings.zoom_speed).clamp(0.2, 5.0);
            settings.distance =
                (settings.distance * factor).clamp(settings.min_distance, settings.max_distance);
        }

        // Right drag orbits.
        let mut drag = Vec2::ZERO;
        for ev in mouse_motion.read() {
            drag += ev.delta;
        }
        if mouse_buttons.pressed(MouseButton::Right) {
            settings.yaw -= drag.x * settings.mouse_rotate_sensitivity;
            settings.pitch += drag.y * settings.mouse_rotate_sensitivity;
        }
    }

    settings.pitch = settings.pitch.clamp(settings.min_pitch, settings.max_pitch);
}

pub fn update_orbit_camera(
    settings: Res<OrbitCameraSettings>,
    q_focus: Query<&Transform, (With<Viewer>, Without<OrbitCamera>)>,
    mut q_cam: Query<&mut Transform, (With<OrbitCamera>, Without<Viewer>)>,
) {
    let focus = match q_focus.single() {
        Ok(v) => v.translation,
        Err(_) => return,
    };
    let mut cam = match q_cam.single_mut() {
        Ok(c) => c,
        Err(_) => return,
    };

    cam.translation = focus + orbit_offset(settings.yaw, settings.pitch, settings.distance);
    cam.look_at(focus, Vec3::Y);
}

/// Camera position relative to the focus for a yaw/pitch/distance orbit.
fn orbit_offset(yaw: f32, pitch: f32, distance: f32) -> Vec3 {
    let rot = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
    rot * Vec3::new(0.0, 0.0, -distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_offset_keeps_distance() {
        for (yaw, pitch) in [(0.0, 0.3), (1.2, 0.9), (-2.0, 1.4)] {
            let offset = orbit_offset(yaw, pitch, 250.0);
            assert!((offset.length() - 250.0).abs() < 1e-2);
        }
    }

    #[test]
    fn positive_pitch_looks_down_from_above() {
        assert!(orbit_offset(0.4, 0.75, 100.0).y > 0.0);
    }
}
