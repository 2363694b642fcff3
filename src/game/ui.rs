use bevy::pbr::wireframe::WireframeConfig;
use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};
use terrain::{
    EdgeRule, MAX_ITERATIONS, RegenerateTerrain, Shading, TerrainConfig, TerrainStats,
};

#[derive(Resource, Default, Clone, Copy, Debug)]
pub struct UiInputCaptureRes {
    /// True when egui wants to consume mouse/pointer input.
    pub pointer: bool,
    /// True when egui wants to consume keyboard input (typically when editing text).
    pub keyboard: bool,
}

pub(crate) fn update_ui_input_capture(
    mut contexts: EguiContexts,
    mut capture: ResMut<UiInputCaptureRes>,
) {
    let ctx = match contexts.ctx_mut() {
        Ok(ctx) => ctx,
        Err(_) => {
            capture.pointer = false;
            capture.keyboard = false;
            return;
        }
    };

    capture.pointer = ctx.wants_pointer_input() || ctx.is_pointer_over_area();
    capture.keyboard = ctx.wants_keyboard_input();
}

/// `R` draws a new seed.
pub(crate) fn regenerate_hotkey(
    keys: Res<ButtonInput<KeyCode>>,
    ui_capture: Res<UiInputCaptureRes>,
    mut regenerate: MessageWriter<RegenerateTerrain>,
) {
    if !ui_capture.keyboard && keys.just_pressed(KeyCode::KeyR) {
        regenerate.write(RegenerateTerrain { seed: None });
    }
}

pub(crate) fn sync_wireframe(
    config: Res<TerrainConfig>,
    mut wireframe: ResMut<WireframeConfig>,
) {
    if config.is_changed() && wireframe.global != config.wireframe {
        wireframe.global = config.wireframe;
    }
}

pub(crate) fn terrain_panel_system(
    mut contexts: EguiContexts,
    mut config: ResMut<TerrainConfig>,
    stats: Res<TerrainStats>,
    mut regenerate: MessageWriter<RegenerateTerrain>,
) {
    let ctx = match contexts.ctx_mut() {
        Ok(ctx) => ctx,
        Err(_) => return,
    };

    // Edit a copy so change detection only fires on real edits.
    let mut edited = config.clone();
    let mut request = None;

    egui::Window::new("Terrain")
        .resizable(false)
        .default_pos(egui::pos2(10.0, 10.0))
        .show(ctx, |ui| {
            ui.label(format!("Seed: {}", stats.seed));
            ui.label(format!("Grid: {} x {}", stats.size_x, stats.size_z));
            ui.label(format!(
                "Heights: {:.1} .. {:.1}",
                stats.min_height, stats.max_height
            ));
            ui.label(format!(
                "Chunks: {} ({} failed)",
                stats.chunks, stats.failed_chunks
            ));
            ui.label(format!(
                "Vertices: {}  Indices: {}",
                stats.vertices, stats.indices
            ));

            ui.separator();

            ui.add(egui::Slider::new(&mut edited.error_constant, 0.0..=10.0).text("error constant"));
            ui.add(egui::Slider::new(&mut edited.max_seed_height, 0.0..=200.0).text("max seed height"));
            ui.add(egui::Slider::new(&mut edited.iterations, 0..=MAX_ITERATIONS).text("iterations"));
            ui.add(egui::Slider::new(&mut edited.chunk_quads, 1..=255).text("chunk quads"));
            ui.horizontal(|ui| {
                ui.radio_value(&mut edited.edge_rule, EdgeRule::Diamond, "Diamond");
                ui.radio_value(&mut edited.edge_rule, EdgeRule::Pairwise, "Pairwise");
            });
            ui.checkbox(&mut edited.use_triangle_strip, "Triangle strip");
            ui.checkbox(&mut edited.include_normals, "Smooth normals");
            ui.horizontal(|ui| {
                ui.radio_value(&mut edited.shading, Shading::Banded, "Banded");
                ui.radio_value(&mut edited.shading, Shading::Plain, "Plain");
            });
            ui.checkbox(&mut edited.wireframe, "Wireframe");

            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Rebuild").clicked() {
                    request = Some(RegenerateTerrain {
                        seed: Some(stats.seed),
                    });
                }
                if ui.button("New seed (R)").clicked() {
                    request = Some(RegenerateTerrain { seed: None });
                }
            });
        });

    // Slider ranges keep every edited value valid.
    config.set_if_neq(edited);
    if let Some(request) = request {
        regenerate.write(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn wireframe_follows_config() {
        let mut world = World::new();
        world.insert_resource(WireframeConfig::default());
        world.insert_resource(TerrainConfig {
            wireframe: true,
            ..default()
        });

        world.run_system_once(sync_wireframe).unwrap();
        assert!(world.resource::<WireframeConfig>().global);

        world.resource_mut::<TerrainConfig>().wireframe = false;
        world.run_system_once(sync_wireframe).unwrap();
        assert!(!world.resource::<WireframeConfig>().global);
    }
}
