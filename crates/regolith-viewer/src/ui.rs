//! egui overlay: telemetry HUD, loading progress, marker labels and the
//! marker dialog.

use std::collections::VecDeque;

use bevy::{ecs::system::SystemParam, prelude::*};
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Line, Plot, PlotPoints};
use leafwing_input_manager::prelude::*;
use regolith_nav::{MarkerColor, TelemetrySample, TelemetrySink};

use crate::{
    assets::SceneLoading,
    input::ViewerAction,
    markers::MarkerDialog,
    navigation::{Navigation, NavigationCamera},
};

/// Number of samples to keep for the HUD plots.
const HISTORY_SIZE: usize = 240;

/// Resource controlling whether the HUD is visible.
#[derive(Resource)]
pub struct UiVisible(pub bool);

impl Default for UiVisible {
    fn default() -> Self {
        Self(true)
    }
}

/// Telemetry as shown on the HUD: the latest sample plus short histories.
#[derive(Resource, Default, Debug)]
pub struct HudTelemetry {
    latest: Option<TelemetrySample>,
    /// Speed history (km/h).
    speed: VecDeque<f32>,
    /// Elevation history (m).
    elevation: VecDeque<f32>,
}

impl HudTelemetry {
    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.latest.as_ref()
    }
}

fn push_bounded(history: &mut VecDeque<f32>, value: f32) {
    history.push_back(if value.is_finite() { value } else { 0.0 });
    if history.len() > HISTORY_SIZE {
        history.pop_front();
    }
}

impl TelemetrySink for HudTelemetry {
    fn record(&mut self, sample: &TelemetrySample) {
        self.latest = Some(*sample);
        push_bounded(&mut self.speed, sample.speed_kmh());
        push_bounded(&mut self.elevation, sample.elevation);
    }
}

/// Plugin for the egui overlay.
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .init_resource::<UiVisible>()
            .init_resource::<HudTelemetry>()
            .add_systems(Update, toggle_ui_visible)
            .add_systems(
                EguiPrimaryContextPass,
                (
                    loading_overlay_system
                        .run_if(|loading: Res<SceneLoading>| !loading.is_done()),
                    marker_label_system,
                    marker_dialog_system,
                    hud_system.run_if(|visible: Res<UiVisible>| visible.0),
                ),
            );
    }
}

/// Toggle HUD visibility with Q.
fn toggle_ui_visible(
    action_query: Query<&ActionState<ViewerAction>>,
    mut visible: ResMut<UiVisible>,
) {
    let Ok(action_state) = action_query.single() else {
        return;
    };

    if action_state.just_pressed(&ViewerAction::ToggleHud) {
        visible.0 = !visible.0;
    }
}

fn color32(color: MarkerColor) -> egui::Color32 {
    let [r, g, b] = color.rgb();
    egui::Color32::from_rgb(r, g, b)
}

fn history_plot(ui: &mut egui::Ui, id: &str, history: &VecDeque<f32>) {
    let points: PlotPoints = history
        .iter()
        .enumerate()
        .map(|(i, &v)| [i as f64, f64::from(v)])
        .collect();
    Plot::new(id)
        .height(60.0)
        .show_axes(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(id, points).color(egui::Color32::LIGHT_BLUE));
        });
}

/// Render the telemetry HUD.
fn hud_system(
    mut contexts: EguiContexts,
    hud: Res<HudTelemetry>,
    loading: Res<SceneLoading>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    egui::Window::new("Telemetry")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            let Some(sample) = hud.latest() else {
                ui.label("Waiting for terrain...");
                return;
            };

            let rows = [
                (
                    "Position:",
                    format!(
                        "{:.0}, {:.0}, {:.0}",
                        sample.position.x, sample.position.y, sample.position.z
                    ),
                ),
                ("Elevation:", format!("{:.0} m", sample.elevation)),
                ("Speed:", format!("{:.0} km/h", sample.speed_kmh())),
                ("Heading:", format!("{:.0}°", sample.heading_degrees())),
                (
                    "Ground:",
                    if sample.grounded { "Contact" } else { "Free" }.to_owned(),
                ),
            ];
            TableBuilder::new(ui)
                .column(Column::exact(80.0))
                .column(Column::exact(140.0))
                .body(|mut body| {
                    for (label, value) in rows {
                        body.row(18.0, |mut row| {
                            row.col(|ui| {
                                ui.label(label);
                            });
                            row.col(|ui| {
                                ui.label(value);
                            });
                        });
                    }
                });

            ui.separator();
            ui.label("Speed history:");
            history_plot(ui, "speed", &hud.speed);
            ui.label("Elevation history:");
            history_plot(ui, "elevation", &hud.elevation);

            for error in &loading.errors {
                ui.colored_label(egui::Color32::LIGHT_RED, error);
            }

            ui.separator();
            ui.label("WASD to move, Shift to run, middle-drag to look, Q to hide");
        });

    Ok(())
}

/// Render load progress until both scenes have settled.
fn loading_overlay_system(mut contexts: EguiContexts, loading: Res<SceneLoading>) -> Result {
    let ctx = contexts.ctx_mut()?;

    egui::Window::new("Loading")
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.add(
                egui::ProgressBar::new(loading.progress())
                    .desired_width(240.0)
                    .show_percentage(),
            );
            ui.label(format!("Terrain: {:?}", loading.terrain.stage));
            ui.label(format!("Obstacle: {:?}", loading.obstacle.stage));
            for error in &loading.errors {
                ui.colored_label(egui::Color32::LIGHT_RED, error);
            }
        });

    Ok(())
}

/// Resources for projecting marker labels.
#[derive(SystemParam)]
struct MarkerLabelParams<'w, 's> {
    navigation: Res<'w, Navigation>,
    camera: Query<'w, 's, (&'static Camera, &'static GlobalTransform), With<NavigationCamera>>,
}

/// Draw each marker's name above it.
fn marker_label_system(mut contexts: EguiContexts, params: MarkerLabelParams) -> Result {
    let ctx = contexts.ctx_mut()?;
    let Ok((camera, camera_transform)) = params.camera.single() else {
        return Ok(());
    };
    if !params.navigation.controller.is_active() {
        return Ok(());
    }

    for marker in params.navigation.controller.markers().iter() {
        let Ok(screen) = camera.world_to_viewport(camera_transform, marker.label_position()) else {
            continue;
        };
        egui::Area::new(egui::Id::new(("marker_label", marker.id.0)))
            .fixed_pos(egui::pos2(screen.x, screen.y))
            .pivot(egui::Align2::CENTER_BOTTOM)
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(&marker.display_name)
                        .color(color32(marker.color))
                        .strong(),
                );
            });
    }

    Ok(())
}

/// Show the dialog for the last clicked marker.
fn marker_dialog_system(mut contexts: EguiContexts, mut dialog: ResMut<MarkerDialog>) -> Result {
    let ctx = contexts.ctx_mut()?;
    let Some((_, name)) = &dialog.open else {
        return Ok(());
    };

    let mut close = false;
    egui::Window::new("Marker")
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(format!("Clicked on {name}"));
            if ui.button("OK").clicked() {
                close = true;
            }
        });
    if close {
        dialog.close();
    }

    Ok(())
}
