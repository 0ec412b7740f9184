//! Marker rendering and click dispatch.
//!
//! Every marker gets a solid beacon that is always drawn and a translucent
//! hover shell that is only drawn while the controller highlights it.

use bevy::prelude::*;
use leafwing_input_manager::prelude::*;
use regolith_nav::{MarkerColor, MarkerId, NavigationController};

use crate::{
    input::ViewerAction,
    navigation::{Navigation, NavigationSet},
};

/// Radius of the always-visible beacon sphere.
const BEACON_RADIUS: f32 = 15.0;

/// Opacity of the hover shell.
const HOVER_ALPHA: f32 = 0.5;

/// Plugin for marker visuals and the click dialog.
pub struct MarkerPlugin;

impl Plugin for MarkerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MarkerDialog>()
            .add_systems(Startup, spawn_markers)
            .add_systems(
                Update,
                (
                    sync_hover_shells.after(NavigationSet::Input),
                    dismiss_dialog,
                ),
            );
    }
}

/// The hover shell of a marker.
#[derive(Component)]
pub struct HoverShell(pub MarkerId);

/// The most recently clicked marker, shown until dismissed.
#[derive(Resource, Default, Debug)]
pub struct MarkerDialog {
    pub open: Option<(MarkerId, String)>,
}

impl MarkerDialog {
    /// Show the dialog for `id`, replacing any open one.
    pub fn open(&mut self, controller: &NavigationController, id: MarkerId) {
        let name = controller
            .markers()
            .get(id)
            .map_or_else(|| id.to_string(), |marker| marker.display_name.clone());
        self.open = Some((id, name));
    }

    pub fn close(&mut self) {
        self.open = None;
    }
}

fn marker_color(color: MarkerColor, alpha: f32) -> Color {
    let [r, g, b] = color.rgb_f32();
    Color::srgba(r, g, b, alpha)
}

fn spawn_markers(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    navigation: Res<Navigation>,
) {
    let beacon_mesh = meshes.add(Sphere::new(BEACON_RADIUS).mesh().uv(16, 16));

    for marker in navigation.controller.markers().iter() {
        let beacon_material = materials.add(StandardMaterial {
            base_color: marker_color(marker.color, 1.0),
            unlit: true,
            ..default()
        });
        commands.spawn((
            Name::new(format!("Beacon: {}", marker.display_name)),
            Mesh3d(beacon_mesh.clone()),
            MeshMaterial3d(beacon_material),
            Transform::from_translation(marker.position),
        ));

        let shell_material = materials.add(StandardMaterial {
            base_color: marker_color(marker.color, HOVER_ALPHA),
            alpha_mode: AlphaMode::Blend,
            unlit: true,
            ..default()
        });
        commands.spawn((
            Name::new(format!("Hover shell: {}", marker.display_name)),
            HoverShell(marker.id),
            Mesh3d(meshes.add(Sphere::new(marker.radius).mesh().uv(16, 16))),
            MeshMaterial3d(shell_material),
            Transform::from_translation(marker.position),
            Visibility::Hidden,
        ));
    }

    tracing::info!(
        "Spawned {} markers",
        navigation.controller.markers().len()
    );
}

/// Mirror the registry's hover state onto the shell entities.
fn sync_hover_shells(
    navigation: Res<Navigation>,
    mut shells: Query<(&HoverShell, &mut Visibility)>,
) {
    let highlighted = navigation.controller.markers().visible();
    for (shell, mut visibility) in &mut shells {
        let target = if highlighted == Some(shell.0) {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        visibility.set_if_neq(target);
    }
}

fn dismiss_dialog(
    action_query: Query<&ActionState<ViewerAction>>,
    mut dialog: ResMut<MarkerDialog>,
) {
    let Ok(action_state) = action_query.single() else {
        return;
    };

    if dialog.open.is_some() && action_state.just_pressed(&ViewerAction::DismissDialog) {
        dialog.close();
    }
}

#[cfg(test)]
mod tests {
    use regolith_nav::{MarkerDefinition, NavigationConfig};

    use super::*;

    #[test]
    fn test_dialog_uses_display_name() {
        let config = NavigationConfig {
            markers: vec![MarkerDefinition::new(
                "Ridge Beta",
                Vec3::ZERO,
                MarkerColor(0x00_ff_00),
            )],
            ..NavigationConfig::default()
        };
        let controller = NavigationController::new(config).unwrap();
        let mut dialog = MarkerDialog::default();
        dialog.open(&controller, MarkerId(0));
        assert_eq!(dialog.open, Some((MarkerId(0), "Ridge Beta".to_owned())));
        dialog.close();
        assert!(dialog.open.is_none());
    }

    #[test]
    fn test_marker_color_channels() {
        let color = marker_color(MarkerColor(0xff_00_00), 0.5).to_srgba();
        assert!((color.red - 1.0).abs() < 1e-6);
        assert!(color.green.abs() < 1e-6);
        assert!((color.alpha - 0.5).abs() < 1e-6);
    }
}
