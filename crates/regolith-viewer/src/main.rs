//! First-person lunar surface explorer using Bevy.
//!
//! Walks a camera over a glTF terrain with WASD, keeping it at standing
//! height above the ground and outside the rover. Markers highlight under the
//! pointer and report clicks.

mod assets;
mod input;
mod launch_params;
mod markers;
mod navigation;
mod physics;
mod ui;

use assets::SceneAssetsPlugin;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::light::light_consts::lux;
use bevy::post_process::bloom::Bloom;
use bevy::prelude::*;
use bevy::render::view::Hdr;
use input::InputPlugin;
use markers::MarkerPlugin;
use navigation::{Navigation, NavigationCamera, NavigationPlugin};
use physics::PhysicsIntegrationPlugin;
use regolith_nav::NavigationController;
use ui::HudPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            InputPlugin,
            PhysicsIntegrationPlugin,
            SceneAssetsPlugin,
            NavigationPlugin,
            MarkerPlugin,
            HudPlugin,
        ))
        .insert_resource(ClearColor(Color::BLACK))
        .add_systems(Startup, setup_scene);
    }
}

/// Set up the camera and lighting.
fn setup_scene(mut commands: Commands, navigation: Res<Navigation>) {
    let config = navigation.controller.config();
    let view = &config.view;
    let start = config.placement.default_position;

    // The camera holds still until the controller has placed the viewpoint.
    commands.spawn((
        Camera3d::default(),
        Camera::default(),
        Transform::from_translation(start).looking_to(Vec3::NEG_Z, Vec3::Y),
        Projection::Perspective(PerspectiveProjection {
            fov: view.fov_y,
            near: view.near,
            far: view.far,
            ..Default::default()
        }),
        Tonemapping::AcesFitted,
        Hdr,
        // Bloom makes the unlit beacons glow.
        Bloom::NATURAL,
        NavigationCamera,
        input::default_viewer_input_map(),
    ));

    // Low sun raking across the terrain so that craters cast long shadows.
    commands.spawn((
        DirectionalLight {
            color: Color::WHITE,
            illuminance: lux::FULL_DAYLIGHT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(1.0, 0.6, 0.4).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    tracing::info!(
        "Scene setup complete - WASD to move, Shift to run, middle-drag to look, click markers"
    );
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    let controller = match NavigationController::new(params.config.clone()) {
        Ok(controller) => controller,
        Err(e) => {
            tracing::error!("Invalid navigation config: {e}");
            std::process::exit(1);
        }
    };

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "regolith-viewer".to_string(),
        resolution: (1920, 1080).into(),
        position: WindowPosition::Centered(MonitorSelection::Primary),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }));

    app.insert_resource(Navigation::new(controller))
        .insert_resource(params)
        .add_plugins(AppPlugin)
        .run();
}
