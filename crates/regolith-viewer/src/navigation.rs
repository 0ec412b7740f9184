//! Bridges Bevy input and frame timing to the navigation controller.
//!
//! Window, keyboard and mouse messages are translated into the controller's
//! raw event calls. Once per frame the controller ticks against the terrain
//! colliders and the resulting pose is written to the camera transform.

use avian3d::prelude::SpatialQuery;
use bevy::{
    input::{
        ButtonState,
        keyboard::{Key, KeyboardInput},
        mouse::MouseButtonInput,
    },
    prelude::*,
    window::{CursorMoved, PrimaryWindow, WindowFocused, WindowResized},
};
use bevy_egui::EguiContexts;
use regolith_nav::{
    FrameOutput, NavigationController, PointerButton, TelemetrySink, TracingTelemetrySink,
};

use crate::{markers::MarkerDialog, physics::SpatialRayQuery, ui::HudTelemetry};

// ============================================================================
// Resources and components
// ============================================================================

/// The navigation controller and the output of its latest tick.
#[derive(Resource)]
pub struct Navigation {
    pub controller: NavigationController,
    pub last_frame: Option<FrameOutput>,
}

impl Navigation {
    pub fn new(controller: NavigationController) -> Self {
        Self {
            controller,
            last_frame: None,
        }
    }
}

/// Marker component for the camera driven by the controller.
#[derive(Component)]
pub struct NavigationCamera;

/// System sets for navigation, in execution order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum NavigationSet {
    /// Raw input is forwarded to the controller.
    Input,
    /// The controller advances and the camera follows.
    Tick,
}

// ============================================================================
// Plugin
// ============================================================================

/// Plugin that drives the navigation controller.
///
/// Expects a [`Navigation`] resource to be inserted before the app runs.
pub struct NavigationPlugin;

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(Update, (NavigationSet::Input, NavigationSet::Tick).chain())
            .add_systems(
                Update,
                (forward_window_events, forward_keyboard, forward_pointer)
                    .chain()
                    .in_set(NavigationSet::Input),
            )
            .add_systems(
                Update,
                (tick_navigation, apply_pose)
                    .chain()
                    .in_set(NavigationSet::Tick),
            );
    }
}

// ============================================================================
// Event translation
// ============================================================================

/// Key id understood by the controller's bindings.
fn key_id(key: &Key) -> Option<&str> {
    match key {
        Key::Character(text) => Some(text.as_str()),
        Key::Shift => Some("Shift"),
        _ => None,
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Middle => Some(PointerButton::Auxiliary),
        MouseButton::Right => Some(PointerButton::Secondary),
        _ => None,
    }
}

/// Track viewport size and drop held input when the window loses focus.
fn forward_window_events(
    mut resized: MessageReader<WindowResized>,
    mut focused: MessageReader<WindowFocused>,
    mut navigation: ResMut<Navigation>,
) {
    for event in resized.read() {
        navigation.controller.on_resize(event.width, event.height);
    }
    for event in focused.read() {
        if !event.focused {
            tracing::debug!("Window lost focus, releasing input");
            navigation.controller.release_all();
        }
    }
}

fn forward_keyboard(mut keys: MessageReader<KeyboardInput>, mut navigation: ResMut<Navigation>) {
    for event in keys.read() {
        if event.repeat {
            continue;
        }
        if let Some(id) = key_id(&event.logical_key) {
            navigation
                .controller
                .on_key(id, event.state == ButtonState::Pressed);
        }
    }
}

/// Forward pointer movement and buttons. Presses over the UI are ignored,
/// releases never are.
fn forward_pointer(
    mut moved: MessageReader<CursorMoved>,
    mut buttons: MessageReader<MouseButtonInput>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut contexts: EguiContexts,
    mut navigation: ResMut<Navigation>,
    mut dialog: ResMut<MarkerDialog>,
) {
    for event in moved.read() {
        navigation.controller.on_pointer_move(event.position);
    }

    let egui_wants_pointer = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.is_pointer_over_area());
    let cursor = window.cursor_position();

    for event in buttons.read() {
        let Some(button) = pointer_button(event.button) else {
            continue;
        };
        match event.state {
            ButtonState::Pressed => {
                if egui_wants_pointer {
                    continue;
                }
                let Some(cursor) = cursor else {
                    continue;
                };
                if let Some(id) = navigation.controller.on_pointer_down(button, cursor) {
                    dialog.open(&navigation.controller, id);
                }
            }
            ButtonState::Released => navigation.controller.on_pointer_up(button),
        }
    }
}

// ============================================================================
// Tick
// ============================================================================

fn tick_navigation(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    mut navigation: ResMut<Navigation>,
    mut hud: ResMut<HudTelemetry>,
    mut log: Local<TracingTelemetrySink>,
) {
    let terrain = SpatialRayQuery::new(&spatial_query);
    let Some(frame) = navigation.controller.tick(time.delta_secs(), &terrain) else {
        return;
    };
    hud.record(&frame.telemetry);
    log.record(&frame.telemetry);
    navigation.last_frame = Some(frame);
}

fn apply_pose(
    navigation: Res<Navigation>,
    mut camera: Single<&mut Transform, With<NavigationCamera>>,
) {
    if !navigation.controller.is_active() {
        return;
    }
    let pose = navigation.controller.pose();
    camera.translation = pose.position;
    camera.rotation = pose.orientation;
}
