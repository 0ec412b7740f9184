//! Viewer-level input actions.
//!
//! Navigation input (WASD, shift, orbit drag, marker clicks) is forwarded
//! raw to the navigation controller by [`crate::navigation`], which owns its
//! own key bindings. The actions here only drive viewer chrome, through
//! `leafwing-input-manager`.

use bevy::prelude::*;
use leafwing_input_manager::prelude::*;

// ============================================================================
// Action enums
// ============================================================================

/// Actions that affect the viewer UI rather than the viewpoint.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum ViewerAction {
    /// Toggle the telemetry HUD (Q).
    ToggleHud,
    /// Close the marker dialog (Escape or Enter).
    DismissDialog,
}

// ============================================================================
// Input maps
// ============================================================================

/// Create the default input map for viewer actions.
pub fn default_viewer_input_map() -> InputMap<ViewerAction> {
    InputMap::default()
        .with(ViewerAction::ToggleHud, KeyCode::KeyQ)
        .with(ViewerAction::DismissDialog, KeyCode::Escape)
        .with(ViewerAction::DismissDialog, KeyCode::Enter)
}

// ============================================================================
// Plugin
// ============================================================================

/// Plugin that registers the viewer action type.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<ViewerAction>::default());
    }
}
