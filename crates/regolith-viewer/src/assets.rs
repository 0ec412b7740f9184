//! Terrain and obstacle scene loading.
//!
//! Both scenes are glTF files loaded through the asset server. Once a scene
//! instance is spawned:
//!
//! - terrain meshes receive static trimesh colliders, and the controller is
//!   told the terrain is ready when avian has built all of them;
//! - obstacle meshes are reduced to one bounding sphere per sub-mesh, in
//!   world space, and handed to the controller.
//!
//! Load failures are logged, recorded for the loading overlay, and signalled
//! to the controller so that the rest of the viewer keeps running.

use std::f32::consts::FRAC_PI_2;

use avian3d::prelude::*;
use bevy::{
    asset::LoadState,
    gltf::{Gltf, GltfAssetLabel},
    mesh::VertexAttributeValues,
    prelude::*,
    scene::SceneInstanceReady,
};
use regolith_nav::BoundingSphere;

use crate::{
    launch_params::LaunchParams,
    navigation::{Navigation, NavigationSet},
    physics::TerrainCollider,
};

/// Uniform scale applied to the terrain scene.
const TERRAIN_SCALE: f32 = 1000.0;

/// Where the obstacle scene is placed.
const OBSTACLE_POSITION: Vec3 = Vec3::new(1000.0, 5350.0, 2000.0);

/// Uniform scale applied to the obstacle scene.
const OBSTACLE_SCALE: f32 = 50.0;

// ============================================================================
// Plugin
// ============================================================================

/// Plugin that loads the terrain and obstacle scenes.
///
/// Expects [`LaunchParams`] to be inserted before the app runs.
pub struct SceneAssetsPlugin;

impl Plugin for SceneAssetsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneLoading>()
            .add_systems(Startup, load_scenes)
            .add_systems(
                Update,
                (check_load_failures, finish_terrain, finish_obstacle)
                    .before(NavigationSet::Tick),
            )
            .add_observer(on_scene_ready);
    }
}

// ============================================================================
// Load tracking
// ============================================================================

/// Progress of one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneStage {
    /// The glTF file is still loading.
    #[default]
    Loading,
    /// The scene instance exists; derived data is being built.
    Spawned,
    Ready,
    Failed,
}

impl SceneStage {
    fn progress(self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Spawned => 0.5,
            Self::Ready | Self::Failed => 1.0,
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// A scene being loaded.
#[derive(Debug, Default)]
pub struct SceneSlot {
    pub path: String,
    pub stage: SceneStage,
    gltf: Handle<Gltf>,
    root: Option<Entity>,
}

impl SceneSlot {
    fn is_root(&self, entity: Entity) -> bool {
        self.root == Some(entity)
    }

    fn fail(&mut self, errors: &mut Vec<String>, message: String) {
        tracing::error!("{message}");
        errors.push(message);
        self.stage = SceneStage::Failed;
    }
}

/// Load state of both scenes, read by the loading overlay.
#[derive(Resource, Debug, Default)]
pub struct SceneLoading {
    pub terrain: SceneSlot,
    pub obstacle: SceneSlot,
    /// Human-readable load failures.
    pub errors: Vec<String>,
}

impl SceneLoading {
    /// Overall progress in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        (self.terrain.stage.progress() + self.obstacle.stage.progress()) * 0.5
    }

    pub fn is_done(&self) -> bool {
        self.terrain.stage.is_done() && self.obstacle.stage.is_done()
    }
}

/// Marker component for the terrain scene root.
#[derive(Component)]
pub struct TerrainScene;

/// Marker component for the obstacle scene root.
#[derive(Component)]
pub struct ObstacleScene;

// ============================================================================
// Systems
// ============================================================================

fn load_scenes(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    params: Res<LaunchParams>,
    mut loading: ResMut<SceneLoading>,
) {
    let terrain = commands
        .spawn((
            Name::new("Terrain"),
            TerrainScene,
            SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(params.terrain.clone()))),
            Transform::from_scale(Vec3::splat(TERRAIN_SCALE)),
            RigidBody::Static,
        ))
        .id();
    loading.terrain = SceneSlot {
        path: params.terrain.clone(),
        stage: SceneStage::Loading,
        gltf: asset_server.load(params.terrain.clone()),
        root: Some(terrain),
    };

    let obstacle = commands
        .spawn((
            Name::new("Obstacle"),
            ObstacleScene,
            SceneRoot(asset_server.load(GltfAssetLabel::Scene(0).from_asset(params.obstacle.clone()))),
            Transform::from_translation(OBSTACLE_POSITION)
                .with_rotation(Quat::from_rotation_y(FRAC_PI_2))
                .with_scale(Vec3::splat(OBSTACLE_SCALE)),
        ))
        .id();
    loading.obstacle = SceneSlot {
        path: params.obstacle.clone(),
        stage: SceneStage::Loading,
        gltf: asset_server.load(params.obstacle.clone()),
        root: Some(obstacle),
    };

    tracing::info!(
        "Loading terrain {} and obstacle {}",
        params.terrain,
        params.obstacle
    );
}

/// Observer called when either scene finishes spawning.
fn on_scene_ready(
    trigger: On<SceneInstanceReady>,
    mut commands: Commands,
    mut loading: ResMut<SceneLoading>,
    mut navigation: ResMut<Navigation>,
    children: Query<&Children>,
    mesh_query: Query<(), With<Mesh3d>>,
) {
    let root = trigger.event_target();
    let loading = &mut *loading;

    if loading.terrain.is_root(root) {
        let mut count = 0_usize;
        for entity in children.iter_descendants(root) {
            if mesh_query.contains(entity) {
                commands.entity(entity).insert((
                    ColliderConstructor::TrimeshFromMesh,
                    TerrainCollider,
                ));
                count += 1;
            }
        }
        if count == 0 {
            let message = format!("Terrain scene {} contains no meshes", loading.terrain.path);
            loading.terrain.fail(&mut loading.errors, message);
            navigation.controller.mark_terrain_failed();
            return;
        }
        tracing::info!("Terrain scene ready, building {count} colliders");
        loading.terrain.stage = SceneStage::Spawned;
    } else if loading.obstacle.is_root(root) {
        tracing::info!("Obstacle scene ready");
        loading.obstacle.stage = SceneStage::Spawned;
    }
}

/// Detect glTF load failures and tell the controller.
fn check_load_failures(
    asset_server: Res<AssetServer>,
    mut loading: ResMut<SceneLoading>,
    mut navigation: ResMut<Navigation>,
) {
    let loading = &mut *loading;

    if loading.terrain.stage == SceneStage::Loading
        && let Some(LoadState::Failed(err)) = asset_server.get_load_state(&loading.terrain.gltf)
    {
        let message = format!("Failed to load terrain {}: {err}", loading.terrain.path);
        loading.terrain.fail(&mut loading.errors, message);
        navigation.controller.mark_terrain_failed();
    }

    if loading.obstacle.stage == SceneStage::Loading
        && let Some(LoadState::Failed(err)) = asset_server.get_load_state(&loading.obstacle.gltf)
    {
        let message = format!("Failed to load obstacle {}: {err}", loading.obstacle.path);
        loading.obstacle.fail(&mut loading.errors, message);
        navigation.controller.mark_obstacles_failed();
    }
}

/// Terrain is ready once every collider constructor has been replaced by a collider.
fn finish_terrain(
    mut loading: ResMut<SceneLoading>,
    mut navigation: ResMut<Navigation>,
    pending: Query<(), (With<TerrainCollider>, Without<Collider>)>,
) {
    if loading.terrain.stage != SceneStage::Spawned || !pending.is_empty() {
        return;
    }
    loading.terrain.stage = SceneStage::Ready;
    navigation.controller.mark_terrain_ready();
}

/// Build obstacle bounding spheres.
///
/// Runs the frame after the scene spawns so that global transforms have
/// been propagated.
fn finish_obstacle(
    mut loading: ResMut<SceneLoading>,
    mut navigation: ResMut<Navigation>,
    meshes: Res<Assets<Mesh>>,
    children: Query<&Children>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform)>,
    root_query: Query<Entity, With<ObstacleScene>>,
) {
    if loading.obstacle.stage != SceneStage::Spawned {
        return;
    }
    let Ok(root) = root_query.single() else {
        return;
    };

    let spheres: Vec<BoundingSphere> = children
        .iter_descendants(root)
        .filter_map(|entity| mesh_query.get(entity).ok())
        .filter_map(|(mesh, transform)| {
            let positions = mesh_positions(meshes.get(&mesh.0)?)?;
            BoundingSphere::from_points(
                positions
                    .iter()
                    .map(|&p| transform.transform_point(Vec3::from_array(p))),
            )
        })
        .collect();

    let loading = &mut *loading;
    if spheres.is_empty() {
        let message = format!("Obstacle scene {} contains no meshes", loading.obstacle.path);
        loading.obstacle.fail(&mut loading.errors, message);
        navigation.controller.mark_obstacles_failed();
        return;
    }

    tracing::info!("Obstacle built from {} sub-meshes", spheres.len());
    navigation.controller.set_obstacles([spheres]);
    loading.obstacle.stage = SceneStage::Ready;
}

fn mesh_positions(mesh: &Mesh) -> Option<&[[f32; 3]]> {
    match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
        VertexAttributeValues::Float32x3(positions) => Some(positions.as_slice()),
        _ => None,
    }
}
