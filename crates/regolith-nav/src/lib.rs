//! Engine-independent navigation core for a first-person viewpoint walking
//! over a static terrain mesh.
//!
//! The crate has no rendering or windowing dependency. A host feeds it raw
//! key and pointer events, calls [`NavigationController::tick`] once per
//! presented frame with a [`RayQuery`] over its terrain, and renders the
//! resulting [`Pose`].
//!
//! # Pipeline
//!
//! Each tick runs, in order:
//!
//! 1. [`input`]: pressed keys and pointer drags become a [`MotionIntent`].
//! 2. [`bounds`]: the candidate position is clamped to the navigation envelope.
//! 3. [`collision`]: the candidate is ejected from obstacle spheres.
//! 4. [`ground`]: a downward ray snaps the candidate above the terrain; on a
//!    miss or a too-steep slope the previous height is held.
//! 5. [`smoothing`]: position and tilt are exponentially filtered.
//! 6. [`shake`]: speed-triggered jitter is added to the final position.
//!
//! Pointer hit-testing against the [`MarkerRegistry`] runs outside the tick,
//! from the pointer event handlers.
//!
//! # Example
//!
//! ```
//! use regolith_nav::{NavigationConfig, NavigationController, TriangleSurface};
//!
//! let surface = TriangleSurface::flat(-10_000.0, 10_000.0, 5350.0);
//! let mut controller = NavigationController::new(NavigationConfig::default())?;
//! controller.mark_terrain_ready();
//! controller.on_key("w", true);
//! let frame = controller.tick(1.0 / 60.0, &surface);
//! assert!(frame.is_some());
//! # Ok::<(), regolith_nav::NavError>(())
//! ```

pub mod bounds;
pub mod collision;
pub mod config;
pub mod controller;
mod error;
pub mod ground;
pub mod input;
pub mod markers;
pub mod ray;
pub mod shake;
pub mod smoothing;
pub mod telemetry;
pub mod view;

pub use bounds::{Axis, NavigationBounds};
pub use collision::{BoundingSphere, CollisionResolver, ObstacleVolume};
pub use config::NavigationConfig;
pub use controller::{FrameOutput, LoadState, NavigationController, Pose};
pub use error::{NavError, Result};
pub use ground::{GroundFollower, GroundResolution};
pub use input::{InputAggregator, LookAngles, MotionIntent, NavKey, PointerButton};
pub use markers::{
    HitTester, InteractiveMarker, MarkerColor, MarkerDefinition, MarkerId, MarkerRegistry,
};
pub use ray::{NoSurface, Ray, RayQuery, SurfaceHit, TriangleSurface};
pub use shake::ShakeGenerator;
pub use smoothing::{MotionSmoother, TimingMode};
pub use telemetry::{CsvTelemetrySink, TelemetrySample, TelemetrySink, TracingTelemetrySink};
pub use view::PerspectiveView;
