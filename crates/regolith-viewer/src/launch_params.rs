//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use bevy::prelude::*;
use regolith_nav::{NavigationConfig, TimingMode};

/// Default terrain scene, relative to the asset directory.
const DEFAULT_TERRAIN: &str = "moon.glb";
/// Default obstacle scene, relative to the asset directory.
const DEFAULT_OBSTACLE: &str = "rover.glb";

/// How smoothing relates to frame length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(not(target_family = "wasm"), derive(clap::ValueEnum))]
pub enum TimingArg {
    /// Smoothing factors apply once per frame.
    #[default]
    Frame,
    /// Smoothing factors are normalized to a 60 Hz reference frame.
    Normalized,
}

/// Launch parameters for the viewer.
#[derive(Resource, Debug)]
pub struct LaunchParams {
    /// Navigation tuning.
    pub config: NavigationConfig,
    /// Terrain glTF path.
    pub terrain: String,
    /// Obstacle glTF path.
    pub obstacle: String,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            config: NavigationConfig::default(),
            terrain: DEFAULT_TERRAIN.to_owned(),
            obstacle: DEFAULT_OBSTACLE.to_owned(),
        }
    }
}

/// Apply the command-line overrides that live outside the config file.
fn apply_overrides(config: &mut NavigationConfig, seed: Option<u64>, timing: TimingArg) {
    if seed.is_some() {
        config.shake.seed = seed;
    }
    if timing == TimingArg::Normalized {
        config.smoothing.timing = TimingMode::DtNormalized {
            reference_dt: 1.0 / 60.0,
        };
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use std::{fs::File, path::PathBuf};

    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "First-person explorer for lunar terrain")]
    struct CliArgs {
        /// JSON navigation config; unspecified values use the defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Terrain glTF scene, relative to the asset directory.
        #[arg(long, default_value = DEFAULT_TERRAIN)]
        terrain: String,

        /// Obstacle glTF scene, relative to the asset directory.
        #[arg(long, default_value = DEFAULT_OBSTACLE)]
        obstacle: String,

        /// Seed for camera shake.
        #[arg(long)]
        seed: Option<u64>,

        /// How smoothing relates to frame length.
        #[arg(long, value_enum, default_value_t = TimingArg::default())]
        timing: TimingArg,
    }

    fn load_config(path: Option<&PathBuf>) -> NavigationConfig {
        let Some(path) = path else {
            return NavigationConfig::default();
        };
        let parsed = File::open(path)
            .map_err(|e| e.to_string())
            .and_then(|file| serde_json::from_reader(file).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => {
                tracing::info!("Loaded navigation config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::error!(
                    "Failed to read navigation config {}: {e}, using defaults",
                    path.display()
                );
                NavigationConfig::default()
            }
        }
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        let mut config = load_config(args.config.as_ref());
        apply_overrides(&mut config, args.seed, args.timing);
        LaunchParams {
            config,
            terrain: args.terrain,
            obstacle: args.obstacle,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        let mut params = LaunchParams::default();
        apply_overrides(&mut params.config, None, TimingArg::default());
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_keep_config_seed_without_flag() {
        let mut config = NavigationConfig::default();
        config.shake.seed = Some(3);
        apply_overrides(&mut config, None, TimingArg::Frame);
        assert_eq!(config.shake.seed, Some(3));
        assert_eq!(config.smoothing.timing, TimingMode::FrameCoupled);
    }

    #[test]
    fn test_normalized_timing_override() {
        let mut config = NavigationConfig::default();
        apply_overrides(&mut config, Some(9), TimingArg::Normalized);
        assert_eq!(config.shake.seed, Some(9));
        assert!(matches!(
            config.smoothing.timing,
            TimingMode::DtNormalized { .. }
        ));
    }
}
