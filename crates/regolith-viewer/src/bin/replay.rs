//! Headless navigation replay.
//!
//! Drives the navigation controller over a procedural cratered height field
//! with a scripted input timeline and writes one CSV telemetry row per tick.
//! Status goes to stderr so the CSV on stdout can be piped straight into a
//! plotting tool.
//!
//! Run with: cargo run -p regolith-viewer --bin regolith-replay -- --seed 7 > replay.csv

// The replay writes to the local filesystem and stdout, which the browser
// build does not have.
#[cfg(target_family = "wasm")]
fn main() {}

#[cfg(not(target_family = "wasm"))]
mod replay {
    use std::{
        fs::File,
        io::{self, BufWriter, Write},
        path::PathBuf,
    };

    use bevy::math::{Vec2, Vec3};
    use clap::{Parser, ValueEnum};
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use regolith_nav::{
        BoundingSphere, CsvTelemetrySink, NavigationBounds, NavigationConfig, NavigationController,
        PointerButton, RayQuery, TelemetrySink, TimingMode, TracingTelemetrySink, TriangleSurface,
    };

    /// Edge length of a height-field quad.
    const TERRAIN_CELL: f32 = 25.0;

    /// Height of the undisturbed plain.
    const PLAIN_HEIGHT: f32 = 5400.0;

    /// Radius of the obstacle placed at the rover site.
    const ROVER_RADIUS: f32 = 25.0;

    /// Window size the pointer script is written against.
    const VIEWPORT: Vec2 = Vec2::new(1920.0, 1080.0);

    #[derive(Clone, Copy, Debug, ValueEnum)]
    enum TimingArg {
        /// Smoothing factors apply once per tick.
        Frame,
        /// Smoothing factors are normalized to a 60 Hz reference tick.
        Normalized,
    }

    #[derive(Parser)]
    #[command(about = "Replay scripted navigation over procedural terrain and emit CSV telemetry")]
    struct CliArgs {
        /// JSON navigation config; unspecified values use the defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for terrain generation and camera shake.
        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Number of craters in the generated terrain.
        #[arg(long, default_value_t = 60)]
        craters: usize,

        /// Simulated ticks per second.
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// How smoothing relates to tick length.
        #[arg(long, value_enum, default_value_t = TimingArg::Frame)]
        timing: TimingArg,

        /// CSV destination; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    }

    /// One segment of the input script.
    struct Step {
        /// Seconds the step lasts.
        duration: f32,
        /// Raw key ids held for the whole step.
        keys: &'static [&'static str],
        /// Orbit drag in pixels per second; zero means no drag.
        drag: Vec2,
    }

    /// Look up from the initial downward view, then tour the plain.
    const SCRIPT: &[Step] = &[
        Step {
            duration: 1.0,
            keys: &[],
            drag: Vec2::ZERO,
        },
        Step {
            duration: 1.0,
            keys: &[],
            drag: Vec2::new(0.0, -780.0),
        },
        Step {
            duration: 4.0,
            keys: &["w"],
            drag: Vec2::ZERO,
        },
        Step {
            duration: 3.0,
            keys: &["w", "Shift"],
            drag: Vec2::ZERO,
        },
        Step {
            duration: 3.0,
            keys: &["w", "d"],
            drag: Vec2::new(300.0, 0.0),
        },
        Step {
            duration: 2.0,
            keys: &["s"],
            drag: Vec2::ZERO,
        },
        Step {
            duration: 3.0,
            keys: &[],
            drag: Vec2::ZERO,
        },
        Step {
            duration: 5.0,
            keys: &["w", "a", "Shift"],
            drag: Vec2::new(-150.0, 40.0),
        },
    ];

    /// A bowl-shaped depression with a raised rim.
    struct Crater {
        center: Vec2,
        radius: f32,
        depth: f32,
    }

    impl Crater {
        fn height_offset(&self, point: Vec2) -> f32 {
            let r = point.distance(self.center) / self.radius;
            if r < 1.0 {
                // Parabolic floor meeting the rim at r = 1.
                self.depth * (r * r - 1.0) + self.rim(1.0)
            } else if r < 1.6 {
                self.rim(r)
            } else {
                0.0
            }
        }

        fn rim(&self, r: f32) -> f32 {
            let t = ((r - 1.0) / 0.6).clamp(0.0, 1.0);
            self.depth * 0.25 * (1.0 - t) * (1.0 - t)
        }
    }

    fn cratered_terrain(bounds: &NavigationBounds, seed: u64, count: usize) -> TriangleSurface {
        let mut rng = StdRng::seed_from_u64(seed);
        let min = Vec2::new(bounds.min.x, bounds.min.z);
        let max = Vec2::new(bounds.max.x, bounds.max.z);
        let craters: Vec<Crater> = (0..count)
            .map(|_| Crater {
                center: Vec2::new(rng.random_range(min.x..max.x), rng.random_range(min.y..max.y)),
                radius: rng.random_range(40.0..400.0),
                depth: rng.random_range(5.0..60.0),
            })
            .collect();

        let cells = ((max - min) / TERRAIN_CELL).ceil();
        TriangleSurface::from_height_field(
            min,
            [cells.x as usize, cells.y as usize],
            TERRAIN_CELL,
            |x, z| {
                let point = Vec2::new(x, z);
                let hills = 20.0 * (x * 0.002).sin() * (z * 0.0015).cos() + 6.0 * (x * 0.011 + z * 0.007).sin();
                PLAIN_HEIGHT + hills + craters.iter().map(|c| c.height_offset(point)).sum::<f32>()
            },
        )
    }

    fn load_config(args: &CliArgs) -> Result<NavigationConfig, Box<dyn std::error::Error>> {
        let mut config = match &args.config {
            Some(path) => serde_json::from_reader(File::open(path)?)?,
            None => NavigationConfig::default(),
        };
        config.shake.seed = Some(args.seed);
        config.view.viewport = VIEWPORT.to_array();
        if let TimingArg::Normalized = args.timing {
            config.smoothing.timing = TimingMode::DtNormalized {
                reference_dt: 1.0 / 60.0,
            };
        }
        Ok(config)
    }

    fn run(args: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
        let config = load_config(args)?;
        let rover = config
            .markers
            .first()
            .map_or(Vec3::new(1000.0, 5350.0, 2000.0), |marker| marker.position);
        let terrain = cratered_terrain(&config.bounds, args.seed, args.craters);
        tracing::info!(
            triangles = terrain.triangle_count(),
            craters = args.craters,
            "Generated terrain"
        );

        let mut controller = NavigationController::new(config)?;
        controller.mark_terrain_ready();
        // The rover stands on the surface, so its sphere sits at ground level.
        let rover_ground = terrain
            .query_down(rover + Vec3::Y * 1000.0, 5000.0)
            .map_or(rover, |hit| hit.point);
        controller.set_obstacles([[BoundingSphere::new(rover_ground, ROVER_RADIUS)]]);

        let writer: Box<dyn Write> = match &args.output {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        let mut csv = CsvTelemetrySink::new(writer);
        let mut log = TracingTelemetrySink;

        let dt = 1.0 / args.fps;
        let mut pointer = VIEWPORT * 0.5;
        let mut ticks = 0_u32;
        let mut travelled = 0.0_f32;
        let mut top_speed = 0.0_f32;

        for (index, step) in SCRIPT.iter().enumerate() {
            tracing::info!(step = index, keys = ?step.keys, "Script step");
            for key in step.keys {
                controller.on_key(key, true);
            }
            let dragging = step.drag != Vec2::ZERO;
            if dragging {
                controller.on_pointer_move(pointer);
                controller.on_pointer_down(PointerButton::Auxiliary, pointer);
            }

            let mut remaining = step.duration;
            while remaining > 0.0 {
                if dragging {
                    pointer += step.drag * dt;
                    controller.on_pointer_move(pointer);
                }
                if let Some(frame) = controller.tick(dt, &terrain) {
                    csv.record(&frame.telemetry);
                    log.record(&frame.telemetry);
                    travelled += frame.displacement.length();
                    top_speed = top_speed.max(frame.telemetry.speed);
                }
                ticks += 1;
                remaining -= dt;
            }

            if dragging {
                controller.on_pointer_up(PointerButton::Auxiliary);
                pointer = VIEWPORT * 0.5;
            }
            for key in step.keys {
                controller.on_key(key, false);
            }
        }
        csv.flush()?;

        let pose = controller.pose();
        tracing::info!(
            ticks,
            travelled,
            top_speed,
            final_position = %pose.position,
            "Replay complete"
        );
        Ok(())
    }

    pub fn main() {
        {
            use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .init();
        }

        let args = CliArgs::parse();
        if let Err(err) = run(&args) {
            tracing::error!("Replay failed: {err}");
            std::process::exit(1);
        }
    }
} // mod replay

#[cfg(not(target_family = "wasm"))]
fn main() {
    replay::main();
}
