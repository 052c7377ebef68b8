//! Marionette command-line driver.
//!
//! Provides two modes of operation:
//! - `run`: Animate the built-in demo arm headless and log link poses
//! - `info`: Print crate versions and the demo arm's hierarchy

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use marionette_core::config::RigConfig;
use marionette_physics::RapierEngine;
use marionette_pose::DrawItem;
use marionette_rig::RigBuilder;
use marionette_urdf::{
    Geometry, Inertial, JointData, JointLimits, JointType, KinematicTree, LinkData, Material,
    Origin, Visual,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Drive articulated robot models frame by frame.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Animate the demo arm and log every link's world position.
    Run {
        /// Number of frames to simulate.
        #[arg(short = 'n', long, default_value_t = 100)]
        frames: u32,

        /// Seconds per frame (default: the config's controller dt).
        #[arg(long)]
        dt: Option<f32>,

        /// TOML rig configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Drive joints through rapier3d instead of the kinematic integrator.
        #[arg(long)]
        physics: bool,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Demo model
// ---------------------------------------------------------------------------

fn demo_link(name: &str, length: f32, color: [f32; 4]) -> LinkData {
    LinkData::new(name)
        .with_visual(
            Visual::new(Geometry::Cylinder {
                radius: 0.03,
                length,
            })
            .with_origin(Origin::from_xyz([0.0, 0.0, length / 2.0]))
            .with_material(Material {
                name: name.to_string(),
                color: Some(color),
                texture: None,
            }),
        )
        .with_inertial(Inertial {
            origin: Origin::from_xyz([0.0, 0.0, length / 2.0]),
            mass: 0.5,
            inertia: [0.005, 0.0, 0.0, 0.005, 0.0, 0.001],
        })
}

/// Four-link arm: yaw base, pitch shoulder, continuous wrist, linear gripper.
fn demo_arm() -> KinematicTree {
    let mut tree = KinematicTree::new("demo_arm");
    tree.add_link(demo_link("base", 0.1, [0.3, 0.3, 0.3, 1.0]));
    tree.add_link(demo_link("turret", 0.1, [0.8, 0.4, 0.1, 1.0]));
    tree.add_link(demo_link("boom", 0.4, [0.9, 0.9, 0.9, 1.0]));
    tree.add_link(demo_link("hand", 0.08, [0.2, 0.5, 0.9, 1.0]));
    tree.add_link(demo_link("finger", 0.05, [0.2, 0.8, 0.3, 1.0]));

    tree.add_joint(
        JointData::new("yaw", JointType::Revolute, "base", "turret")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.1]))
            .with_axis([0.0, 0.0, 1.0])
            .with_limits(JointLimits::position(-2.5, 2.5).with_caps(10.0, 2.0)),
    );
    tree.add_joint(
        JointData::new("pitch", JointType::Revolute, "turret", "boom")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.1]))
            .with_axis([0.0, 1.0, 0.0])
            .with_limits(JointLimits::position(-1.4, 1.4).with_caps(20.0, 2.0)),
    );
    tree.add_joint(
        JointData::new("spin", JointType::Continuous, "boom", "hand")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.4]))
            .with_axis([0.0, 0.0, 1.0]),
    );
    tree.add_joint(
        JointData::new("grip", JointType::Prismatic, "hand", "finger")
            .with_origin(Origin::from_xyz([0.0, 0.0, 0.08]))
            .with_axis([1.0, 0.0, 0.0])
            .with_limits(JointLimits::position(0.0, 0.04).with_caps(5.0, 0.1)),
    );
    tree
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

/// Slow sweep per joint, each on its own phase.
fn sweep_targets(t: f32) -> [(&'static str, f32); 4] {
    [
        ("yaw", 2.0 * (0.5 * t).sin()),
        ("pitch", 0.8 * (0.9 * t).sin()),
        ("spin", 1.5 * t),
        ("grip", 0.02 + 0.02 * (2.0 * t).sin()),
    ]
}

fn run(
    frames: u32,
    dt: Option<f32>,
    config: Option<PathBuf>,
    physics: bool,
) -> Result<(), Box<dyn Error>> {
    let config = match config {
        Some(path) => RigConfig::from_file(&path)?,
        None => RigConfig::default(),
    };
    let dt = dt.unwrap_or(config.controller.dt);

    let mut builder = RigBuilder::new().with_tree(demo_arm());
    if physics {
        builder = builder.with_engine(Box::new(RapierEngine::from_config(&config.physics)));
    }
    let mut rig = builder.with_config(config).build()?;
    info!(mode = ?rig.mode(), frames, dt, "starting run");

    let mut log_sink = |item: DrawItem<'_>| {
        let p = item.position();
        debug!(
            link = item.link,
            x = p.x,
            y = p.y,
            z = p.z,
            color = ?item.color(),
            "draw"
        );
    };

    let mut t = 0.0_f32;
    for frame in 0..frames {
        rig.set_targets(sweep_targets(t));
        rig.tick(dt);
        t += dt;
        let drawn = rig.render(&mut log_sink);
        if frame % 20 == 0 {
            let joints: Vec<String> = rig
                .snapshot()
                .iter()
                .map(|s| format!("{}={:.3}", s.name, s.position))
                .collect();
            info!(frame, drawn, joints = %joints.join(" "), "frame");
        }
    }

    let stats = rig.stats();
    if let Some(frame) = stats.physics_fallback_frame {
        warn!(frame, "physics fell back to kinematic mode during the run");
    }
    println!(
        "frames={}, sim_time={:.3}s, mode={:?}",
        stats.frames,
        stats.sim_time,
        rig.mode()
    );
    for (link, pose) in rig.link_poses().iter() {
        let p = pose.isometry.translation.vector;
        println!("  {link:<8} [{:>7.3} {:>7.3} {:>7.3}]", p.x, p.y, p.z);
    }
    Ok(())
}

fn run_info() -> Result<(), Box<dyn Error>> {
    println!("marionette v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  marionette-core     {}", env!("CARGO_PKG_VERSION"));
    println!("  marionette-urdf     {}", env!("CARGO_PKG_VERSION"));
    println!("  marionette-control  {}", env!("CARGO_PKG_VERSION"));
    println!("  marionette-physics  {}", env!("CARGO_PKG_VERSION"));
    println!("  marionette-pose     {}", env!("CARGO_PKG_VERSION"));
    println!("  marionette-rig      {}", env!("CARGO_PKG_VERSION"));
    println!();

    let mut tree = demo_arm();
    let report = tree.build_hierarchy()?;
    println!(
        "demo arm: root={}, links={}, joints={}, dof={}, status={:?}",
        report.root,
        report.link_count,
        report.joint_count,
        tree.dof(),
        report.status
    );
    for (link, children) in &report.child_joint_counts {
        println!("  {link:<8} children={children}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("marionette=info".parse()?)
                .add_directive("warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run {
            frames,
            dt,
            config,
            physics,
        }) => run(frames, dt, config, physics),
        Some(Commands::Info) => run_info(),
        None => run(100, None, None, false),
    }
}
