use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_dt() -> f32 {
    0.05
}
const fn default_kp() -> f32 {
    100.0
}
const fn default_kd() -> f32 {
    20.0
}
const fn default_max_acceleration() -> f32 {
    40.0
}
const fn default_max_velocity() -> f32 {
    3.0
}
const fn default_true() -> bool {
    true
}
const fn default_physics_kp() -> f32 {
    60.0
}
const fn default_physics_kd() -> f32 {
    6.0
}
const fn default_max_effort() -> f32 {
    50.0
}
const fn default_substeps() -> u32 {
    1
}
const fn default_gravity() -> [f32; 3] {
    [0.0, 0.0, -9.81]
}
const fn default_link_mass() -> f32 {
    1.0
}
const fn default_box_size() -> [f32; 3] {
    [0.1, 0.1, 0.1]
}
const fn default_z_up() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}
const fn default_x_forward() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}
const fn default_y_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}
const fn default_z_forward() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}
const fn default_scale() -> f32 {
    1.0
}

// ---------------------------------------------------------------------------
// ControllerConfig
// ---------------------------------------------------------------------------

/// Gains and clamps for the kinematic PD integrator.
///
/// `kp`/`kd` act directly on acceleration: the effective inertia is folded
/// into the gains. The defaults give a critically damped response
/// (`kd = 2 * sqrt(kp)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Nominal tick in seconds (default: 0.05 = 20 Hz).
    #[serde(default = "default_dt")]
    pub dt: f32,

    /// Position gain (1/s^2).
    #[serde(default = "default_kp")]
    pub kp: f32,

    /// Velocity gain (1/s).
    #[serde(default = "default_kd")]
    pub kd: f32,

    /// Symmetric acceleration clamp (rad/s^2 or m/s^2).
    #[serde(default = "default_max_acceleration")]
    pub max_acceleration: f32,

    /// Velocity clamp for joints without a `limit.velocity`.
    #[serde(default = "default_max_velocity")]
    pub default_max_velocity: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            kp: default_kp(),
            kd: default_kd(),
            max_acceleration: default_max_acceleration(),
            default_max_velocity: default_max_velocity(),
        }
    }
}

impl ControllerConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidTimestep(self.dt));
        }
        non_negative("controller.kp", self.kp)?;
        non_negative("controller.kd", self.kd)?;
        positive("controller.max_acceleration", self.max_acceleration)?;
        positive("controller.default_max_velocity", self.default_max_velocity)?;
        Ok(())
    }

    /// Tick rate in Hz.
    pub fn tick_hz(&self) -> f32 {
        1.0 / self.dt
    }
}

// ---------------------------------------------------------------------------
// PhysicsConfig
// ---------------------------------------------------------------------------

/// Settings for the rigid-body-backed controller mode.
///
/// Gains here are effort gains (Nm/rad, N/m) and are tuned independently
/// of [`ControllerConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Try the physics-backed mode when an engine is supplied.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_physics_kp")]
    pub kp: f32,

    #[serde(default = "default_physics_kd")]
    pub kd: f32,

    /// Effort clamp for joints without a `limit.effort`.
    #[serde(default = "default_max_effort")]
    pub default_max_effort: f32,

    /// Engine steps per controller update.
    #[serde(default = "default_substeps")]
    pub substeps: u32,

    /// Gravity vector [x, y, z] in m/s^2, in the model's native frame.
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],

    /// Pin the root link to the world.
    #[serde(default = "default_true")]
    pub fixed_base: bool,

    /// Mass used for links without inertial data (kg).
    #[serde(default = "default_link_mass")]
    pub default_link_mass: f32,

    /// Box extents used to derive default inertia (m).
    #[serde(default = "default_box_size")]
    pub default_box_size: [f32; 3],
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kp: default_physics_kp(),
            kd: default_physics_kd(),
            default_max_effort: default_max_effort(),
            substeps: default_substeps(),
            gravity: default_gravity(),
            fixed_base: true,
            default_link_mass: default_link_mass(),
            default_box_size: default_box_size(),
        }
    }
}

impl PhysicsConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("physics.kp", self.kp)?;
        non_negative("physics.kd", self.kd)?;
        positive("physics.default_max_effort", self.default_max_effort)?;
        positive("physics.default_link_mass", self.default_link_mass)?;
        if self.substeps == 0 {
            return Err(ConfigError::invalid("physics.substeps", "must be >= 1"));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::invalid("physics.gravity", "must be finite"));
        }
        if self.default_box_size.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ConfigError::invalid(
                "physics.default_box_size",
                "extents must be > 0",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BasisConfig
// ---------------------------------------------------------------------------

/// Axis conventions of the robot description and of the target scene.
///
/// Defaults map a Z-up, X-forward description onto a Y-up, Z-forward scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisConfig {
    #[serde(default = "default_z_up")]
    pub source_up: [f32; 3],

    #[serde(default = "default_x_forward")]
    pub source_forward: [f32; 3],

    #[serde(default = "default_y_up")]
    pub target_up: [f32; 3],

    #[serde(default = "default_z_forward")]
    pub target_forward: [f32; 3],

    /// Uniform model scale applied at the root.
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl Default for BasisConfig {
    fn default() -> Self {
        Self {
            source_up: default_z_up(),
            source_forward: default_x_forward(),
            target_up: default_y_up(),
            target_forward: default_z_forward(),
            scale: default_scale(),
        }
    }
}

impl BasisConfig {
    /// Identity basis: scene axes equal the model axes.
    pub fn identity() -> Self {
        Self {
            source_up: default_z_up(),
            source_forward: default_x_forward(),
            target_up: default_z_up(),
            target_forward: default_x_forward(),
            scale: default_scale(),
        }
    }

    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("basis.scale", self.scale)?;
        for (field, v) in [
            ("basis.source_up", self.source_up),
            ("basis.source_forward", self.source_forward),
            ("basis.target_up", self.target_up),
            ("basis.target_forward", self.target_forward),
        ] {
            let norm_sq: f32 = v.iter().map(|c| c * c).sum();
            if !(norm_sq.is_finite() && norm_sq > f32::EPSILON) {
                return Err(ConfigError::invalid(field, "must be a non-zero vector"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RigConfig
// ---------------------------------------------------------------------------

/// Top-level configuration for a posed, animated robot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub physics: PhysicsConfig,

    #[serde(default)]
    pub basis: BasisConfig,

    /// Starting joint positions by joint name (rad or m).
    #[serde(default)]
    pub initial_joint_positions: HashMap<String, f32>,
}

impl RigConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        self.physics.validate()?;
        self.basis.validate()?;
        if let Some((name, _)) = self
            .initial_joint_positions
            .iter()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ConfigError::invalid(
                "initial_joint_positions",
                format!("position for '{name}' is not finite"),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn non_negative(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be a non-negative number"))
    }
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, "must be > 0"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
