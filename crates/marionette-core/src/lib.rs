// marionette-core: configuration and error types for the marionette rig.

pub mod config;
pub mod error;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        config::{BasisConfig, ControllerConfig, PhysicsConfig, RigConfig},
        error::ConfigError,
    };
}
