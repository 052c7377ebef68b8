//! Error types for the kinematic tree model.

/// Errors raised by tree lookups and hierarchy construction.
///
/// Malformed joints are never errors: they are excluded from the hierarchy
/// and reported through [`HierarchyReport`](crate::tree::HierarchyReport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A referenced link was not found in the model.
    #[error("missing link: {0}")]
    MissingLink(String),

    /// A referenced joint was not found in the model.
    #[error("missing joint: {0}")]
    MissingJoint(String),

    /// The tree has no links at all, so no root can exist.
    #[error("tree has no links")]
    EmptyTree,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
