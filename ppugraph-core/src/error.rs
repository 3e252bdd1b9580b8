//! Error Types
//!
//! Every failure in the unit protocol is local: it is logged where it is
//! detected and the affected operation is skipped. Library calls still
//! return [`UnitResult`] so callers (and tests) can observe what happened,
//! but the frame pass in [`crate::graph::SceneGraph::run_pass`] never lets
//! an error escape the traversal.

use crate::graph::NodeId;

/// Convenience result type used across the crate.
pub type UnitResult<T> = Result<T, UnitError>;

/// Failures raised while resolving or configuring units.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// Viewport fallback found no processor above the unit.
    #[error("unit `{unit}` is not able to find the unit processor")]
    MissingOwner { unit: String },

    /// A barrier child of the unit blocks something that is not a unit.
    #[error("unit `{unit}` has a non valid barrier child {barrier:?}")]
    MalformedBridge { unit: String, barrier: NodeId },

    /// A named input binding refers to a node that is not a parent.
    #[error("{parent:?} is not a parent of unit `{unit}`")]
    InvalidUniformTarget { unit: String, parent: NodeId },

    /// The unit was reached again while its own resolution was running.
    #[error("dependency cycle through unit `{unit}`")]
    CycleDetected { unit: String },

    /// Resolution recursed or walked deeper than the configured limit.
    #[error("depth limit of {limit} exceeded while resolving unit `{unit}`")]
    DepthLimitExceeded { unit: String, limit: usize },

    /// The node exists but is not a unit.
    #[error("{0:?} is not a unit")]
    NotAUnit(NodeId),

    /// The node id does not belong to this graph.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// Settings or unit configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl UnitError {
    /// Build a [`UnitError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors that mean the graph itself is malformed, as opposed
    /// to a single unit being misconfigured. These abort the whole chain of
    /// forced ancestor updates.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected { .. } | Self::DepthLimitExceeded { .. }
        )
    }

    /// Log the error at error severity and hand it back.
    pub(crate) fn report(self) -> Self {
        tracing::error!(error = %self, "unit resolution failed");
        self
    }
}

impl From<serde_json::Error> for UnitError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(err.to_string())
    }
}
