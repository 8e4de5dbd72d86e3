//! Error types for the stepper configuration.

/// Errors that can occur while validating a [`StepConfig`](crate::StepConfig).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    /// An update rate of zero would make the fixed step infinite.
    #[error("update rate must be at least 1 Hz")]
    ZeroRate,

    /// A capped policy that allows zero steps would never simulate anything.
    #[error("catch-up cap must allow at least one step per advance")]
    ZeroCatchUp,
}
