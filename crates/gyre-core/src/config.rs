//! Loop configuration.

/// What the loop does when the command source itself fails.
///
/// The choice is explicit configuration rather than a baked-in behavior:
/// a flaky command source can either be survived or treated as the end of
/// the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpstreamPolicy {
    /// Log the failure and keep the loop running. Subsequent commands are
    /// processed normally.
    #[default]
    Absorb,
    /// Complete the loop, exactly as if the command stream had finished.
    /// In-flight executions still fold their remaining mutations.
    Propagate,
}

/// Configuration for a feedback loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopConfig {
    /// Reaction to a command-source failure.
    pub upstream_policy: UpstreamPolicy,
}
