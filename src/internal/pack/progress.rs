//! Phase-tagged progress reporting and cooperative cancellation for a pack
//! generation run.

use serde::{Deserialize, Serialize};

/// The strictly ordered phases of one pack generation run. None is skippable,
/// except that full cached-pack coverage short-circuits compression work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackPhase {
    Counting,
    GettingSizes,
    FindingSources,
    Compressing,
    Writing,
}

impl std::fmt::Display for PackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PackPhase::Counting => "counting objects",
            PackPhase::GettingSizes => "getting sizes",
            PackPhase::FindingSources => "finding sources",
            PackPhase::Compressing => "compressing objects",
            PackPhase::Writing => "writing objects",
        };
        f.write_str(name)
    }
}

/// Receives begin/update/end notifications per phase and can request
/// cooperative cancellation.
///
/// `update` is incremental: implementations accumulate the amounts. Workers
/// call it concurrently during the compressing phase, so implementations must
/// be `Sync`. `is_cancelled` is polled at phase boundaries and inside the
/// delta search loops; once it returns `true` the run fails with
/// [`crate::errors::PackError::Cancelled`] instead of producing a partial
/// pack.
pub trait ProgressMonitor: Send + Sync {
    /// A phase starts; `total` is the expected number of work units, or
    /// `None` when unknown.
    fn begin_phase(&self, phase: PackPhase, total: Option<u64>);

    /// `amount` more work units completed in the current phase.
    fn update(&self, amount: u64);

    /// The current phase finished.
    fn end_phase(&self);

    /// Whether the caller asked the run to stop.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Monitor that discards all notifications and never cancels.
pub struct NoProgress;

impl ProgressMonitor for NoProgress {
    fn begin_phase(&self, _phase: PackPhase, _total: Option<u64>) {}

    fn update(&self, _amount: u64) {}

    fn end_phase(&self) {}
}
