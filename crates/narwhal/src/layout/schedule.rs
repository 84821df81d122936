//! Cooperative, frame-paced scheduling and the notifications a layout emits.

use serde::Serialize;

/// Handle for the next animation frame of a running simulation.
///
/// A request is only honored while it is the layout's current one: `stop()` and any newer
/// request make it stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    pub(crate) generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// System temperature stopped changing, or the cooling schedule reached zero.
    Stable,
    /// The iteration budget ran out.
    Exhausted,
    /// The temperature became NaN or infinite.
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStatus {
    Idle,
    Running,
    Finished(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Stepped { step: usize },
    Finished(StopReason),
}

impl StepOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartMode {
    /// Triggered by a node drag: keep current positions; a static layout runs one iteration.
    Dragging,
    /// Full restart through `start()`.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutEvent {
    /// Nodes received their initial positions; no force has been applied yet.
    InitialRender,
    StepCompleted { step: usize },
    StabilityReached { reason: StopReason, steps: usize },
    Restarted { mode: RestartMode },
    /// The host should redraw once without stepping.
    RedrawRequested,
}
