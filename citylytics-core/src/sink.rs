use crate::{model::Snapshot, series::RollingSeries};

/// Consumer of refresh results, e.g. a terminal view or a chart backend.
///
/// Implementations are called from the refresh loop and must not call back
/// into the orchestrator.
pub trait PresentationSink: Send + Sync {
    fn render(&self, snapshot: &Snapshot, series: &RollingSeries) -> anyhow::Result<()>;

    /// Reset every widget to its "no data" state.
    fn render_cleared(&self);
}
