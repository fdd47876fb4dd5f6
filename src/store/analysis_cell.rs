use parking_lot::Mutex;
use tracing::{info, warn};

use crate::models::{AnalysisResult, AnalysisState};

/// Handle for one in-flight analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

#[derive(Debug)]
struct CellState {
    latest: u64,
    loading: bool,
    result: AnalysisResult,
}

/// Holds the last analysis result. Each `begin` issues a newer ticket; only the
/// newest ticket may store its result, older completions are dropped.
#[derive(Debug)]
pub struct AnalysisCell {
    state: Mutex<CellState>,
}

impl AnalysisCell {
    pub fn new(initial: AnalysisResult) -> Self {
        Self {
            state: Mutex::new(CellState {
                latest: 0,
                loading: false,
                result: initial,
            }),
        }
    }

    pub fn begin(&self) -> RequestTicket {
        let mut state = self.state.lock();
        state.latest += 1;
        state.loading = true;
        info!("Analysis request {} started", state.latest);
        RequestTicket(state.latest)
    }

    /// Returns `true` when the result was stored.
    pub fn complete(&self, ticket: RequestTicket, result: AnalysisResult) -> bool {
        let mut state = self.state.lock();
        if ticket.0 != state.latest {
            warn!(
                "Dropping result of analysis request {} (request {} is newer)",
                ticket.0, state.latest
            );
            return false;
        }
        state.result = result;
        state.loading = false;
        true
    }

    pub fn snapshot(&self) -> AnalysisState {
        let state = self.state.lock();
        AnalysisState {
            result: state.result.clone(),
            loading: state.loading,
        }
    }
}

impl Default for AnalysisCell {
    fn default() -> Self {
        Self::new(AnalysisResult::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_sets_loading_until_complete() {
        let cell = AnalysisCell::default();
        let ticket = cell.begin();
        assert!(cell.snapshot().loading);

        assert!(cell.complete(ticket, AnalysisResult::text("done")));
        let state = cell.snapshot();
        assert!(!state.loading);
        assert_eq!(state.result.analysis, "done");
    }

    #[test]
    fn test_stale_completion_is_dropped() {
        let cell = AnalysisCell::default();
        let first = cell.begin();
        let second = cell.begin();

        assert!(cell.complete(second, AnalysisResult::text("second")));
        assert!(!cell.complete(first, AnalysisResult::text("first")));
        assert_eq!(cell.snapshot().result.analysis, "second");
    }

    #[test]
    fn test_result_is_overwritten_not_merged() {
        let cell = AnalysisCell::new(AnalysisResult {
            analysis: "old".into(),
            insights: vec!["kept?".into()],
            recommendations: vec![],
            error: String::new(),
        });
        let ticket = cell.begin();
        cell.complete(ticket, AnalysisResult::failed("boom"));

        let result = cell.snapshot().result;
        assert!(result.insights.is_empty());
        assert_eq!(result.error, "boom");
        assert!(result.analysis.is_empty());
    }
}
