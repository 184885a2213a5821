use super::record::BorrowerRecord;
use super::summary::PortfolioSummary;
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Dashboard state for the currently loaded batch.
///
/// `records` and `summary` are always set or cleared together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchState {
    pub records: Option<Arc<Vec<BorrowerRecord>>>,
    pub summary: Option<Arc<PortfolioSummary>>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Lifecycle transitions accepted by [`BatchState::apply`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchAction {
    LoadStart,
    LoadSuccess {
        records: Vec<BorrowerRecord>,
        summary: PortfolioSummary,
    },
    LoadError {
        message: String,
    },
    Clear,
    /// Any other action tag; applying it leaves the state untouched.
    #[serde(other)]
    Unrecognized,
}

impl BatchAction {
    fn name(&self) -> &'static str {
        match self {
            Self::LoadStart => "load_start",
            Self::LoadSuccess { .. } => "load_success",
            Self::LoadError { .. } => "load_error",
            Self::Clear => "clear",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl BatchState {
    /// Pure transition function. Every arm builds the next state in full.
    pub fn apply(&self, action: BatchAction) -> BatchState {
        match action {
            BatchAction::LoadStart => BatchState {
                loading: true,
                ..self.clone()
            },
            BatchAction::LoadSuccess { records, summary } => BatchState {
                records: Some(Arc::new(records)),
                summary: Some(Arc::new(summary)),
                loading: false,
                error: None,
            },
            // The last good batch stays visible after a failed load.
            BatchAction::LoadError { message } => BatchState {
                error: Some(message),
                loading: false,
                ..self.clone()
            },
            BatchAction::Clear => BatchState::default(),
            BatchAction::Unrecognized => self.clone(),
        }
    }

    pub fn has_batch(&self) -> bool {
        self.records.is_some()
    }

    pub fn total_borrowers(&self) -> usize {
        self.records.as_ref().map_or(0, |records| records.len())
    }
}

/// Shared handle to the dashboard state. Clones point at the same state.
///
/// Each transition swaps in a whole new `Arc<BatchState>` under the write
/// lock, so a reader's snapshot always comes from a single transition.
#[derive(Debug, Clone, Default)]
pub struct BatchStore {
    current: Arc<RwLock<Arc<BatchState>>>,
}

impl BatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<BatchState> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn dispatch(&self, action: BatchAction) -> Arc<BatchState> {
        let name = action.name();
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(guard.apply(action));
        *guard = Arc::clone(&next);
        drop(guard);

        debug!(
            action = name,
            loading = next.loading,
            borrowers = next.total_borrowers(),
            has_error = next.error.is_some(),
            "batch state transition"
        );
        next
    }

    pub fn load_start(&self) -> Arc<BatchState> {
        self.dispatch(BatchAction::LoadStart)
    }

    pub fn load_success(
        &self,
        records: Vec<BorrowerRecord>,
        summary: PortfolioSummary,
    ) -> Arc<BatchState> {
        self.dispatch(BatchAction::LoadSuccess { records, summary })
    }

    pub fn load_error(&self, message: impl Into<String>) -> Arc<BatchState> {
        self.dispatch(BatchAction::LoadError {
            message: message.into(),
        })
    }

    pub fn clear(&self) -> Arc<BatchState> {
        self.dispatch(BatchAction::Clear)
    }
}
