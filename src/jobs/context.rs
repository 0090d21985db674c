//! Job context for dependency injection

use crate::db::TravelStore;
use crate::metrics::Metrics;
use crate::services::alerts::AlertEvaluator;
use crate::services::fetcher::SignalFetcher;
use std::sync::Arc;

/// Context passed to job handlers via the Apalis Data<T> pattern.
///
/// Cache and matrix state are injected here rather than living as
/// process-wide singletons; everything is safe for concurrent shared use.
pub struct JobContext {
    pub fetcher: Arc<SignalFetcher>,
    pub store: Arc<TravelStore>,
    pub evaluator: Arc<AlertEvaluator>,
    pub metrics: Option<Arc<Metrics>>,
}

impl JobContext {
    pub fn new(
        fetcher: Arc<SignalFetcher>,
        store: Arc<TravelStore>,
        evaluator: Arc<AlertEvaluator>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            fetcher,
            store,
            evaluator,
            metrics,
        }
    }
}
