//! Ordered strategy runner with first-success-wins semantics.
//!
//! The [`StrategyRunner`] holds strategies in registration order and tries
//! them one at a time. Order encodes a reliability ranking, so attempts are
//! never raced.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metadata::DocumentMetadata;
use crate::parser::DocumentId;

use super::{RetrievalOutcome, RetrievalStrategy};

/// Failure reason returned when no strategy yields a valid PDF.
pub const EXHAUSTED_MESSAGE: &str = "Unable to download this document. It may require a Scribd \
    subscription, be protected, or not be publicly available. Please verify the document is \
    accessible and try again.";

/// An ordered collection of strategies with the retrieval loop.
pub struct StrategyRunner {
    strategies: Vec<Box<dyn RetrievalStrategy>>,
    budget: Duration,
}

impl StrategyRunner {
    /// Creates an empty runner whose runs end after `budget`.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            strategies: Vec::new(),
            budget,
        }
    }

    /// Appends a strategy; it runs after every strategy registered before it.
    #[tracing::instrument(skip(self, strategy), fields(strategy_name))]
    pub fn register(&mut self, strategy: Box<dyn RetrievalStrategy>) {
        tracing::Span::current().record("strategy_name", strategy.name());
        debug!(
            name = strategy.name(),
            position = self.strategies.len(),
            "Registering strategy"
        );
        self.strategies.push(strategy);
    }

    /// Returns the number of registered strategies.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Returns strategy names in execution order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Returns the budget covering one run.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Runs strategies in order until one yields a validated payload.
    ///
    /// 1. Each strategy is attempted in registration order
    /// 2. Transport errors and rejected responses are logged and skipped
    /// 3. The first validated payload returns `Success`; later strategies never run
    /// 4. Exhaustion or an expired budget returns `Failure` with [`EXHAUSTED_MESSAGE`]
    /// 5. A cancelled `cancel` token aborts the in-flight attempt and returns `Cancelled`
    #[tracing::instrument(skip(self, metadata, cancel), fields(document_id = %id))]
    pub async fn retrieve(
        &self,
        id: &DocumentId,
        metadata: DocumentMetadata,
        cancel: &CancellationToken,
    ) -> RetrievalOutcome {
        let deadline = Instant::now() + self.budget;
        let mut tried_count: usize = 0;

        for strategy in &self.strategies {
            if cancel.is_cancelled() {
                info!(tried_count, "Retrieval cancelled");
                return RetrievalOutcome::Cancelled { metadata };
            }

            tried_count += 1;
            debug!(strategy = strategy.name(), "Trying strategy");

            let attempt = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!(strategy = strategy.name(), tried_count, "Retrieval cancelled mid-attempt");
                    return RetrievalOutcome::Cancelled { metadata };
                }
                () = sleep_until(deadline) => {
                    warn!(
                        strategy = strategy.name(),
                        tried_count,
                        budget_secs = self.budget.as_secs(),
                        "Retrieval budget exhausted"
                    );
                    break;
                }
                result = strategy.attempt(id) => result,
            };

            match attempt {
                Ok(payload) => {
                    info!(
                        strategy = strategy.name(),
                        bytes = payload.len(),
                        "Strategy succeeded"
                    );
                    return RetrievalOutcome::Success {
                        payload,
                        strategy: strategy.name().to_string(),
                        metadata,
                    };
                }
                Err(error) if error.is_transport() => {
                    warn!(strategy = strategy.name(), error = %error, "Strategy transport error, trying next");
                }
                Err(error) => {
                    debug!(strategy = strategy.name(), error = %error, "Strategy rejected, trying next");
                }
            }
        }

        warn!(
            tried_count,
            total = self.strategies.len(),
            "All strategies failed"
        );
        RetrievalOutcome::Failure {
            reason: EXHAUSTED_MESSAGE.to_string(),
            metadata,
        }
    }
}

impl std::fmt::Debug for StrategyRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRunner")
            .field("strategy_count", &self.strategies.len())
            .field("strategies", &self.strategy_names())
            .field("budget", &self.budget)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use http::HeaderMap;

    use super::*;
    use crate::parser::extract_document_id;
    use crate::retrieval::{AttemptError, RedirectPolicy, StrategyRequest};
    use crate::validator::ValidationError;

    // ==================== MockStrategy for Testing ====================

    #[derive(Clone, Copy)]
    enum MockBehavior {
        Payload(&'static [u8]),
        Reject,
        Hang,
    }

    struct MockStrategy {
        mock_name: &'static str,
        behavior: MockBehavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RetrievalStrategy for MockStrategy {
        fn name(&self) -> &str {
            self.mock_name
        }

        fn build_request(&self, id: &DocumentId) -> StrategyRequest {
            StrategyRequest {
                url: format!("mock://{}/{id}", self.mock_name),
                headers: HeaderMap::new(),
                redirect: RedirectPolicy::Follow,
            }
        }

        async fn attempt(&self, id: &DocumentId) -> Result<Vec<u8>, AttemptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let url = self.build_request(id).url;
            match self.behavior {
                MockBehavior::Payload(bytes) => Ok(bytes.to_vec()),
                MockBehavior::Reject => {
                    Err(AttemptError::rejected(url, ValidationError::BadSignature))
                }
                MockBehavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!("pending future never resolves")
                }
            }
        }
    }

    fn mock(name: &'static str, behavior: MockBehavior) -> (Box<MockStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(MockStrategy {
                mock_name: name,
                behavior,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }

    fn id() -> DocumentId {
        extract_document_id("https://www.scribd.com/document/123456789/Sample").unwrap()
    }

    #[tokio::test]
    async fn test_first_success_wins_and_later_strategies_never_run() {
        let (first, first_calls) = mock("first", MockBehavior::Reject);
        let (second, second_calls) = mock("second", MockBehavior::Payload(b"%PDF-second"));
        let (third, third_calls) = mock("third", MockBehavior::Payload(b"%PDF-third"));

        let mut runner = StrategyRunner::new(Duration::from_secs(5));
        runner.register(first);
        runner.register(second);
        runner.register(third);

        let outcome = runner
            .retrieve(&id(), DocumentMetadata::default(), &CancellationToken::new())
            .await;

        match outcome {
            RetrievalOutcome::Success {
                payload, strategy, ..
            } => {
                assert_eq!(payload, b"%PDF-second");
                assert_eq!(strategy, "second");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0, "third must never run");
    }

    #[tokio::test]
    async fn test_exhaustion_tries_every_strategy_once() {
        let (a, a_calls) = mock("a", MockBehavior::Reject);
        let (b, b_calls) = mock("b", MockBehavior::Reject);

        let mut runner = StrategyRunner::new(Duration::from_secs(5));
        runner.register(a);
        runner.register(b);

        let metadata = DocumentMetadata {
            title: "Kept".to_string(),
            pages: 3,
            ..DocumentMetadata::default()
        };
        let outcome = runner
            .retrieve(&id(), metadata.clone(), &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            RetrievalOutcome::Failure {
                reason: EXHAUSTED_MESSAGE.to_string(),
                metadata,
            }
        );
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_runner_fails() {
        let runner = StrategyRunner::new(Duration::from_secs(1));
        let outcome = runner
            .retrieve(&id(), DocumentMetadata::default(), &CancellationToken::new())
            .await;
        assert!(matches!(outcome, RetrievalOutcome::Failure { .. }));
    }

    #[tokio::test]
    async fn test_precancelled_token_skips_all_strategies() {
        let (a, a_calls) = mock("a", MockBehavior::Payload(b"%PDF-a"));
        let mut runner = StrategyRunner::new(Duration::from_secs(5));
        runner.register(a);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = runner
            .retrieve(&id(), DocumentMetadata::default(), &cancel)
            .await;

        assert!(matches!(outcome, RetrievalOutcome::Cancelled { .. }));
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_attempt() {
        let (hang, _) = mock("hang", MockBehavior::Hang);
        let (after, after_calls) = mock("after", MockBehavior::Payload(b"%PDF-after"));
        let mut runner = StrategyRunner::new(Duration::from_secs(60));
        runner.register(hang);
        runner.register(after);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = runner
            .retrieve(&id(), DocumentMetadata::default(), &cancel)
            .await;
        assert!(matches!(outcome, RetrievalOutcome::Cancelled { .. }));
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_expiry_ends_run_as_failure() {
        let (hang, _) = mock("hang", MockBehavior::Hang);
        let (after, after_calls) = mock("after", MockBehavior::Payload(b"%PDF-after"));
        let mut runner = StrategyRunner::new(Duration::from_secs(30));
        runner.register(hang);
        runner.register(after);

        let outcome = runner
            .retrieve(&id(), DocumentMetadata::default(), &CancellationToken::new())
            .await;
        assert!(matches!(outcome, RetrievalOutcome::Failure { .. }));
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_runner_debug_lists_strategies() {
        let (a, _) = mock("alpha", MockBehavior::Reject);
        let mut runner = StrategyRunner::new(Duration::from_secs(1));
        runner.register(a);
        let debug = format!("{runner:?}");
        assert!(debug.contains("alpha"));
        assert_eq!(runner.strategy_names(), vec!["alpha"]);
        assert_eq!(runner.budget(), Duration::from_secs(1));
    }
}
