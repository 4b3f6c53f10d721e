//! Issues one prediction per profile against a [`CompletionProvider`].
//!
//! Profiles run concurrently up to a fixed limit. Each call is throttled,
//! bounded by a timeout and retried with backoff on transient failures. A
//! profile whose calls all fail is recorded as `Unknown`; it never aborts
//! the batch. Cancelling stops new profiles from starting, lets in-flight
//! ones settle, and marks the rest `Unknown`.

use crate::core::parser::try_parse_vote;
use crate::domain::model::{BatchStats, Party, PredictionResult};
use crate::domain::ports::{CompletionProvider, ProviderFailure};
use crate::domain::profile::VoterProfile;
use crate::utils::retry::{retry_with_backoff, RetryPolicy};
use crate::utils::throttle::Throttle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

pub const CANCELLED_REASON: &str = "cancelled before a prediction was made";

/// Cloneable stop flag shared between the caller and the predictor.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

#[derive(Debug, Clone)]
pub struct PredictorOptions {
    pub model: String,
    pub concurrency: usize,
    /// Independent calls per profile, majority-voted.
    pub repetitions: u32,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub request_interval: Duration,
}

impl Default for PredictorOptions {
    fn default() -> Self {
        Self {
            model: crate::core::provider::DEFAULT_MODEL.to_string(),
            concurrency: 5,
            repetitions: 1,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
            request_interval: Duration::ZERO,
        }
    }
}

/// One profile ready to be sent, with its position in the batch.
#[derive(Debug, Clone)]
pub struct PredictionJob {
    pub index: usize,
    pub profile: VoterProfile,
    pub prompt: String,
}

#[derive(Debug)]
struct ProfileVerdict {
    result: PredictionResult,
    responses: usize,
    parse_failures: usize,
    call_failures: usize,
    last_systemic_failure: Option<ProviderFailure>,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Ordered by profile index, one entry per submitted job.
    pub results: Vec<PredictionResult>,
    pub stats: BatchStats,
    /// Provider replies received, parseable or not.
    pub responses: usize,
    /// Profiles that ended with only systemic failures (connect/auth).
    pub systemic_failures: usize,
    pub last_systemic_failure: Option<String>,
}

impl BatchOutcome {
    /// `Some(reason)` when no call in the batch ever reached the provider.
    pub fn unreachable_reason(&self) -> Option<String> {
        let attempted = self.stats.profiles - self.stats.cancelled;
        if attempted > 0 && self.responses == 0 && self.systemic_failures == attempted {
            Some(
                self.last_systemic_failure
                    .clone()
                    .unwrap_or_else(|| "no response from provider".to_string()),
            )
        } else {
            None
        }
    }
}

fn majority(votes: &[Party]) -> Party {
    let democrat = votes.iter().filter(|v| **v == Party::Democrat).count();
    let republican = votes.iter().filter(|v| **v == Party::Republican).count();
    match democrat.cmp(&republican) {
        std::cmp::Ordering::Greater => Party::Democrat,
        std::cmp::Ordering::Less => Party::Republican,
        std::cmp::Ordering::Equal => Party::Unknown,
    }
}

/// State shared by every in-flight task.
struct CallContext {
    provider: Arc<dyn CompletionProvider>,
    options: PredictorOptions,
    throttle: Throttle,
    cancel: CancellationSignal,
}

impl CallContext {
    async fn call_once(&self, prompt: &str) -> (Result<String, ProviderFailure>, u32) {
        let provider = &self.provider;
        let throttle = &self.throttle;
        let model = self.options.model.as_str();
        let timeout = self.options.request_timeout;
        let cancel = &self.cancel;

        let retried = retry_with_backoff(
            &self.options.retry,
            |_attempt| async move {
                throttle.acquire().await;
                match tokio::time::timeout(timeout, provider.complete(prompt, model)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderFailure::Timeout(timeout)),
                }
            },
            |failure: &ProviderFailure| failure.is_transient() && !cancel.is_cancelled(),
        )
        .await;

        (retried.result, retried.attempts)
    }

    async fn predict_profile(&self, job: PredictionJob) -> ProfileVerdict {
        let repetitions = self.options.repetitions.max(1);
        let mut votes = Vec::new();
        let mut calls = 0u32;
        let mut responses = 0usize;
        let mut parse_failures = 0usize;
        let mut failures: Vec<ProviderFailure> = Vec::new();
        let mut raw_response = None;

        for repetition in 0..repetitions {
            if repetition > 0 && self.cancel.is_cancelled() {
                break;
            }

            let (result, attempts) = self.call_once(&job.prompt).await;
            calls += attempts;
            match result {
                Ok(text) => {
                    responses += 1;
                    match try_parse_vote(&text) {
                        Ok(party) => votes.push(party),
                        Err(e) => {
                            parse_failures += 1;
                            tracing::warn!("Profile #{}: {}", job.index, e);
                        }
                    }
                    raw_response = Some(text);
                }
                Err(failure) => {
                    tracing::warn!(
                        "Profile #{} ({}): prediction failed after {} attempt(s): {}",
                        job.index,
                        job.profile.state,
                        attempts,
                        failure
                    );
                    failures.push(failure);
                }
            }
        }

        let party = majority(&votes);
        let failure = if party.is_decisive() {
            None
        } else if let Some(last) = failures.last().filter(|_| responses == 0) {
            Some(last.to_string())
        } else if votes.is_empty() {
            Some("response did not name exactly one party".to_string())
        } else {
            Some("repetitions split evenly".to_string())
        };

        let last_systemic_failure = if responses == 0
            && !failures.is_empty()
            && failures.iter().all(ProviderFailure::is_systemic)
        {
            failures.last().cloned()
        } else {
            None
        };

        tracing::debug!("Profile #{} → {}", job.index, party);
        ProfileVerdict {
            result: PredictionResult {
                index: job.index,
                profile: job.profile,
                predicted_party: party,
                raw_response,
                provider_calls: calls,
                failure,
            },
            responses,
            parse_failures,
            call_failures: failures.len(),
            last_systemic_failure,
        }
    }
}

pub struct BatchPredictor {
    context: Arc<CallContext>,
}

impl BatchPredictor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        options: PredictorOptions,
        cancel: CancellationSignal,
    ) -> Self {
        let throttle = Throttle::new(options.request_interval);
        Self {
            context: Arc::new(CallContext {
                provider,
                options,
                throttle,
                cancel,
            }),
        }
    }

    pub fn options(&self) -> &PredictorOptions {
        &self.context.options
    }

    pub async fn predict_all(&self, jobs: Vec<PredictionJob>) -> BatchOutcome {
        let total = jobs.len();
        let concurrency = self.context.options.concurrency.max(1);
        let cancel = self.context.cancel.clone();
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut join_set = JoinSet::new();

        // Kept so that any slot left empty can still be reported.
        let mut profiles: Vec<Option<(usize, VoterProfile)>> = jobs
            .iter()
            .map(|job| Some((job.index, job.profile.clone())))
            .collect();
        let mut slots: Vec<Option<ProfileVerdict>> = (0..total).map(|_| None).collect();

        tracing::info!(
            "🗳️ Requesting {} prediction(s) with concurrency {}",
            total,
            concurrency
        );

        let mut started = 0usize;
        for (position, job) in jobs.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                tracing::warn!(
                    "🛑 Cancellation requested; {} profile(s) will not be sent",
                    total - position
                );
                break;
            };

            let context = Arc::clone(&self.context);
            join_set.spawn(async move {
                let _permit = permit;
                (position, context.predict_profile(job).await)
            });
            started += 1;
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((position, verdict)) => slots[position] = Some(verdict),
                Err(e) => tracing::error!("Prediction task failed: {}", e),
            }
        }

        let mut stats = BatchStats {
            profiles: total,
            ..BatchStats::default()
        };
        let mut responses = 0usize;
        let mut systemic_failures = 0usize;
        let mut last_systemic_failure = None;
        let mut results = Vec::with_capacity(total);

        for (position, slot) in slots.into_iter().enumerate() {
            let result = match slot {
                Some(verdict) => {
                    responses += verdict.responses;
                    stats.parse_failures += verdict.parse_failures;
                    stats.call_failures += verdict.call_failures;
                    stats.provider_calls += verdict.result.provider_calls as usize;
                    if let Some(failure) = verdict.last_systemic_failure {
                        systemic_failures += 1;
                        last_systemic_failure = Some(failure.to_string());
                    }
                    verdict.result
                }
                None => {
                    let Some((index, profile)) = profiles[position].take() else {
                        continue;
                    };
                    if position >= started {
                        stats.cancelled += 1;
                        PredictionResult::unknown(index, profile, CANCELLED_REASON)
                    } else {
                        stats.call_failures += 1;
                        PredictionResult::unknown(index, profile, "prediction task failed")
                    }
                }
            };

            if result.predicted_party.is_decisive() {
                stats.resolved += 1;
            } else {
                stats.unknown += 1;
            }
            results.push(result);
        }

        tracing::info!(
            "✅ Predictions settled: {} resolved, {} unknown, {} cancelled, {} provider call(s)",
            stats.resolved,
            stats.unknown,
            stats.cancelled,
            stats.provider_calls
        );

        BatchOutcome {
            results,
            stats,
            responses,
            systemic_failures,
            last_systemic_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{EducationLevel, Gender, IncomeLevel, MaritalStatus};
    use crate::domain::state::UsState;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies from a fixed script keyed on a substring of the prompt.
    struct ScriptedProvider {
        replies: Vec<(&'static str, Result<&'static str, ProviderFailure>)>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<(&'static str, Result<&'static str, ProviderFailure>)>) -> Self {
            Self {
                replies,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(&self, prompt: &str, _model: &str) -> Result<String, ProviderFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.replies
                .iter()
                .find(|(key, _)| prompt.contains(key))
                .map(|(_, reply)| reply.clone().map(str::to_string))
                .unwrap_or_else(|| Ok("Democrat".to_string()))
        }
    }

    fn profile(occupation: &str) -> VoterProfile {
        VoterProfile {
            age: 40,
            gender: Gender::Male,
            state: UsState::Ohio,
            education: EducationLevel::Bachelor,
            marital_status: MaritalStatus::Married,
            occupation: occupation.to_string(),
            income_level: IncomeLevel::new(5).unwrap(),
        }
    }

    fn jobs(occupations: &[&str]) -> Vec<PredictionJob> {
        occupations
            .iter()
            .enumerate()
            .map(|(index, occupation)| PredictionJob {
                index,
                profile: profile(occupation),
                prompt: format!("voter who works as {}", occupation),
            })
            .collect()
    }

    fn fast_options() -> PredictorOptions {
        PredictorOptions {
            model: "test-model".to_string(),
            concurrency: 2,
            repetitions: 1,
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            request_timeout: Duration::from_millis(200),
            request_interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_results_keep_profile_order() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ("farmer", Ok("Republican")),
            ("teacher", Ok("Democrat")),
            ("poet", Ok("no idea")),
        ]));
        let predictor =
            BatchPredictor::new(provider, fast_options(), CancellationSignal::new());

        let outcome = predictor
            .predict_all(jobs(&["farmer", "teacher", "poet"]))
            .await;

        let parties: Vec<Party> = outcome
            .results
            .iter()
            .map(|r| r.predicted_party)
            .collect();
        assert_eq!(
            parties,
            vec![Party::Republican, Party::Democrat, Party::Unknown]
        );
        assert_eq!(outcome.stats.resolved, 2);
        assert_eq!(outcome.stats.parse_failures, 1);
        assert_eq!(outcome.results[2].raw_response.as_deref(), Some("no idea"));
        assert!(outcome.unreachable_reason().is_none());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![]).with_delay(Duration::from_millis(20)),
        );
        let predictor = BatchPredictor::new(
            provider.clone(),
            fast_options(),
            CancellationSignal::new(),
        );

        let outcome = predictor
            .predict_all(jobs(&["a", "b", "c", "d", "e", "f"]))
            .await;

        assert_eq!(outcome.stats.resolved, 6);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_then_unknown() {
        let provider = Arc::new(ScriptedProvider::new(vec![(
            "clerk",
            Err(ProviderFailure::Status(503)),
        )]));
        let predictor =
            BatchPredictor::new(provider.clone(), fast_options(), CancellationSignal::new());

        let outcome = predictor.predict_all(jobs(&["clerk", "baker"])).await;

        assert_eq!(outcome.results[0].predicted_party, Party::Unknown);
        assert_eq!(outcome.results[0].provider_calls, 3);
        assert!(outcome.results[0]
            .failure
            .as_deref()
            .unwrap()
            .contains("503"));
        assert_eq!(outcome.results[1].predicted_party, Party::Democrat);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![(
            "clerk",
            Err(ProviderFailure::Rejected(400)),
        )]));
        let predictor =
            BatchPredictor::new(provider.clone(), fast_options(), CancellationSignal::new());

        let outcome = predictor.predict_all(jobs(&["clerk"])).await;
        assert_eq!(outcome.results[0].provider_calls, 1);
        assert_eq!(outcome.stats.call_failures, 1);
    }

    #[tokio::test]
    async fn test_timeouts_become_unknown() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![]).with_delay(Duration::from_millis(300)),
        );
        let mut options = fast_options();
        options.request_timeout = Duration::from_millis(20);
        options.retry.max_attempts = 2;
        let predictor = BatchPredictor::new(provider, options, CancellationSignal::new());

        let outcome = predictor.predict_all(jobs(&["a", "b", "c"])).await;

        assert_eq!(outcome.stats.unknown, 3);
        assert_eq!(outcome.stats.resolved, 0);
        assert!(outcome
            .results
            .iter()
            .all(|r| r.failure.as_deref().unwrap().contains("timed out")));
        // Timeouts mean the provider was reachable but slow.
        assert!(outcome.unreachable_reason().is_none());
    }

    #[tokio::test]
    async fn test_all_connect_failures_report_unreachable() {
        let provider = Arc::new(ScriptedProvider::new(vec![(
            "voter",
            Err(ProviderFailure::Connect("connection refused".to_string())),
        )]));
        let predictor =
            BatchPredictor::new(provider, fast_options(), CancellationSignal::new());

        let outcome = predictor.predict_all(jobs(&["a", "b"])).await;

        let reason = outcome.unreachable_reason().unwrap();
        assert!(reason.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_repetitions_are_majority_voted() {
        struct Alternating(AtomicUsize);

        #[async_trait]
        impl CompletionProvider for Alternating {
            async fn complete(&self, _: &str, _: &str) -> Result<String, ProviderFailure> {
                let n = self.0.fetch_add(1, Ordering::SeqCst);
                // R, D, R, R, D, R ...
                Ok(if n % 3 == 1 { "Democrat" } else { "Republican" }.to_string())
            }
        }

        let mut options = fast_options();
        options.concurrency = 1;
        options.repetitions = 3;
        let predictor = BatchPredictor::new(
            Arc::new(Alternating(AtomicUsize::new(0))),
            options,
            CancellationSignal::new(),
        );

        let outcome = predictor.predict_all(jobs(&["a"])).await;
        assert_eq!(outcome.results[0].predicted_party, Party::Republican);
        assert_eq!(outcome.results[0].provider_calls, 3);
    }

    #[test]
    fn test_majority_tie_is_unknown() {
        assert_eq!(majority(&[Party::Democrat, Party::Republican]), Party::Unknown);
        assert_eq!(majority(&[]), Party::Unknown);
        assert_eq!(
            majority(&[Party::Democrat, Party::Democrat, Party::Republican]),
            Party::Democrat
        );
    }

    #[tokio::test]
    async fn test_cancellation_marks_unstarted_profiles() {
        let provider = Arc::new(
            ScriptedProvider::new(vec![]).with_delay(Duration::from_millis(50)),
        );
        let cancel = CancellationSignal::new();
        let mut options = fast_options();
        options.concurrency = 1;
        let predictor = BatchPredictor::new(provider, options, cancel.clone());

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cancel.cancel();
            })
        };

        let outcome = predictor
            .predict_all(jobs(&["a", "b", "c", "d"]))
            .await;
        canceller.await.unwrap();

        assert_eq!(outcome.results.len(), 4);
        // The first profile was in flight and settles normally.
        assert_eq!(outcome.results[0].predicted_party, Party::Democrat);
        assert_eq!(outcome.stats.cancelled, 3);
        assert!(outcome.results[1..]
            .iter()
            .all(|r| r.failure.as_deref() == Some(CANCELLED_REASON)));
        assert!(outcome.unreachable_reason().is_none());
    }

    #[tokio::test]
    async fn test_cancel_signal_resolves_waiters() {
        let cancel = CancellationSignal::new();
        assert!(!cancel.is_cancelled());
        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move { cancel.cancelled().await })
        };
        cancel.cancel();
        waiter.await.unwrap();
        assert!(cancel.is_cancelled());
    }
}
