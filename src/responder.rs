use crate::audit::{AuditFields, AuditSink, LogSink};
use crate::check::{Check, CheckOutcome};
use crate::config::{Backoff, Config};
use crate::error::HookError;
use crate::event::HookEvent;
use crate::result::{HookDetails, HookResult, HookStatus};
use std::time::Duration;

/// Key in the hook details which counts the pending answers of a deployment
pub const ATTEMPT_KEY: &str = "attempt";

/// Time kept back from the lambda deadline to return the answer
const DEADLINE_MARGIN: Duration = Duration::from_millis(100);

enum Verdict {
    Completed(CheckOutcome),
    BudgetExceeded,
}

/// Answers lifecycle hook events by running a [`Check`] against the
/// revision which is rolled out.
///
/// The responder holds no state between invocations, it can be shared by
/// reference between concurrent invocations. Every invocation yields a
/// well formed [`HookResult`] and writes one entry to the [`AuditSink`].
pub struct HookResponder<C, A = LogSink> {
    check: C,
    audit: A,
    config: Config,
}

impl<C, A> std::fmt::Debug for HookResponder<C, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookResponder")
            .field("check", &"[...]")
            .field("audit", &"[...]")
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Check> HookResponder<C> {
    /// Creates a responder which audits to the [`log`] facade
    pub fn new(check: C, config: Config) -> Self {
        Self::with_audit(check, config, LogSink)
    }
}

impl<C: Check, A: AuditSink> HookResponder<C, A> {
    /// Creates a responder with a custom audit sink
    pub fn with_audit(check: C, config: Config, audit: A) -> Self {
        Self {
            check,
            audit,
            config,
        }
    }

    /// Configuration of the responder
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluates the event, giving the check `timeoutSeconds` to complete
    pub async fn evaluate(&self, event: &HookEvent) -> HookResult {
        self.evaluate_within(event, self.config.timeout()).await
    }

    /// Evaluates the event, giving the check `budget` to complete.
    /// A check which takes longer is dropped and the hook answers
    /// `IN_PROGRESS`.
    pub async fn evaluate_within(&self, event: &HookEvent, budget: Duration) -> HookResult {
        let verdict = self.run_check(event, budget).await;
        let result = match &verdict {
            Ok(Verdict::Completed(CheckOutcome::Success)) => HookResult::succeeded(),
            Ok(Verdict::Completed(CheckOutcome::Failure)) | Err(_) => HookResult::failed(),
            Ok(Verdict::Completed(CheckOutcome::Pending) | Verdict::BudgetExceeded) => {
                self.pending_result(event)
            }
        };
        self.record(Some(event), &result, &verdict);
        result
    }

    /// Entry point for raw lambda payloads. `deadline_in_ms` is the lambda
    /// deadline in milliseconds since epoch, it caps the check budget.
    pub async fn handle(
        &self,
        payload: serde_json::Value,
        deadline_in_ms: Option<u64>,
    ) -> HookResult {
        let budget = deadline_in_ms.map_or_else(
            || self.config.timeout(),
            |deadline| self.config.timeout().min(remaining_budget(deadline)),
        );
        match serde_json::from_value::<HookEvent>(payload) {
            Ok(event) => self.evaluate_within(&event, budget).await,
            Err(err) => {
                let result = HookResult::failed();
                self.record(None, &result, &Err(HookError::from(err)));
                result
            }
        }
    }

    async fn run_check(&self, event: &HookEvent, budget: Duration) -> Result<Verdict, HookError> {
        use futures::FutureExt;

        let _stage = event.stage()?;
        let mut check = std::panic::AssertUnwindSafe(self.check.run(&event.revision_id))
            .catch_unwind()
            .fuse();
        let mut timeout = Box::pin(tokio::time::sleep(budget).fuse());
        let res = futures::select_biased! {
            res = check => res,
            _ = timeout => return Ok(Verdict::BudgetExceeded),
        };
        match res {
            Ok(Ok(outcome)) => Ok(Verdict::Completed(outcome)),
            Ok(Err(err)) => Err(HookError::CheckExecution(err)),
            Err(panic) => Err(HookError::CheckExecution(anyhow::anyhow!(
                "check panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    fn pending_result(&self, event: &HookEvent) -> HookResult {
        match self.config.backoff {
            Backoff::Fixed => HookResult::in_progress(self.config.poll_interval_seconds),
            Backoff::Exponential => {
                let attempt = event
                    .hook_details
                    .get(ATTEMPT_KEY)
                    .and_then(|attempt| attempt.parse::<u32>().ok())
                    .unwrap_or(0);
                let delay = exponential_delay(
                    self.config.poll_interval_seconds,
                    attempt,
                    self.config.max_callback_delay_seconds,
                );
                let details = HookDetails::from([(
                    ATTEMPT_KEY.to_owned(),
                    attempt.saturating_add(1).to_string(),
                )]);
                HookResult::in_progress(delay).with_details(details)
            }
        }
    }

    fn record(
        &self,
        event: Option<&HookEvent>,
        result: &HookResult,
        verdict: &Result<Verdict, HookError>,
    ) {
        let mut fields: AuditFields = Vec::with_capacity(8);
        if let Some(event) = event {
            fields.push(("deploymentId", event.deployment_id.clone()));
            fields.push(("revisionId", event.revision_id.clone()));
            fields.push(("stage", event.stage.clone()));
        }
        fields.push(("hookStatus", result.status().to_string()));
        if let Some(delay) = result.callback_delay_seconds() {
            fields.push(("callBackDelay", delay.to_string()));
        }
        let level = match verdict {
            Ok(Verdict::Completed(outcome)) => {
                fields.push(("outcome", format!("{outcome:?}")));
                if result.status() == HookStatus::Failed {
                    log::Level::Warn
                } else {
                    log::Level::Info
                }
            }
            Ok(Verdict::BudgetExceeded) => {
                fields.push(("outcome", "BudgetExceeded".to_owned()));
                log::Level::Warn
            }
            Err(err) => {
                fields.push(("error", err.kind().to_owned()));
                fields.push(("reason", err.to_string()));
                log::Level::Error
            }
        };
        self.audit.log(level, &fields);
    }
}

/// Delay for the given attempt, doubling from `base` and capped at `max`
pub fn exponential_delay(base: u64, attempt: u32, max: u64) -> u64 {
    2_u64
        .checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(max, |delay| delay.min(max))
}

fn remaining_budget(deadline_in_ms: u64) -> Duration {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Duration::from_millis(deadline_in_ms)
        .saturating_sub(now)
        .saturating_sub(DEADLINE_MARGIN)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}
