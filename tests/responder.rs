use ecs_lifecycle_hook::{
    AuditFields, AuditSink, Backoff, Check, CheckOutcome, Config, HookDetails, HookEvent,
    HookResponder, HookResult, HookStatus, Noop, ATTEMPT_KEY,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<(log::Level, AuditFields)>>,
}

impl RecordingSink {
    fn entries(&self) -> Vec<(log::Level, AuditFields)> {
        self.entries.lock().expect("Poisoned sink").clone()
    }

    fn field(&self, index: usize, key: &str) -> Option<String> {
        self.entries()
            .get(index)?
            .1
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
    }
}

impl AuditSink for RecordingSink {
    fn log(&self, level: log::Level, fields: &AuditFields) {
        self.entries
            .lock()
            .expect("Poisoned sink")
            .push((level, fields.clone()));
    }
}

struct Fixed(CheckOutcome);

#[async_trait::async_trait]
impl Check for Fixed {
    async fn run(&self, _revision_id: &str) -> anyhow::Result<CheckOutcome> {
        Ok(self.0)
    }
}

struct Erroring;

#[async_trait::async_trait]
impl Check for Erroring {
    async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome> {
        anyhow::bail!("smoke test against {} refused", revision_id)
    }
}

struct Panicking;

#[async_trait::async_trait]
impl Check for Panicking {
    async fn run(&self, _revision_id: &str) -> anyhow::Result<CheckOutcome> {
        panic!("health endpoint crashed")
    }
}

struct Slow;

#[async_trait::async_trait]
impl Check for Slow {
    async fn run(&self, _revision_id: &str) -> anyhow::Result<CheckOutcome> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(CheckOutcome::Success)
    }
}

#[derive(Default)]
struct Counting {
    calls: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Check for Counting {
    async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome> {
        self.calls
            .lock()
            .expect("Poisoned calls")
            .push(revision_id.to_owned());
        Ok(CheckOutcome::Success)
    }
}

fn responder<C: Check>(check: C) -> (HookResponder<C, Arc<RecordingSink>>, Arc<RecordingSink>) {
    responder_with(check, Config::default())
}

fn responder_with<C: Check>(
    check: C,
    config: Config,
) -> (HookResponder<C, Arc<RecordingSink>>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (HookResponder::with_audit(check, config, Arc::clone(&sink)), sink)
}

fn event() -> HookEvent {
    HookEvent::new("d1", "r1", "AfterInstall")
}

fn to_json(result: &HookResult) -> serde_json::Value {
    serde_json::to_value(result).expect("Unable to serialize result")
}

#[tokio::test]
async fn test_success_check_succeeds() {
    let (responder, _) = responder(Fixed(CheckOutcome::Success));
    let res = responder.evaluate(&event()).await;
    assert_eq!(res.status(), HookStatus::Succeeded);
    assert_eq!(res.callback_delay_seconds(), None);
    assert_eq!(to_json(&res), serde_json::json!({"hookStatus": "SUCCEEDED"}));
}

#[tokio::test]
async fn test_failure_check_fails() {
    let (responder, sink) = responder(Fixed(CheckOutcome::Failure));
    let res = responder.evaluate(&event()).await;
    assert_eq!(res.status(), HookStatus::Failed);
    assert_eq!(res.callback_delay_seconds(), None);
    assert_eq!(sink.entries()[0].0, log::Level::Warn);
    assert_eq!(sink.field(0, "outcome").as_deref(), Some("Failure"));
}

#[tokio::test]
async fn test_pending_check_is_in_progress() {
    let (responder, _) = responder(Fixed(CheckOutcome::Pending));
    let res = responder.evaluate(&event()).await;
    assert_eq!(res.status(), HookStatus::InProgress);
    assert_eq!(
        to_json(&res),
        serde_json::json!({"hookStatus": "IN_PROGRESS", "callBackDelay": 30, "hookDetails": {}})
    );
}

#[tokio::test]
async fn test_every_known_stage_runs_the_check() {
    let check = Arc::new(Counting::default());
    let (responder, _) = responder(Arc::clone(&check));
    for stage in ecs_lifecycle_hook::Stage::ALL {
        let res = responder
            .evaluate(&HookEvent::new("d1", "r1", stage.to_string()))
            .await;
        assert_eq!(res.status(), HookStatus::Succeeded);
    }
    assert_eq!(check.calls.lock().expect("Poisoned calls").len(), 5);
}

#[tokio::test]
async fn test_unknown_stage_fails_without_running_the_check() {
    let check = Arc::new(Counting::default());
    let (responder, sink) = responder(Arc::clone(&check));
    let res = responder
        .evaluate(&HookEvent::new("d1", "r1", "InvalidStage"))
        .await;
    assert_eq!(to_json(&res), serde_json::json!({"hookStatus": "FAILED"}));
    assert!(check.calls.lock().expect("Poisoned calls").is_empty());
    assert_eq!(sink.field(0, "error").as_deref(), Some("UnknownStageError"));
    assert_eq!(sink.entries()[0].0, log::Level::Error);
}

#[tokio::test]
async fn test_check_error_fails() {
    let (responder, sink) = responder(Erroring);
    let res = responder.evaluate(&event()).await;
    assert_eq!(res.status(), HookStatus::Failed);
    assert_eq!(sink.field(0, "error").as_deref(), Some("CheckExecutionError"));
    let reason = sink.field(0, "reason").expect("Missing reason");
    assert!(reason.contains("smoke test against r1 refused"), "{reason}");
}

#[tokio::test]
async fn test_check_panic_fails() {
    let (responder, sink) = responder(Panicking);
    let res = responder.evaluate(&event()).await;
    assert_eq!(res.status(), HookStatus::Failed);
    let reason = sink.field(0, "reason").expect("Missing reason");
    assert!(reason.contains("health endpoint crashed"), "{reason}");
}

#[tokio::test(start_paused = true)]
async fn test_slow_check_is_in_progress() {
    let config = Config {
        timeout_seconds: 5,
        poll_interval_seconds: 45,
        ..Config::default()
    };
    let (responder, sink) = responder_with(Slow, config);
    let res = responder.evaluate(&event()).await;
    assert_eq!(res.status(), HookStatus::InProgress);
    assert_eq!(res.callback_delay_seconds(), Some(45));
    assert_eq!(sink.field(0, "outcome").as_deref(), Some("BudgetExceeded"));
}

#[tokio::test]
async fn test_zero_budget_still_takes_ready_verdict() {
    let (responder, _) = responder(Noop);
    let res = responder.evaluate_within(&event(), Duration::ZERO).await;
    assert_eq!(res.status(), HookStatus::Succeeded);
}

#[tokio::test]
async fn test_exponential_backoff_counts_attempts() {
    let config = Config {
        backoff: Backoff::Exponential,
        poll_interval_seconds: 10,
        max_callback_delay_seconds: 35,
        ..Config::default()
    };
    let (responder, _) = responder_with(Fixed(CheckOutcome::Pending), config);

    let mut event = event();
    let mut delays = Vec::new();
    for _ in 0..4 {
        let res = responder.evaluate(&event).await;
        delays.push(res.callback_delay_seconds().expect("Missing delay"));
        event.hook_details = res.details().clone();
    }
    assert_eq!(delays, vec![10, 20, 35, 35]);
    assert_eq!(
        event.hook_details,
        HookDetails::from([(ATTEMPT_KEY.to_owned(), "4".to_owned())])
    );
}

#[tokio::test]
async fn test_exponential_backoff_ignores_garbage_attempt() {
    let config = Config {
        backoff: Backoff::Exponential,
        ..Config::default()
    };
    let (responder, _) = responder_with(Fixed(CheckOutcome::Pending), config);
    let mut event = event();
    let _ = event
        .hook_details
        .insert(ATTEMPT_KEY.to_owned(), "many".to_owned());
    let res = responder.evaluate(&event).await;
    assert_eq!(res.callback_delay_seconds(), Some(30));
    assert_eq!(res.details().get(ATTEMPT_KEY).map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_identical_events_give_identical_results() {
    let (responder, _) = responder(Fixed(CheckOutcome::Success));
    let first = responder.evaluate(&event()).await;
    let second = responder.evaluate(&event()).await;
    assert_eq!(first, second);
    assert_eq!(to_json(&first), to_json(&second));
}

#[tokio::test]
async fn test_one_audit_entry_per_invocation() {
    let (responder, sink) = responder(Fixed(CheckOutcome::Pending));
    let _ = responder.evaluate(&event()).await;
    let _ = responder
        .evaluate(&HookEvent::new("d2", "r2", "InvalidStage"))
        .await;
    let _ = responder
        .handle(serde_json::json!({"unexpected": true}), None)
        .await;

    let entries = sink.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(sink.field(0, "deploymentId").as_deref(), Some("d1"));
    assert_eq!(sink.field(0, "callBackDelay").as_deref(), Some("30"));
    assert_eq!(sink.field(1, "stage").as_deref(), Some("InvalidStage"));
    assert_eq!(sink.field(2, "error").as_deref(), Some("MalformedEvent"));
    assert_eq!(sink.field(2, "hookStatus").as_deref(), Some("FAILED"));
}

#[tokio::test]
async fn test_handle_parses_raw_payload() {
    let (responder, _) = responder(Fixed(CheckOutcome::Pending));
    let res = responder
        .handle(
            serde_json::json!({
                "deploymentId": "d1",
                "revisionId": "r1",
                "stage": "BeforeAllowTraffic",
            }),
            None,
        )
        .await;
    assert_eq!(res.status(), HookStatus::InProgress);
}

#[tokio::test]
async fn test_handle_with_past_deadline_reports_in_progress() {
    let (responder, sink) = responder(Slow);
    let payload = serde_json::to_value(event()).expect("Unable to serialize event");
    let res = responder.handle(payload, Some(0)).await;
    assert_eq!(res.status(), HookStatus::InProgress);
    assert_eq!(sink.field(0, "outcome").as_deref(), Some("BudgetExceeded"));
}
