//! This crate provides types and a lambda runtime to answer
//! lifecycle hooks of ECS deployments in rust. A hook gates
//! a deployment stage: the deployment controller invokes the
//! lambda with a [`HookEvent`] and waits for a [`HookResult`]
//! which is either `SUCCEEDED`, `FAILED` or `IN_PROGRESS`.
//!
//! # Basic hook with a built-in check
//!
//! The check performed by the hook is selected through environment
//! variables (see [`Config`]). Without any configuration the hook
//! always answers `SUCCEEDED`.
//!
//! ```no_run
//! pub fn main() -> anyhow::Result<()> {
//!     simple_logger::SimpleLogger::new()
//!         .with_level(log::LevelFilter::Info)
//!         .init()?;
//!     ecs_lifecycle_hook::exec_tokio()
//! }
//! ```
//!
//! # Custom checks
//!
//! Any type implementing [`Check`] can gate the deployment. The check
//! receives the revision which is rolled out and returns a [`CheckOutcome`]:
//!
//! ```no_run
//! use ecs_lifecycle_hook::{Check, CheckOutcome, Config};
//!
//! struct MigrationsApplied;
//!
//! #[async_trait::async_trait]
//! impl Check for MigrationsApplied {
//!     async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome> {
//!         log::info!("Checking migrations of {}", revision_id);
//!         Ok(CheckOutcome::Pending)
//!     }
//! }
//!
//! pub fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     ecs_lifecycle_hook::exec_tokio_with(config, MigrationsApplied)
//! }
//! ```
//!
//! # Outcomes
//!
//! * [`CheckOutcome::Success`] answers `SUCCEEDED`, the deployment advances.
//! * [`CheckOutcome::Failure`] answers `FAILED`, the deployment is stopped
//!   and rolled back.
//! * [`CheckOutcome::Pending`] answers `IN_PROGRESS` with a callback delay.
//!   The controller calls the hook again after the delay. The delay is either
//!   fixed or grows exponentially, see [`Backoff`].
//!
//! The hook fails closed: an unknown stage, a payload which is not a
//! [`HookEvent`], a check returning an error and a panicking check all
//! answer `FAILED`. The lambda invocation itself never fails, as a failed
//! invocation would leave the deployment waiting on the hook.
//!
//! # Timeout handling
//!
//! The check gets `timeoutSeconds` per invocation, but never more than the
//! lambda has left minus 100 milliseconds. If it does not complete within
//! that budget, it is dropped and the hook answers `IN_PROGRESS`. The check
//! is only dropped while it awaits, so checks must not block the executor.
//!
//! # Audit
//!
//! Every invocation writes exactly one entry to an [`AuditSink`]. By default
//! entries are written to the [`log`] facade, so logging has to be set up
//! before the runtime is started for them to be visible.

#![warn(
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    non_ascii_idents,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unstable_features,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    variant_size_differences
)]
#![warn(
    clippy::correctness,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cargo,
    clippy::nursery
)]
#![allow(clippy::multiple_crate_versions, clippy::future_not_send)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod audit;
pub mod check;
mod config;
mod error;
mod event;
mod responder;
mod result;

pub use audit::{AuditFields, AuditSink, LogSink};
pub use check::{BuiltinCheck, Check, CheckOutcome, Noop};
pub use config::{Backoff, CheckType, Config, ConfigError};
pub use error::HookError;
pub use event::{HookEvent, Stage, UnknownStageError};
pub use responder::{exponential_delay, HookResponder, ATTEMPT_KEY};
pub use result::{HookDetails, HookResult, HookStatus};

#[cfg(test)]
use simple_logger as _;

/// Lambda entrypoint. This function sets up a
/// multi-thread runtime and executes [`exec`]. If you
/// already have your own runtime, use the [`exec`]
/// function.
pub fn exec_tokio() -> anyhow::Result<()> {
    tokio_runtime()?.block_on(exec())
}

/// Like [`exec_tokio`], but runs a custom [`Check`]
pub fn exec_tokio_with<C: Check>(config: Config, check: C) -> anyhow::Result<()> {
    tokio_runtime()?.block_on(exec_with(config, check))
}

fn tokio_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    use anyhow::Context;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Unable to build tokio runtime")
}

/// Lambda entrypoint. This function requires a
/// running tokio runtime. Alternativly use [`exec_tokio`]
/// which creates one.
///
/// Reads the [`Config`] from the environment and runs
/// the [`BuiltinCheck`] it selects.
pub async fn exec() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let check = BuiltinCheck::from_config(&config)?;
    exec_with(config, check).await
}

/// Lambda entrypoint for a custom [`Check`]. This function
/// requires a running tokio runtime.
pub async fn exec_with<C: Check>(config: Config, check: C) -> anyhow::Result<()> {
    use anyhow::anyhow;
    use lambda_runtime::{service_fn, LambdaEvent};

    config.validate()?;
    log::info!("Starting hook runtime with {:?}", config);
    let responder = HookResponder::new(check, config);
    let responder_ref = &responder;
    lambda_runtime::run(service_fn(
        move |invocation: LambdaEvent<serde_json::Value>| async move {
            log::info!("Received hook invocation with event: {}", invocation.payload);
            let deadline: u64 = invocation.context.deadline;
            let res = responder_ref.handle(invocation.payload, Some(deadline)).await;
            log::info!("Completed hook invocation");
            Ok::<_, lambda_runtime::Error>(res)
        },
    ))
    .await
    .map_err(|e| anyhow!(e))
}

/// TestData which can be used to replay hook invocations
/// locally in combination with [`exec_test`].
#[derive(serde::Deserialize, Clone, Debug)]
#[cfg(feature = "test")]
#[cfg_attr(docsrs, doc(cfg(feature = "test")))]
pub struct TestData {
    /// Configuration of the responder, defaults apply to missing keys
    #[serde(default)]
    pub config: Config,
    /// Raw payloads, as send by the deployment controller
    pub invocations: Vec<serde_json::Value>,
}

/// Test entrypoint. Replays the invocations of `test_data`
/// (json, see [`TestData`]) against `check` without a lambda
/// runtime and returns one result per invocation.
#[cfg(feature = "test")]
#[cfg_attr(docsrs, doc(cfg(feature = "test")))]
pub fn exec_test<C: Check>(test_data: &str, check: C) -> anyhow::Result<Vec<HookResult>> {
    use anyhow::Context;

    let test_data: TestData =
        serde_json::from_str(test_data).context("Unable to deserialize test_data")?;
    test_data.config.validate()?;
    let responder = HookResponder::new(check, test_data.config);
    log::info!("Starting hook test runtime");
    tokio_runtime()?.block_on(async {
        let mut results = Vec::with_capacity(test_data.invocations.len());
        for (i, payload) in test_data.invocations.into_iter().enumerate() {
            log::info!("Invocation: {}", i);
            let res = responder.handle(payload, None).await;
            log::info!("{:?}", res);
            results.push(res);
        }
        Ok(results)
    })
}
