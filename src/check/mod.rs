//! Validation strategies run by the hook.
//!
//! # Usage
//!
//! ```no_run
//! struct SmokeTest;
//!
//! #[async_trait::async_trait]
//! impl ecs_lifecycle_hook::Check for SmokeTest {
//!     async fn run(&self, revision_id: &str) -> anyhow::Result<ecs_lifecycle_hook::CheckOutcome> {
//!         // Validate the revision, e.g. by running a smoke test against it.
//!         // Return `Pending` if the revision is not ready to be judged yet,
//!         // the deployment controller will call again later.
//!         Ok(ecs_lifecycle_hook::CheckOutcome::Success)
//!     }
//! }
//!
//! pub fn main() -> anyhow::Result<()> {
//!     let config = ecs_lifecycle_hook::Config::from_env()?;
//!     ecs_lifecycle_hook::exec_tokio_with(config, SmokeTest)
//! }
//! ```

#[cfg(feature = "http_check")]
mod http;

#[cfg(feature = "http_check")]
#[cfg_attr(docsrs, doc(cfg(feature = "http_check")))]
pub use http::HttpCheck;

use crate::config::{CheckType, Config};

/// Verdict of a single check run
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
    /// The revision is healthy
    Success,
    /// The revision is broken
    Failure,
    /// No verdict yet
    Pending,
}

/// Validation which gates a deployment stage. Called once per hook
/// invocation with the revision which is rolled out.
///
/// Returning an error, or panicking, fails the hook. The check may get
/// dropped before completion when the invocation budget runs out.
#[async_trait::async_trait]
pub trait Check: Send + Sync {
    /// Validates the revision
    async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome>;
}

#[async_trait::async_trait]
impl<C: Check + ?Sized> Check for std::sync::Arc<C> {
    async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome> {
        (**self).run(revision_id).await
    }
}

#[async_trait::async_trait]
impl<C: Check + ?Sized> Check for Box<C> {
    async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome> {
        (**self).run(revision_id).await
    }
}

/// Check which always passes
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

#[async_trait::async_trait]
impl Check for Noop {
    async fn run(&self, _revision_id: &str) -> anyhow::Result<CheckOutcome> {
        Ok(CheckOutcome::Success)
    }
}

/// Checks which can be selected through [`Config::check_type`]
#[derive(Debug)]
pub enum BuiltinCheck {
    /// See [`Noop`]
    Noop(Noop),
    /// See [`HttpCheck`]
    #[cfg(feature = "http_check")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http_check")))]
    Http(HttpCheck),
}

impl BuiltinCheck {
    /// Creates the check selected in `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.check_type {
            CheckType::Noop => Ok(Self::Noop(Noop)),
            #[cfg(feature = "http_check")]
            CheckType::Http => Ok(Self::Http(HttpCheck::from_config(config)?)),
            #[cfg(not(feature = "http_check"))]
            CheckType::Http => Err(anyhow::anyhow!(
                "Check type http requires the http_check feature"
            )),
        }
    }
}

#[async_trait::async_trait]
impl Check for BuiltinCheck {
    async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome> {
        match self {
            Self::Noop(check) => check.run(revision_id).await,
            #[cfg(feature = "http_check")]
            Self::Http(check) => check.run(revision_id).await,
        }
    }
}
