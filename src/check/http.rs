use super::{Check, CheckOutcome};
use crate::config::Config;

/// Probes an http health endpoint of the new revision.
///
/// * `2xx`: [`CheckOutcome::Success`]
/// * `503`, refused connection or timeout: [`CheckOutcome::Pending`], the
///   revision is probably still starting
/// * any other status: [`CheckOutcome::Failure`]
#[derive(Debug, Clone)]
pub struct HttpCheck {
    client: reqwest::Client,
    url_template: String,
}

impl HttpCheck {
    /// Placeholder in the url which is replaced with the revision id
    pub const REVISION_PLACEHOLDER: &'static str = "{revisionId}";

    /// Creates a check probing `url_template`. Single requests are bound
    /// by `timeout`.
    pub fn new(
        url_template: impl Into<String>,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Unable to build http client")?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    /// Creates the check from `healthUrl` and `timeoutSeconds`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        use anyhow::Context;

        let url = config
            .health_url
            .as_deref()
            .context("Check type http requires healthUrl")?;
        Self::new(url, config.timeout())
    }

    /// Url probed for the given revision. The revision is percent encoded
    /// as a single path segment.
    pub fn url_for(&self, revision_id: &str) -> String {
        self.url_template.replace(
            Self::REVISION_PLACEHOLDER,
            &urlencoding::encode(revision_id),
        )
    }
}

#[async_trait::async_trait]
impl Check for HttpCheck {
    async fn run(&self, revision_id: &str) -> anyhow::Result<CheckOutcome> {
        let url = self.url_for(revision_id);
        log::info!("Probing {}", url);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(outcome_for(response.status())),
            Err(err) if err.is_connect() || err.is_timeout() => {
                log::warn!("Health endpoint not reachable yet: {}", err);
                Ok(CheckOutcome::Pending)
            }
            Err(err) => Err(anyhow::Error::new(err).context(format!("Unable to probe {url}"))),
        }
    }
}

fn outcome_for(status: reqwest::StatusCode) -> CheckOutcome {
    if status.is_success() {
        CheckOutcome::Success
    } else if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        CheckOutcome::Pending
    } else {
        CheckOutcome::Failure
    }
}
