/// Diagnostic details attached to a hook answer
pub type HookDetails = std::collections::BTreeMap<String, String>;

/// Status reported back to the deployment controller
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
pub enum HookStatus {
    /// Validation passed, the deployment advances
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    /// Validation failed, the deployment is halted or rolled back
    #[serde(rename = "FAILED")]
    Failed,
    /// Validation is not done yet, the controller calls again later
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
}

impl HookStatus {
    /// Name of the status as used on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::InProgress => "IN_PROGRESS",
        }
    }
}

impl std::fmt::Display for HookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Return` which is send back to the deployment controller
///
/// A callback delay exists if and only if the status is
/// [`HookStatus::InProgress`], and it is never zero. The constructors are
/// the only way to build a result, deserialization rejects payloads which
/// break that rule.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "RawHookResult")]
pub struct HookResult {
    status: HookStatus,
    callback_delay_seconds: Option<u64>,
    details: HookDetails,
}

impl HookResult {
    /// Validation passed
    pub const fn succeeded() -> Self {
        Self {
            status: HookStatus::Succeeded,
            callback_delay_seconds: None,
            details: HookDetails::new(),
        }
    }

    /// Validation failed
    pub const fn failed() -> Self {
        Self {
            status: HookStatus::Failed,
            callback_delay_seconds: None,
            details: HookDetails::new(),
        }
    }

    /// Validation is still running. A delay of zero is raised to one second,
    /// as the controller would otherwise re-invoke immediately.
    pub fn in_progress(callback_delay_seconds: u64) -> Self {
        Self {
            status: HookStatus::InProgress,
            callback_delay_seconds: Some(callback_delay_seconds.max(1)),
            details: HookDetails::new(),
        }
    }

    /// Replaces the diagnostic details
    #[must_use]
    pub fn with_details(mut self, details: HookDetails) -> Self {
        self.details = details;
        self
    }

    /// Reported status
    pub const fn status(&self) -> HookStatus {
        self.status
    }

    /// Seconds the controller waits before it calls the hook again
    pub const fn callback_delay_seconds(&self) -> Option<u64> {
        self.callback_delay_seconds
    }

    /// Diagnostic details
    pub const fn details(&self) -> &HookDetails {
        &self.details
    }
}

impl serde::Serialize for HookResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let write_details = self.status == HookStatus::InProgress || !self.details.is_empty();
        let len = 1
            + usize::from(self.callback_delay_seconds.is_some())
            + usize::from(write_details);
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("hookStatus", &self.status)?;
        if let Some(delay) = self.callback_delay_seconds {
            map.serialize_entry("callBackDelay", &delay)?;
        }
        if write_details {
            map.serialize_entry("hookDetails", &self.details)?;
        }
        map.end()
    }
}

#[derive(serde::Deserialize)]
struct RawHookResult {
    #[serde(rename = "hookStatus")]
    status: HookStatus,
    #[serde(rename = "callBackDelay", default)]
    callback_delay_seconds: Option<u64>,
    #[serde(rename = "hookDetails", default)]
    details: HookDetails,
}

impl TryFrom<RawHookResult> for HookResult {
    type Error = String;

    fn try_from(raw: RawHookResult) -> Result<Self, Self::Error> {
        let result = match (raw.status, raw.callback_delay_seconds) {
            (HookStatus::InProgress, Some(0)) => {
                return Err("callBackDelay must be greater than zero".into())
            }
            (HookStatus::InProgress, Some(delay)) => Self::in_progress(delay),
            (HookStatus::InProgress, None) => {
                return Err("callBackDelay is required for IN_PROGRESS".into())
            }
            (status, Some(_)) => return Err(format!("callBackDelay is not allowed for {status}")),
            (HookStatus::Succeeded, None) => Self::succeeded(),
            (HookStatus::Failed, None) => Self::failed(),
        };
        Ok(result.with_details(raw.details))
    }
}
