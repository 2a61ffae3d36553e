use crate::result::HookDetails;

/// `Event` which is send by the deployment controller to the hook lambda
///
/// The stage is kept as the raw name the controller sent. It is validated
/// with [`HookEvent::stage`] when the hook is evaluated, so an unknown stage
/// still reaches the responder and is answered instead of faulting the
/// invocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct HookEvent {
    /// Id of the deployment which is in progress
    #[serde(rename = "deploymentId")]
    pub deployment_id: String,
    /// Id of the revision the deployment rolls out
    #[serde(rename = "revisionId")]
    pub revision_id: String,
    /// Name of the lifecycle stage which triggered the hook
    #[serde(rename = "stage")]
    pub stage: String,
    /// Details returned by a previous `IN_PROGRESS` answer. The controller
    /// echoes them back when it re-invokes the hook.
    #[serde(rename = "hookDetails", default)]
    pub hook_details: HookDetails,
}

impl HookEvent {
    /// Create an event without any previous hook details
    pub fn new(
        deployment_id: impl Into<String>,
        revision_id: impl Into<String>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            revision_id: revision_id.into(),
            stage: stage.into(),
            hook_details: HookDetails::default(),
        }
    }

    /// Parses the stage name of the event
    pub fn stage(&self) -> Result<Stage, UnknownStageError> {
        self.stage.parse()
    }
}

/// Lifecycle stages at which the deployment controller calls a hook
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Before the new revision gets installed
    BeforeInstall,
    /// After the new revision got installed
    AfterInstall,
    /// After test traffic was routed to the new revision
    AfterAllowTestTraffic,
    /// Before production traffic is routed to the new revision
    BeforeAllowTraffic,
    /// After production traffic was routed to the new revision
    AfterAllowTraffic,
}

impl Stage {
    /// All known stages in deployment order
    pub const ALL: [Self; 5] = [
        Self::BeforeInstall,
        Self::AfterInstall,
        Self::AfterAllowTestTraffic,
        Self::BeforeAllowTraffic,
        Self::AfterAllowTraffic,
    ];

    /// Name of the stage as used on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeInstall => "BeforeInstall",
            Self::AfterInstall => "AfterInstall",
            Self::AfterAllowTestTraffic => "AfterAllowTestTraffic",
            Self::BeforeAllowTraffic => "BeforeAllowTraffic",
            Self::AfterAllowTraffic => "AfterAllowTraffic",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = UnknownStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStageError(s.to_owned()))
    }
}

/// The event named a stage which is not part of [`Stage`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lifecycle stage: {0:?}")]
pub struct UnknownStageError(pub String);
