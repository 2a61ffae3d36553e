//! Audit trail of hook invocations.
//!
//! Every evaluation writes exactly one entry to an [`AuditSink`]. The sink is
//! injected into the [`crate::HookResponder`], so tests can record entries
//! and deployments can route them anywhere. [`LogSink`] forwards them to the
//! [`log`] facade.

/// Ordered key value pairs of one audit entry
pub type AuditFields = Vec<(&'static str, String)>;

/// Receives one entry per hook invocation
pub trait AuditSink: Send + Sync {
    /// Writes an audit entry. Must not fail or block for long, as it is
    /// called on the invocation path.
    fn log(&self, level: log::Level, fields: &AuditFields);
}

/// Writes audit entries as `key=value` lines to the [`log`] facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AuditSink for LogSink {
    fn log(&self, level: log::Level, fields: &AuditFields) {
        log::log!(target: "ecs_lifecycle_hook::audit", level, "{}", format_fields(fields));
    }
}

impl<S: AuditSink + ?Sized> AuditSink for std::sync::Arc<S> {
    fn log(&self, level: log::Level, fields: &AuditFields) {
        (**self).log(level, fields);
    }
}

/// Renders fields as space separated `key=value` pairs. Values containing
/// whitespace, quotes or `=` are quoted.
pub fn format_fields(fields: &AuditFields) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            let needs_quotes =
                value.contains(|c: char| c.is_whitespace() || c == '"' || c == '=');
            if value.is_empty() || needs_quotes {
                format!("{key}={value:?}")
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
