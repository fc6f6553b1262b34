//! 🕵️ The audit trail: a diary of everything the pipeline did for one request.
//!
//! Which node got pinged, which one fell over, when we sniffed, when we gave up.
//! Every entry is also emitted as a tracing event the moment it happens, so the
//! same story shows up in your logs without anybody remembering to print it.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use url::Url;

/// 📜 Things that can happen to a request on its way through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEvent {
    SniffOnStartup,
    SniffOnFail,
    SniffOnStaleCluster,
    SniffSuccess,
    SniffFailure,
    PingSuccess,
    PingFailure,
    Resurrection,
    AllNodesDead,
    BadResponse,
    HealthyResponse,
    BadRequest,
    MaxTimeoutReached,
    MaxRetriesReached,
    FailedOverAllNodes,
    NoNodesAttempted,
}

impl AuditEvent {
    fn is_trouble(&self) -> bool {
        matches!(
            self,
            AuditEvent::SniffFailure
                | AuditEvent::PingFailure
                | AuditEvent::AllNodesDead
                | AuditEvent::BadResponse
                | AuditEvent::MaxTimeoutReached
                | AuditEvent::MaxRetriesReached
                | AuditEvent::FailedOverAllNodes
                | AuditEvent::NoNodesAttempted
        )
    }
}

/// 🧾 One line in the diary.
#[derive(Debug, Clone)]
pub struct Audit {
    pub event: AuditEvent,
    pub node: Option<Url>,
    /// offset from the start of the request
    pub started: Duration,
    pub took: Duration,
    pub detail: Option<String>,
}

/// 📚 All the lines, in order.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    origin: Instant,
    entries: Vec<Audit>,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            entries: Vec::new(),
        }
    }
}

impl AuditTrail {
    /// ✍️ Record an event that happened instantly (or whose duration we don't care about).
    pub(crate) fn record(&mut self, event: AuditEvent, node: Option<&Url>, detail: Option<String>) {
        self.record_timed(event, node, Instant::now(), detail);
    }

    /// ⏱️ Record an event that started at `began` and just finished.
    pub(crate) fn record_timed(
        &mut self,
        event: AuditEvent,
        node: Option<&Url>,
        began: Instant,
        detail: Option<String>,
    ) {
        let audit = Audit {
            event,
            node: node.cloned(),
            started: began.saturating_duration_since(self.origin),
            took: began.elapsed(),
            detail,
        };
        let node_label = audit.node.as_ref().map(Url::as_str).unwrap_or("-");
        let detail_label = audit.detail.as_deref().unwrap_or("");
        if event.is_trouble() {
            warn!(event = ?event, node = node_label, took = ?audit.took, "⚠️ pipeline: {detail_label}");
        } else {
            debug!(event = ?event, node = node_label, took = ?audit.took, "📡 pipeline: {detail_label}");
        }
        self.entries.push(audit);
    }

    pub fn entries(&self) -> &[Audit] {
        &self.entries
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.entries.iter().map(|audit| audit.event).collect()
    }

    pub fn contains(&self, event: AuditEvent) -> bool {
        self.entries.iter().any(|audit| audit.event == event)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for AuditTrail {
    /// 🖨️ The "debug information" view, one line per event.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Audit trail of this call:")?;
        for (i, audit) in self.entries.iter().enumerate() {
            write!(
                f,
                " - [{}] {:?}: Node: {} Took: {:?}",
                i + 1,
                audit.event,
                audit.node.as_ref().map(Url::as_str).unwrap_or("-"),
                audit.took
            )?;
            if let Some(detail) = &audit.detail {
                write!(f, " ({detail})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_diary_keeps_its_order() {
        let node = Url::parse("http://10.0.0.1:9200").unwrap();
        let mut trail = AuditTrail::default();
        trail.record(AuditEvent::PingFailure, Some(&node), Some("connection refused".into()));
        trail.record(AuditEvent::HealthyResponse, Some(&node), None);

        assert_eq!(
            trail.events(),
            vec![AuditEvent::PingFailure, AuditEvent::HealthyResponse]
        );
        assert!(trail.contains(AuditEvent::PingFailure));
        assert!(!trail.contains(AuditEvent::AllNodesDead));

        let rendered = trail.to_string();
        assert!(rendered.contains("[1] PingFailure: Node: http://10.0.0.1:9200/"));
        assert!(rendered.contains("(connection refused)"));
        assert!(rendered.contains("[2] HealthyResponse"));
    }
}
