//! Diagnostic events emitted by the pipeline stages.
//!
//! Every stage reports through an [`EventSink`] rather than calling the
//! logger directly, so the per-request order of events can be observed.
//! [`TracingSink`] is the production sink (one `tracing` record per
//! event); [`MemorySink`] keeps events in memory.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::registry::{HandlerId, MarkerLevel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    GateAdmitted {
        handler: HandlerId,
        level: MarkerLevel,
    },
    GateRejected {
        handler: HandlerId,
        path: String,
    },
    AdviceBefore {
        handler: HandlerId,
    },
    AdviceTiming {
        handler: HandlerId,
        elapsed_ms: u64,
    },
    AdviceReturned {
        handler: HandlerId,
        value: String,
    },
    AdviceThrew {
        handler: HandlerId,
        error: String,
    },
    AdviceAfter {
        handler: HandlerId,
    },
    RequestBody {
        method: String,
        path: String,
        body: String,
    },
    ResponseBody {
        status: u16,
        body: String,
    },
}

impl PipelineEvent {
    /// Short stable name of the event kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GateAdmitted { .. } => "gate-admit",
            Self::GateRejected { .. } => "gate-reject",
            Self::AdviceBefore { .. } => "before",
            Self::AdviceTiming { .. } => "timing",
            Self::AdviceReturned { .. } => "after-returning",
            Self::AdviceThrew { .. } => "after-throwing",
            Self::AdviceAfter { .. } => "after",
            Self::RequestBody { .. } => "request-body",
            Self::ResponseBody { .. } => "response-body",
        }
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GateAdmitted { handler, level } => {
                write!(f, "gate admitted {handler} ({level}-level marker)")
            }
            Self::GateRejected { handler, path } => {
                write!(f, "gate rejected {handler}: no open-access marker for {path}")
            }
            Self::AdviceBefore { handler } => write!(f, "before {handler}"),
            Self::AdviceTiming {
                handler,
                elapsed_ms,
            } => write!(f, "{handler} took {elapsed_ms}ms"),
            Self::AdviceReturned { handler, value } => {
                write!(f, "after returning {handler}: {value}")
            }
            Self::AdviceThrew { handler, error } => write!(f, "after throwing {handler}: {error}"),
            Self::AdviceAfter { handler } => write!(f, "after {handler}"),
            Self::RequestBody { method, path, body } => write!(f, "req {method} {path}: {body}"),
            Self::ResponseBody { status, body } => write!(f, "res {status}: {body}"),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Writes each event as one `tracing` record at `INFO` (errors at `WARN`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::GateAdmitted { handler, level } => {
                tracing::info!(handler = %handler, level = %level, "{event}");
            }
            PipelineEvent::GateRejected { handler, path } => {
                tracing::info!(handler = %handler, path = %path, "{event}");
            }
            PipelineEvent::AdviceTiming {
                handler,
                elapsed_ms,
            } => {
                tracing::info!(handler = %handler, elapsed_ms, "{event}");
            }
            PipelineEvent::AdviceThrew { handler, .. } => {
                tracing::warn!(handler = %handler, "{event}");
            }
            PipelineEvent::AdviceBefore { handler }
            | PipelineEvent::AdviceReturned { handler, .. }
            | PipelineEvent::AdviceAfter { handler } => {
                tracing::info!(handler = %handler, "{event}");
            }
            PipelineEvent::RequestBody { .. } | PipelineEvent::ResponseBody { .. } => {
                tracing::info!("{event}");
            }
        }
    }
}

/// Keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(PipelineEvent::kind)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
