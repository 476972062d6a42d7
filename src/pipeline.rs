//! Pipeline composition.
//!
//! [`Pipeline`] owns the constructed stages and wires them around the
//! business handlers in a fixed order:
//!
//! ```text
//! body capture  ->  capability gate  ->  around-advice  ->  handler
//!  (layer)          (route_layer)        (per handler)
//! ```
//!
//! The gate runs as a route layer so the matched route template is known
//! when it resolves the handler descriptor. Stages switched off in the
//! config are left out; the relative order of the remaining ones never
//! changes.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::advice::AdviceStage;
use crate::capture::{body_capture, BodyCapture};
use crate::config::model::Config;
use crate::events::EventSink;
use crate::gate::{capability_gate, CapabilityGate};
use crate::handlers;
use crate::registry::HandlerRegistry;

/// Which stages are installed, as reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineInfo {
    pub gate: bool,
    pub capture: bool,
    pub advice_group: Option<String>,
    pub handlers: usize,
}

pub struct Pipeline {
    registry: Arc<HandlerRegistry>,
    gate: Option<Arc<CapabilityGate>>,
    capture: Arc<BodyCapture>,
    advice: Arc<AdviceStage>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        registry: Arc<HandlerRegistry>,
        gate: Option<CapabilityGate>,
        capture: BodyCapture,
        advice: AdviceStage,
    ) -> Self {
        Self {
            registry,
            gate: gate.map(Arc::new),
            capture: Arc::new(capture),
            advice: Arc::new(advice),
        }
    }

    /// Construct every stage from a validated config, all reporting to `sink`.
    #[must_use]
    pub fn from_config(config: &Config, sink: Arc<dyn EventSink>) -> Self {
        let registry = Arc::new(HandlerRegistry::from_config(
            config,
            &handlers::operations(),
        ));

        let gate = config.gate.enabled.then(|| {
            let reject_status =
                StatusCode::from_u16(config.gate.reject_status).unwrap_or_else(|_| {
                    tracing::warn!(
                        status = config.gate.reject_status,
                        "invalid reject status, using 403"
                    );
                    StatusCode::FORBIDDEN
                });
            CapabilityGate::new(Arc::clone(&registry), Arc::clone(&sink), reject_status)
        });

        let capture = BodyCapture::new(Arc::clone(&sink), config.capture.enabled);
        let advice = AdviceStage::new(config.advice.group.clone(), sink);

        Self::new(registry, gate, capture, advice)
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn info(&self) -> PipelineInfo {
        PipelineInfo {
            gate: self.gate.is_some(),
            capture: self.capture.enabled(),
            advice_group: self.advice.group().map(String::from),
            handlers: self.registry.len(),
        }
    }

    /// Router serving every handler behind the installed stages.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mut router = handlers::routes(&self.advice);
        if let Some(gate) = &self.gate {
            router = router.route_layer(from_fn_with_state(Arc::clone(gate), capability_gate));
        }
        router.layer(from_fn_with_state(
            Arc::clone(&self.capture),
            body_capture,
        ))
    }
}
