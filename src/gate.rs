//! Capability gate: admits or rejects a request before the handler runs.
//!
//! The decision is a pure predicate over the resolved
//! [`HandlerDescriptor`]: a method-level `open-access` marker admits,
//! otherwise a group-level one does, otherwise the request is rejected.
//! [`capability_gate`] is the axum middleware that resolves the descriptor
//! from the matched route and turns a rejection into the configured status.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::events::{EventSink, PipelineEvent};
use crate::registry::{HandlerDescriptor, HandlerRegistry, Marker, MarkerLevel};

pub struct CapabilityGate {
    registry: Arc<HandlerRegistry>,
    sink: Arc<dyn EventSink>,
    reject_status: StatusCode,
}

impl CapabilityGate {
    #[must_use]
    pub fn new(
        registry: Arc<HandlerRegistry>,
        sink: Arc<dyn EventSink>,
        reject_status: StatusCode,
    ) -> Self {
        Self {
            registry,
            sink,
            reject_status,
        }
    }

    /// Level at which an `open-access` marker is declared, method first.
    #[must_use]
    pub fn matched_level(descriptor: &HandlerDescriptor) -> Option<MarkerLevel> {
        if descriptor.has_method_marker(Marker::OpenAccess) {
            Some(MarkerLevel::Method)
        } else if descriptor.has_group_marker(Marker::OpenAccess) {
            Some(MarkerLevel::Group)
        } else {
            None
        }
    }

    /// Decide whether the request for `path` may reach the handler.
    pub fn admit(&self, descriptor: &HandlerDescriptor, path: &str) -> bool {
        let handler = descriptor.id();
        match Self::matched_level(descriptor) {
            Some(level) => {
                self.sink
                    .record(PipelineEvent::GateAdmitted { handler, level });
                true
            }
            None => {
                self.sink.record(PipelineEvent::GateRejected {
                    handler,
                    path: path.to_owned(),
                });
                false
            }
        }
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn reject_status(&self) -> StatusCode {
        self.reject_status
    }
}

/// Route-level middleware. Must be installed with `route_layer` so that
/// [`MatchedPath`] is already set when it runs.
pub async fn capability_gate(
    State(gate): State<Arc<CapabilityGate>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    let Some(template) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned())
    else {
        tracing::warn!(path = %path, "no matched route for gated request");
        return StatusCode::NOT_FOUND.into_response();
    };

    let Some(descriptor) = gate.registry.resolve(request.method(), &template) else {
        tracing::warn!(
            method = %request.method(),
            route = %template,
            "route has no registered handler descriptor"
        );
        return StatusCode::NOT_FOUND.into_response();
    };
    let handler = descriptor.id();

    if !gate.admit(descriptor, &path) {
        return gate.reject_status.into_response();
    }

    let started = Instant::now();
    let response = next.run(request).await;
    tracing::debug!(handler = %handler, status = %response.status(), "post-handle");

    #[allow(clippy::cast_possible_truncation)]
    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::debug!(
        handler = %handler,
        elapsed_ms,
        failed = response.status().is_server_error(),
        "after completion"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::Body;
    use axum::http::Method;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;
    use tracing_subscriber::layer::SubscriberExt;

    use crate::events::MemorySink;
    use crate::registry::{HandlerId, Operation};

    /// Collects the message of every event it sees.
    #[derive(Clone, Default)]
    struct Messages(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor(Option<String>);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Messages {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut visitor = MessageVisitor(None);
            event.record(&mut visitor);
            if let Some(message) = visitor.0 {
                self.0.lock().unwrap().push(message);
            }
        }
    }

    const ID: HandlerId = HandlerId::new("user", "register");

    fn gate(sink: Arc<MemorySink>) -> CapabilityGate {
        CapabilityGate::new(
            Arc::new(HandlerRegistry::new()),
            sink,
            StatusCode::FORBIDDEN,
        )
    }

    fn descriptor(method: bool, group: bool) -> HandlerDescriptor {
        let mut d = HandlerDescriptor::new(ID);
        if method {
            d = d.with_method_marker(Marker::OpenAccess);
        }
        if group {
            d = d.with_group_marker(Marker::OpenAccess);
        }
        d
    }

    #[test]
    fn precedence_table() {
        let cases = [
            (true, true, Some(MarkerLevel::Method)),
            (true, false, Some(MarkerLevel::Method)),
            (false, true, Some(MarkerLevel::Group)),
            (false, false, None),
        ];
        for (method, group, expected) in cases {
            assert_eq!(
                CapabilityGate::matched_level(&descriptor(method, group)),
                expected,
                "method={method} group={group}"
            );
        }
    }

    #[test]
    fn group_marker_admits_when_method_marker_absent() {
        let sink = Arc::new(MemorySink::new());
        let gate = gate(sink.clone());
        assert!(gate.admit(&descriptor(false, true), "/open-api/echo"));
        assert_eq!(
            sink.events(),
            vec![PipelineEvent::GateAdmitted {
                handler: ID,
                level: MarkerLevel::Group,
            }]
        );
    }

    #[test]
    fn no_marker_rejects_and_reports_path() {
        let sink = Arc::new(MemorySink::new());
        let gate = gate(sink.clone());
        assert!(!gate.admit(&descriptor(false, false), "/api/user/7"));
        assert_eq!(
            sink.events(),
            vec![PipelineEvent::GateRejected {
                handler: ID,
                path: "/api/user/7".into(),
            }]
        );
    }

    #[tokio::test]
    async fn admitted_request_traces_post_handle_then_after_completion() {
        let messages = Messages::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(messages.clone()));

        let greet = HandlerId::new("open", "greet");
        let mut registry = HandlerRegistry::new();
        registry.register(
            &Operation::new(greet, Method::GET, "/greet/{name}"),
            HandlerDescriptor::new(greet).with_group_marker(Marker::OpenAccess),
        );
        let gate = Arc::new(CapabilityGate::new(
            Arc::new(registry),
            Arc::new(MemorySink::new()),
            StatusCode::FORBIDDEN,
        ));
        let app: Router = Router::new()
            .route("/greet/{name}", get(|| async { "hi" }))
            .route_layer(from_fn_with_state(gate, capability_gate));

        let request = axum::http::Request::get("/greet/kim")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let seen = messages.0.lock().unwrap().clone();
        let post = seen.iter().position(|m| m == "post-handle");
        let after = seen.iter().position(|m| m == "after completion");
        assert!(post.is_some() && after.is_some(), "{seen:?}");
        assert!(post < after);
    }
}
