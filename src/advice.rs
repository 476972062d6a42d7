//! Around-advice scoped to one handler group.
//!
//! [`AdviceStage::around`] emits `before`, builds a normalized copy of the
//! argument, times the wrapped invocation with a monotonic clock, then emits
//! `after-returning` or `after-throwing` followed by `after`. The wrapped
//! handler's result is returned as is; errors are never swallowed.
//!
//! [`AdviceStage::wrap`] turns a handler function into an axum handler,
//! deciding once at composition time whether the handler's group is in
//! scope. Out-of-scope handlers are called directly with their argument.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Path;
use axum::Json;

use crate::events::{EventSink, PipelineEvent};
use crate::registry::HandlerId;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Characters stripped from phone-number shaped fields.
pub const PHONE_SEPARATORS: &[char] = &['-', ' ', '.'];

#[must_use]
pub fn normalize_phone_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !PHONE_SEPARATORS.contains(c))
        .collect()
}

/// An argument the advice can hand to a handler.
///
/// `advised_copy` returns an independent value with any field-level
/// normalization applied; the original is only borrowed.
pub trait Advised: Sized {
    fn advised_copy(&self) -> Self;
}

impl Advised for String {
    fn advised_copy(&self) -> Self {
        self.clone()
    }
}

impl Advised for u64 {
    fn advised_copy(&self) -> Self {
        *self
    }
}

impl<T: Advised> Advised for Json<T> {
    fn advised_copy(&self) -> Self {
        Json(self.0.advised_copy())
    }
}

impl<T: Advised> Advised for Path<T> {
    fn advised_copy(&self) -> Self {
        Path(self.0.advised_copy())
    }
}

/// Start/stop instants of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct TimingSample {
    started: Instant,
    stopped: Option<Instant>,
}

impl TimingSample {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            stopped: None,
        }
    }

    pub fn stop(&mut self) {
        self.stopped.get_or_insert_with(Instant::now);
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.stopped
            .unwrap_or_else(Instant::now)
            .duration_since(self.started)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

pub struct AdviceStage {
    group: Option<String>,
    sink: Arc<dyn EventSink>,
}

impl AdviceStage {
    #[must_use]
    pub fn new(group: Option<String>, sink: Arc<dyn EventSink>) -> Self {
        Self { group, sink }
    }

    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    #[must_use]
    pub fn applies_to(&self, handler: &HandlerId) -> bool {
        self.group.as_deref() == Some(handler.group)
    }

    /// Run `invocation` with a normalized copy of `args`, reporting the
    /// lifecycle events for `handler`.
    pub async fn around<A, R, E, F, Fut>(
        &self,
        handler: HandlerId,
        args: &A,
        invocation: F,
    ) -> Result<R, E>
    where
        A: Advised,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: Debug,
        E: Display,
    {
        self.sink.record(PipelineEvent::AdviceBefore { handler });

        let transformed = args.advised_copy();

        let mut timing = TimingSample::start();
        let outcome = invocation(transformed).await;
        timing.stop();

        self.sink.record(PipelineEvent::AdviceTiming {
            handler,
            elapsed_ms: timing.elapsed_ms(),
        });

        match &outcome {
            Ok(value) => self.sink.record(PipelineEvent::AdviceReturned {
                handler,
                value: format!("{value:?}"),
            }),
            Err(error) => self.sink.record(PipelineEvent::AdviceThrew {
                handler,
                error: error.to_string(),
            }),
        }
        self.sink.record(PipelineEvent::AdviceAfter { handler });

        outcome
    }

    /// Build an axum handler for `invocation`, advised when `handler`'s
    /// group is the one this stage is scoped to.
    pub fn wrap<A, R, E, F, Fut>(
        self: &Arc<Self>,
        handler: HandlerId,
        invocation: F,
    ) -> impl Fn(A) -> BoxFuture<Result<R, E>> + Clone + Send + Sync + 'static
    where
        A: Advised + Send + Sync + 'static,
        F: Fn(A) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Debug + Send + 'static,
        E: Display + Send + 'static,
    {
        let stage = Arc::clone(self);
        let advised = stage.applies_to(&handler);
        if advised {
            tracing::debug!(handler = %handler, "around-advice applied");
        }

        move |args: A| -> BoxFuture<Result<R, E>> {
            let stage = Arc::clone(&stage);
            let invocation = invocation.clone();
            Box::pin(async move {
                if advised {
                    stage.around(handler, &args, invocation).await
                } else {
                    invocation(args).await
                }
            })
        }
    }
}
