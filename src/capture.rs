//! Request/response body capture.
//!
//! The request body is wrapped in a [`TeeBody`] that copies every data
//! frame into a per-request buffer while passing it on untouched. Once the
//! rest of the chain has produced a response, its body is drained into a
//! [`ResponseContext`], both bodies are logged (request first), and the
//! response is handed back with a [`ReplayBody`] yielding exactly the
//! drained frames. A body error is replayed after the partial bytes.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{response, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;
use axum::BoxError;
use bytes::{Bytes, BytesMut};
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use tracing::Instrument;

use crate::events::{EventSink, PipelineEvent};

/// Per-request capture of the inbound body.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    path: String,
    body: Arc<Mutex<BytesMut>>,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Arc::default(),
        }
    }

    /// Wrap `inner` so that everything read from it lands in this context.
    pub fn tee<B>(&self, inner: B) -> TeeBody<B> {
        TeeBody {
            inner,
            buffer: Arc::clone(&self.body),
        }
    }

    #[must_use]
    pub fn captured(&self) -> Bytes {
        Bytes::copy_from_slice(&self.body.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn into_event(self) -> PipelineEvent {
        let body = String::from_utf8_lossy(&self.captured()).into_owned();
        PipelineEvent::RequestBody {
            method: self.method.to_string(),
            path: self.path,
            body,
        }
    }
}

/// Strips one `axum::Error` layer so that `Body::new` does not nest it
/// again and extractors still see the underlying cause.
fn unwrap_axum_error(error: BoxError) -> BoxError {
    match error.downcast::<axum::Error>() {
        Ok(error) => error.into_inner(),
        Err(error) => error,
    }
}

/// A body that mirrors each data frame into a shared buffer.
///
/// Errors from the inner body are passed on with their original cause, so
/// a `LengthLimitError` still turns into `413` downstream.
pub struct TeeBody<B> {
    inner: B,
    buffer: Arc<Mutex<BytesMut>>,
}

impl<B> http_body::Body for TeeBody<B>
where
    B: http_body::Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match Pin::new(&mut self.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    self.buffer
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(error))) => {
                Poll::Ready(Some(Err(unwrap_axum_error(error.into()))))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Per-request capture of the outbound response.
#[derive(Debug)]
pub struct ResponseContext {
    parts: response::Parts,
    body: BytesMut,
    trailers: Option<HeaderMap>,
    error: Option<axum::Error>,
}

impl ResponseContext {
    /// Read the whole response body, stopping at the first body error.
    pub async fn drain(parts: response::Parts, mut body: Body) -> Self {
        let mut buffer = BytesMut::new();
        let mut trailers = None;
        let mut error = None;

        while let Some(frame) = body.frame().await {
            match frame {
                Ok(frame) => match frame.into_data() {
                    Ok(data) => buffer.extend_from_slice(&data),
                    Err(frame) => {
                        if let Ok(t) = frame.into_trailers() {
                            trailers = Some(t);
                        }
                    }
                },
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        Self {
            parts,
            body: buffer,
            trailers,
            error,
        }
    }

    #[must_use]
    pub fn captured(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub const fn failed(&self) -> bool {
        self.error.is_some()
    }

    fn event(&self) -> PipelineEvent {
        PipelineEvent::ResponseBody {
            status: self.parts.status.as_u16(),
            body: String::from_utf8_lossy(&self.body).into_owned(),
        }
    }

    /// Rebuild the response around the captured frames.
    #[must_use]
    pub fn into_response(self) -> Response {
        let error = self.error.map(axum::Error::into_inner);
        let body = ReplayBody::new(self.body.freeze(), self.trailers, error);
        Response::from_parts(self.parts, Body::new(body))
    }
}

/// Yields buffered data, then the captured error or trailers, exactly once.
#[derive(Debug)]
pub struct ReplayBody {
    data: Option<Bytes>,
    trailers: Option<HeaderMap>,
    error: Option<BoxError>,
}

impl ReplayBody {
    #[must_use]
    pub fn new(data: Bytes, trailers: Option<HeaderMap>, error: Option<BoxError>) -> Self {
        Self {
            data: (!data.is_empty()).then_some(data),
            trailers,
            error,
        }
    }
}

impl http_body::Body for ReplayBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        if let Some(data) = self.data.take() {
            return Poll::Ready(Some(Ok(Frame::data(data))));
        }
        if let Some(error) = self.error.take() {
            return Poll::Ready(Some(Err(error)));
        }
        Poll::Ready(self.trailers.take().map(|t| Ok(Frame::trailers(t))))
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_none() && self.error.is_none() && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        let len = self.data.as_ref().map_or(0, Bytes::len) as u64;
        if self.error.is_some() {
            let mut hint = SizeHint::new();
            hint.set_lower(len);
            hint
        } else {
            SizeHint::with_exact(len)
        }
    }
}

pub struct BodyCapture {
    sink: Arc<dyn EventSink>,
    enabled: bool,
}

impl BodyCapture {
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Run `next` with a teed request body, then log and replay the response.
    pub async fn process(&self, request: Request, next: Next) -> Response {
        if !self.enabled {
            return next.run(request).await;
        }

        let (parts, body) = request.into_parts();
        let context = RequestContext::new(parts.method.clone(), parts.uri.path());
        let request = Request::from_parts(parts, Body::new(context.tee(body)));

        tracing::debug!("entering downstream chain");
        let response = next.run(request).await;

        let (parts, body) = response.into_parts();
        let captured = ResponseContext::drain(parts, body).await;
        if captured.failed() {
            tracing::warn!(
                bytes = captured.captured().len(),
                "response body failed mid-stream, replaying partial body"
            );
        }

        self.sink.record(context.into_event());
        self.sink.record(captured.event());
        tracing::debug!("replaying captured response");

        captured.into_response()
    }
}

/// Outermost middleware: tags the request with a correlation id span and
/// runs [`BodyCapture::process`] inside it.
pub async fn body_capture(
    State(capture): State<Arc<BodyCapture>>,
    request: Request,
    next: Next,
) -> Response {
    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    capture.process(request, next).instrument(span).await
}
