//! Helpers shared by the integration tests.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::Frame;

/// A request body sent as one data frame per chunk, with no known length.
pub struct Chunks(VecDeque<Bytes>);

impl Chunks {
    pub fn new(parts: &[&'static str]) -> Self {
        Self(parts.iter().map(|p| Bytes::from_static(p.as_bytes())).collect())
    }
}

impl http_body::Body for Chunks {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.0.pop_front().map(|b| Ok(Frame::data(b))))
    }
}
