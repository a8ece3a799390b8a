//! Bandwidth throttling for body streams.
//!
//! A [`Throttle`] regroups a byte stream into packets of at most
//! `packet_size` bytes and waits `delay` after every full packet before
//! yielding the next one. Bytes, their order, end of stream and errors are
//! passed through unchanged.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use futures_core::Stream;
use futures_util::stream::{self, StreamExt};
use tracing::trace;

use formwire_core::{Error, Result};

use crate::BodyStream;

/// Packet size suggested for constrained networks (16 KiB).
pub const SUGGESTED_PACKET_SIZE: usize = 16 * 1024;

/// Delay suggested for constrained networks.
pub const SUGGESTED_DELAY: Duration = Duration::from_millis(200);

/// Packet size and delay pacing a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    packet_size: usize,
    delay: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(SUGGESTED_PACKET_SIZE, SUGGESTED_DELAY)
    }
}

impl Throttle {
    /// Create a throttle. A zero packet size is raised to one byte.
    #[must_use]
    pub fn new(packet_size: usize, delay: Duration) -> Self {
        Self {
            packet_size: packet_size.max(1),
            delay,
        }
    }

    /// Maximum packet size in bytes.
    #[must_use]
    pub const fn packet_size(&self) -> usize {
        self.packet_size
    }

    /// Delay after each full packet.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Pace `inner`.
    ///
    /// A stream of `N` bytes is delivered in `ceil(N / packet_size)` packets
    /// with one delay between consecutive packets. The delay is only awaited
    /// once more data is available, so the end of the stream is never
    /// delayed. Dropping the stream cancels a pending delay.
    pub fn wrap<S>(self, inner: S) -> BodyStream
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        let state = State {
            inner: Box::pin(inner),
            pending: Bytes::new(),
            error: None,
            delay_owed: false,
            done: false,
        };
        Box::pin(stream::unfold(state, move |state| self.next_packet(state)))
    }

    async fn next_packet(self, mut state: State) -> Option<(Result<Bytes>, State)> {
        if state.done {
            return None;
        }
        let packet = state.fill(self.packet_size).await;
        if packet.is_empty() {
            state.done = true;
            return state.error.take().map(|err| (Err(err), state));
        }

        if state.delay_owed {
            trace!(delay = ?self.delay, packet = packet.len(), "throttling body stream");
            tokio::time::sleep(self.delay).await;
        }
        state.delay_owed = packet.len() == self.packet_size;
        Some((Ok(packet), state))
    }
}

struct State {
    inner: BodyStream,
    pending: Bytes,
    error: Option<Error>,
    delay_owed: bool,
    done: bool,
}

impl State {
    /// Collect up to `size` bytes; an empty packet means end of stream or error.
    async fn fill(&mut self, size: usize) -> Bytes {
        let mut packet = BytesMut::new();
        while packet.len() < size && self.error.is_none() {
            if self.pending.is_empty() {
                match self.inner.next().await {
                    Some(Ok(chunk)) => self.pending = chunk,
                    Some(Err(err)) => self.error = Some(err),
                    None => break,
                }
                continue;
            }
            let take = (size - packet.len()).min(self.pending.len());
            if packet.is_empty() && take == size {
                return self.pending.split_to(take);
            }
            packet.put(self.pending.split_to(take));
        }
        packet.freeze()
    }
}
