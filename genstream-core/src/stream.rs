//! Stream lifecycle: binds one frame decoder and one reducer to a single
//! response body, and manages early termination.
//!
//! Contract:
//! - Frames are applied strictly in arrival order; update callbacks for one
//!   stream are sequential by construction of the read loop.
//! - The wait for the next chunk is the only suspension point, and the
//!   cancellation token abandons it rather than awaiting it to completion.
//! - A read error mid-body preserves whatever text was already assembled.

use bytes::Bytes;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{Aggregated, Reducer, TerminalStatus};
use crate::error::CoreResult;
use crate::frame::FrameDecoder;

/// Boxed stream of raw body chunks as delivered by the transport.
pub type ChunkStream = futures::stream::BoxStream<'static, CoreResult<Bytes>>;

/// Failure reason when the request could not be opened at all.
pub const TRANSPORT_ERROR: &str = "transport error";
/// Failure reason when the connection dropped mid-body.
pub const CONNECTION_INTERRUPTED: &str = "connection interrupted";

/// Drive one chunk stream to its terminal status.
pub async fn aggregate(
    mut chunks: ChunkStream,
    cancel: &CancellationToken,
    on_update: &mut (dyn FnMut(&str) + Send),
) -> Aggregated {
    let mut decoder = FrameDecoder::new();
    let mut reducer = Reducer::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return reducer.cancel(),
            next = chunks.next() => next,
        };
        match next {
            Some(Ok(chunk)) => {
                for frame in decoder.push(&chunk) {
                    if !reducer.push(frame, on_update) {
                        // Server error frame: whatever bytes remain carry
                        // nothing useful, so stop reading here.
                        return reducer.finish();
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "stream read failed mid-body");
                return reducer.fail(CONNECTION_INTERRUPTED);
            }
            None => {
                if let Some(frame) = decoder.finish() {
                    reducer.push(frame, on_update);
                }
                if decoder.skipped() > 0 {
                    tracing::debug!(
                        skipped = decoder.skipped(),
                        "stream contained unparsable lines"
                    );
                }
                return reducer.finish();
            }
        }
    }
}

/// Handle to a spawned stream aggregation.
///
/// Dropping the handle detaches the stream; call [`StreamHandle::cancel`] to
/// terminate it early.
pub struct StreamHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<Aggregated>,
}

impl StreamHandle {
    pub(crate) fn new(
        cancel: CancellationToken,
        task: tokio::task::JoinHandle<Aggregated>,
    ) -> Self {
        Self { cancel, task }
    }

    /// Request early termination. Idempotent; after the stream reaches a
    /// terminal status this is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the cancellation token, for wiring into signal handlers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the terminal result (the status is also delivered through
    /// `on_done`).
    pub async fn wait(self) -> Aggregated {
        self.task.await.unwrap_or_else(|e| Aggregated {
            text: String::new(),
            status: TerminalStatus::Failed(format!("stream task failed: {e}")),
        })
    }
}
