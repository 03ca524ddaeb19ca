//! The feed handle and its background reader.

use std::ops::ControlFlow;

use model::Sequence;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use transport::{Connection, Deadline, Request, Response};

use crate::error::StreamError;
use crate::lines::LineBuffer;
use crate::record::{FeedLine, FeedRecord};

/// Events the reader may decode ahead of the caller.
///
/// One slot keeps the reader at most a single event ahead; further lines
/// wait in the socket buffer until the caller asks for them.
const CHANNEL_CAPACITY: usize = 1;

/// How a feed's background reader stopped.
#[derive(Debug)]
pub enum FeedEnd {
    /// The caller closed or dropped the feed.
    Closed,
    /// The server sent its terminating record, e.g. after a feed `timeout`.
    Completed {
        /// Sequence to resume from.
        last_seq: Sequence,
    },
    /// The server ended the body without a terminating record.
    Eof,
    /// Reading or decoding failed.
    Failed(StreamError),
}

impl FeedEnd {
    /// Returns `true` unless the reader stopped on an error.
    pub fn is_clean(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// A running continuous feed.
///
/// Events arrive from [`Feed::next`] in the order the server wrote them, each
/// exactly once. The feed owns a dedicated connection read by one background
/// task; [`Feed::close`] stops that task and releases the connection.
/// Dropping the `Feed` stops it too.
#[derive(Debug)]
pub struct Feed<E> {
    events: mpsc::Receiver<E>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<FeedEnd>>,
}

impl<E> Feed<E> {
    /// Waits for the next event.
    ///
    /// Returns `None` once the reader has stopped and every event it decoded
    /// has been delivered; [`Feed::close`] then reports why it stopped.
    pub async fn next(&mut self) -> Option<E> {
        self.events.recv().await
    }

    /// Returns `true` once the reader has stopped, whatever the reason.
    pub fn is_finished(&self) -> bool {
        self.reader.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the reader, waits for it to release its connection, and reports
    /// how it ended.
    ///
    /// If the reader had already stopped on its own, its original outcome is
    /// returned rather than [`FeedEnd::Closed`].
    pub async fn close(mut self) -> FeedEnd {
        self.cancel.cancel();
        self.events.close();
        match self.reader.take() {
            Some(reader) => reader
                .await
                .unwrap_or_else(|err| FeedEnd::Failed(err.into())),
            None => FeedEnd::Closed,
        }
    }
}

impl<E> Drop for Feed<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Sends `request` on a dedicated copy of `connection` and streams its body.
///
/// The request runs without a deadline, since a continuous feed only ends
/// when one side closes it. Failures sending the request or a non-success
/// status are returned here and no task is started.
pub async fn open_feed<E: FeedRecord>(
    connection: &Connection,
    request: Request<'_>,
) -> transport::Result<Feed<E>> {
    let path = request.endpoint().to_string();
    let stream = connection.duplicate()?;
    let response = stream.send(request.deadline(Deadline::Unbounded)).await?;
    info!(%path, "feed opened");

    let (sender, events) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let reader = tokio::spawn(
        run(stream, response, sender, cancel.clone()).instrument(info_span!("feed", %path)),
    );

    Ok(Feed {
        events,
        cancel,
        reader: Some(reader),
    })
}

// Owns the dedicated connection and the response so both are released
// exactly once, when this future completes.
async fn run<E: FeedRecord>(
    _stream: Connection,
    response: Response,
    events: mpsc::Sender<E>,
    cancel: CancellationToken,
) -> FeedEnd {
    let end = read(response, &events, &cancel).await;
    match &end {
        FeedEnd::Failed(err) => warn!(error = %err, "feed failed"),
        FeedEnd::Completed { last_seq } => info!(%last_seq, "feed completed"),
        FeedEnd::Eof => info!("feed ended by server"),
        FeedEnd::Closed => info!("feed closed"),
    }
    end
}

async fn read<E: FeedRecord>(
    mut response: Response,
    events: &mpsc::Sender<E>,
    cancel: &CancellationToken,
) -> FeedEnd {
    let mut lines = LineBuffer::default();
    loop {
        while let Some(line) = lines.next_line() {
            if let ControlFlow::Break(end) = deliver(&line, events, cancel).await {
                return end;
            }
        }

        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FeedEnd::Closed,
            chunk = response.chunk() => chunk,
        };
        match chunk {
            Ok(Some(bytes)) => lines.push(&bytes),
            Ok(None) => {
                if let Some(line) = lines.finish() {
                    if let ControlFlow::Break(end) = deliver(&line, events, cancel).await {
                        return end;
                    }
                }
                return FeedEnd::Eof;
            }
            Err(err) => return FeedEnd::Failed(StreamError::Read(err)),
        }
    }
}

async fn deliver<E: FeedRecord>(
    line: &[u8],
    events: &mpsc::Sender<E>,
    cancel: &CancellationToken,
) -> ControlFlow<FeedEnd> {
    let event = match E::decode_line(line) {
        Ok(FeedLine::Event(event)) => event,
        Ok(FeedLine::End { last_seq }) => return ControlFlow::Break(FeedEnd::Completed { last_seq }),
        Err(source) => {
            return ControlFlow::Break(FeedEnd::Failed(StreamError::Decode {
                line: String::from_utf8_lossy(line).into_owned(),
                source,
            }))
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => ControlFlow::Break(FeedEnd::Closed),
        sent = events.send(event) => match sent {
            Ok(()) => ControlFlow::Continue(()),
            // The receiver is gone: the feed was dropped.
            Err(_) => ControlFlow::Break(FeedEnd::Closed),
        },
    }
}
