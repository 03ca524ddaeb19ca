//! Decoding one feed line into an event.

use model::{DatabaseEvent, FeedTerminator, Sequence, ServerEvent};
use serde::de::DeserializeOwned;

/// What a single non-blank line of a continuous feed holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedLine<E> {
    /// An event to deliver.
    Event(E),
    /// The server's closing `{"last_seq": ...}` record.
    End {
        /// Sequence to resume from.
        last_seq: Sequence,
    },
}

/// A record type a continuous feed delivers, one per line.
///
/// The default [`decode_line`](FeedRecord::decode_line) tries the event type
/// first and falls back to the terminating record; when neither matches, the
/// event type's decode error is returned since it names the missing field.
pub trait FeedRecord: DeserializeOwned + Send + 'static {
    /// Decodes one non-blank line.
    fn decode_line(line: &[u8]) -> Result<FeedLine<Self>, serde_json::Error> {
        match serde_json::from_slice::<Self>(line) {
            Ok(event) => Ok(FeedLine::Event(event)),
            Err(err) => match serde_json::from_slice::<FeedTerminator>(line) {
                Ok(end) => Ok(FeedLine::End {
                    last_seq: end.last_seq,
                }),
                Err(_) => Err(err),
            },
        }
    }
}

/// `/_db_updates` lines.
impl FeedRecord for ServerEvent {}

/// `/{db}/_changes` lines.
impl FeedRecord for DatabaseEvent {}
