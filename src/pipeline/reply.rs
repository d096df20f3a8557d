//! Replies sent back to the peer.

use bytes::BytesMut;
use log::error;

use crate::{
    error::ErrorKind,
    protocol::{ErrorCode, Message, Payload, ack_frame, encode, error_frame},
};

/// Destination for reply frames.
///
/// Called from the decode context; implementations should queue the frame
/// rather than block on the link.
pub trait ReplySink: Send + Sync {
    /// Deliver one encoded frame.
    fn send(&self, frame: BytesMut);
}

impl<F> ReplySink for F
where
    F: Fn(BytesMut) + Send + Sync,
{
    fn send(&self, frame: BytesMut) { self(frame); }
}

/// What a successfully handled message is answered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Reply {
    Ack,
    Pong,
    Silent,
}

impl Reply {
    pub(crate) fn into_frame(self, id: u8) -> Option<BytesMut> {
        match self {
            Self::Ack => Some(ack_frame(id, ErrorCode::Success)),
            Self::Pong => match encode(&Message::new(id, Payload::PingResponse)) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    error!("ping response could not be encoded: error={e}");
                    None
                }
            },
            Self::Silent => None,
        }
    }
}

/// Error frame for a message that failed with `kind`.
pub(crate) fn failure_frame(id: u8, kind: ErrorKind, detail: &impl std::fmt::Display) -> BytesMut {
    error_frame(id, kind.error_code(), &detail.to_string())
}
