//! Native-messaging frame codec
//!
//! Each message is a 4-byte little-endian length followed by that many
//! bytes of UTF-8 JSON. Framing is delegated to
//! [`LengthDelimitedCodec`]; this wrapper adds the asymmetric size limits
//! and tells a clean end of stream apart from one inside a frame.

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec, LengthDelimitedCodecError};

use crate::{NativeError, NativeResult};

/// Largest frame accepted from the browser
pub const MAX_INCOMING_FRAME: usize = 4 * 1024 * 1024;

/// Largest frame the browser accepts from a native host
pub const MAX_OUTGOING_FRAME: usize = 1024 * 1024;

const LENGTH_FIELD_LEN: usize = 4;

/// Frame codec for the native-messaging port
#[derive(Debug)]
pub struct NativeCodec {
    inner: LengthDelimitedCodec,
    /// A length header was consumed and its body is still outstanding
    mid_frame: bool,
}

impl NativeCodec {
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .little_endian()
                .length_field_length(LENGTH_FIELD_LEN)
                .max_frame_length(MAX_INCOMING_FRAME)
                .new_codec(),
            mid_frame: false,
        }
    }
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for NativeCodec {
    type Item = BytesMut;
    type Error = NativeError;

    fn decode(&mut self, src: &mut BytesMut) -> NativeResult<Option<BytesMut>> {
        let header_buffered = self.mid_frame || src.len() >= LENGTH_FIELD_LEN;

        match self.inner.decode(src) {
            Ok(Some(frame)) => {
                self.mid_frame = false;
                Ok(Some(frame))
            }
            Ok(None) => {
                self.mid_frame = header_buffered;
                Ok(None)
            }
            Err(e) if e.get_ref().is_some_and(|inner| inner.is::<LengthDelimitedCodecError>()) => {
                Err(NativeError::IncomingTooLarge {
                    max: MAX_INCOMING_FRAME,
                })
            }
            Err(e) => Err(NativeError::Io(e)),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> NativeResult<Option<BytesMut>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if self.mid_frame || !src.is_empty() => Err(NativeError::Truncated),
            None => Ok(None),
        }
    }
}

impl Encoder<Bytes> for NativeCodec {
    type Error = NativeError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> NativeResult<()> {
        check_outgoing(body.len())?;
        self.inner.encode(body, dst)?;
        Ok(())
    }
}

fn check_outgoing(len: usize) -> NativeResult<()> {
    if len > MAX_OUTGOING_FRAME {
        return Err(NativeError::OutgoingTooLarge {
            len,
            max: MAX_OUTGOING_FRAME,
        });
    }
    Ok(())
}

/// Serialize a message into a frame body, enforcing the outgoing limit
pub fn encode_message<T: Serialize>(message: &T) -> NativeResult<Bytes> {
    let body = serde_json::to_vec(message)?;
    check_outgoing(body.len())?;
    Ok(Bytes::from(body))
}

pub fn decode_message<T: DeserializeOwned>(body: &[u8]) -> NativeResult<T> {
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusward_api::{BrowserEvent, HostMessage};
    use focusward_util::TabId;
    use futures::{SinkExt, StreamExt};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    #[tokio::test]
    async fn frame_layout_is_little_endian() {
        let (a, mut b) = tokio::io::duplex(64);
        let mut sink = FramedWrite::new(a, NativeCodec::new());
        sink.send(Bytes::from_static(b"{}")).await.unwrap();

        let mut raw = [0u8; 6];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(raw, [2, 0, 0, 0, b'{', b'}']);
    }

    #[tokio::test]
    async fn messages_cross_the_pipe() {
        let (a, b) = tokio::io::duplex(1024);
        let mut sink = FramedWrite::new(a, NativeCodec::new());
        let mut frames = FramedRead::new(b, NativeCodec::new());
        let msg = HostMessage::Event {
            event: BrowserEvent::OverlayTampered { tab_id: TabId::new(4) },
        };

        sink.send(encode_message(&msg).unwrap()).await.unwrap();
        let body = frames.next().await.unwrap().unwrap();
        let back: HostMessage = decode_message(&body).unwrap();
        assert_eq!(back, msg);
    }

    #[tokio::test]
    async fn empty_frames_are_frames() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(&0u32.to_le_bytes()).await.unwrap();
        drop(a);

        let mut frames = FramedRead::new(b, NativeCodec::new());
        assert!(frames.next().await.unwrap().unwrap().is_empty());
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn clean_eof_ends_the_stream() {
        let (a, b) = tokio::io::duplex(64);
        drop(a);
        let mut frames = FramedRead::new(b, NativeCodec::new());
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn eof_inside_frame_is_truncated() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(&10u32.to_le_bytes()).await.unwrap();
        a.write_all(b"abc").await.unwrap();
        drop(a);

        let mut frames = FramedRead::new(b, NativeCodec::new());
        assert!(matches!(frames.next().await, Some(Err(NativeError::Truncated))));
    }

    #[tokio::test]
    async fn eof_after_header_is_truncated() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(&10u32.to_le_bytes()).await.unwrap();
        drop(a);

        let mut frames = FramedRead::new(b, NativeCodec::new());
        assert!(matches!(frames.next().await, Some(Err(NativeError::Truncated))));
    }

    #[tokio::test]
    async fn oversized_incoming_frame_is_rejected() {
        let (mut a, b) = tokio::io::duplex(64);
        let len = (MAX_INCOMING_FRAME as u32) + 1;
        a.write_all(&len.to_le_bytes()).await.unwrap();

        let mut frames = FramedRead::new(b, NativeCodec::new());
        assert!(matches!(
            frames.next().await,
            Some(Err(NativeError::IncomingTooLarge { .. }))
        ));
    }

    #[tokio::test]
    async fn oversized_outgoing_frame_is_rejected() {
        let (a, _b) = tokio::io::duplex(64);
        let mut sink = FramedWrite::new(a, NativeCodec::new());
        let body = Bytes::from(vec![b' '; MAX_OUTGOING_FRAME + 1]);
        assert!(matches!(
            sink.send(body).await,
            Err(NativeError::OutgoingTooLarge { .. })
        ));
        assert!(matches!(
            encode_message(&" ".repeat(MAX_OUTGOING_FRAME)),
            Err(NativeError::OutgoingTooLarge { .. })
        ));
    }
}
