//! # Duplex Channel
//!
//! Byte-level I/O over one socket's streams, with message framing.
//!
//! A channel wraps an optional read side and an optional write side; the
//! capability split is fixed at construction and never changes. Listeners
//! build one read-only and one write-only channel per accepted connection;
//! endpoints build a single full-duplex channel.
//!
//! ## Framing
//! With stop-byte framing (the default) every outbound message is terminated
//! by a configured stop byte, stripped again on the inbound side. With
//! framing disabled, message boundaries fall back to a stream-availability
//! heuristic: a read that does not fill the buffer, or a buffer-filling read
//! with no further bytes already waiting, ends the message. The heuristic is
//! inherently approximate over a real network (a peer can pause mid-message
//! without closing the stream) and is only suitable for trusted or local
//! peers.
//!
//! ## Object Transport
//! `write_object`/`read_object` bypass the stop-byte path entirely: the
//! channel side is lazily wrapped in a length-delimited codec on first use
//! and reused for the channel's lifetime, carrying bincode payloads.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::io;
use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::trace;

use crate::config::{FramingConfig, READ_CHUNK_SIZE};
use crate::core::encoding;
use crate::error::{constants, Error, Result};
use crate::utils::timeout::{self, with_timeout};

/// Opaque payload carried in a channel's bind slot
pub type BindValue = Box<dyn Any + Send>;

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

enum ReadSide {
    None,
    Raw(Reader),
    Object(FramedRead<Reader, LengthDelimitedCodec>),
}

impl ReadSide {
    fn reader(&mut self) -> Option<&mut Reader> {
        match self {
            ReadSide::None => None,
            ReadSide::Raw(reader) => Some(reader),
            ReadSide::Object(framed) => Some(framed.get_mut()),
        }
    }

    /// Wrap the raw reader in the object decoder on first use.
    fn object(&mut self) -> Result<&mut FramedRead<Reader, LengthDelimitedCodec>> {
        if matches!(self, ReadSide::Raw(_)) {
            if let ReadSide::Raw(reader) = std::mem::replace(self, ReadSide::None) {
                *self = ReadSide::Object(FramedRead::new(reader, LengthDelimitedCodec::new()));
            }
        }
        match self {
            ReadSide::Object(framed) => Ok(framed),
            _ => Err(Error::NoPermission(constants::ERR_READ_DENIED)),
        }
    }
}

enum WriteSide {
    None,
    Raw(Writer),
    Object(FramedWrite<Writer, LengthDelimitedCodec>),
}

impl WriteSide {
    fn writer(&mut self) -> Option<&mut Writer> {
        match self {
            WriteSide::None => None,
            WriteSide::Raw(writer) => Some(writer),
            WriteSide::Object(framed) => Some(framed.get_mut()),
        }
    }

    /// Wrap the raw writer in the object encoder on first use.
    fn object(&mut self) -> Result<&mut FramedWrite<Writer, LengthDelimitedCodec>> {
        if matches!(self, WriteSide::Raw(_)) {
            if let WriteSide::Raw(writer) = std::mem::replace(self, WriteSide::None) {
                *self = WriteSide::Object(FramedWrite::new(writer, LengthDelimitedCodec::new()));
            }
        }
        match self {
            WriteSide::Object(framed) => Ok(framed),
            _ => Err(Error::NoPermission(constants::ERR_WRITE_DENIED)),
        }
    }
}

/// One socket's streams with framing, typed encodings, and a bind slot.
pub struct DuplexChannel {
    read: ReadSide,
    write: WriteSide,
    write_buf: BytesMut,
    /// Bytes read past a message's terminator, owed to the next read.
    read_carry: BytesMut,
    auto_flush: bool,
    framing: FramingConfig,
    read_timeout: Duration,
    bind: Option<BindValue>,
    closed: bool,
}

impl DuplexChannel {
    /// Full-duplex channel over both halves of a stream.
    pub fn new<R, W>(reader: R, writer: W, framing: FramingConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::build(
            ReadSide::Raw(Box::new(reader)),
            WriteSide::Raw(Box::new(writer)),
            framing,
        )
    }

    /// Read-only channel; writes fail with `NoPermission`.
    pub fn from_reader<R>(reader: R, framing: FramingConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::build(ReadSide::Raw(Box::new(reader)), WriteSide::None, framing)
    }

    /// Write-only channel; reads fail with `NoPermission`.
    pub fn from_writer<W>(writer: W, framing: FramingConfig) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::build(ReadSide::None, WriteSide::Raw(Box::new(writer)), framing)
    }

    fn build(read: ReadSide, write: WriteSide, framing: FramingConfig) -> Self {
        Self {
            read,
            write,
            write_buf: BytesMut::new(),
            read_carry: BytesMut::new(),
            auto_flush: true,
            framing,
            read_timeout: timeout::DEFAULT_READ_TIMEOUT,
            bind: None,
            closed: false,
        }
    }

    /// Bound applied to each blocking read on this channel.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// When disabled, written bytes accumulate until `flush` or `close`.
    pub fn set_auto_flush(&mut self, auto_flush: bool) {
        self.auto_flush = auto_flush;
    }

    pub fn auto_flush(&self) -> bool {
        self.auto_flush
    }

    pub fn can_read(&self) -> bool {
        !matches!(self.read, ReadSide::None)
    }

    pub fn can_write(&self) -> bool {
        !matches!(self.write, WriteSide::None)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn framing(&self) -> FramingConfig {
        self.framing
    }

    /// Read one complete inbound message.
    ///
    /// Grows the buffer one chunk at a time. With stop-byte framing the
    /// message ends at the first stop byte (stripped from the result); bytes
    /// read past it are retained for the next call, so coalesced messages
    /// come back one at a time. Without framing a short read ends the
    /// message, and a buffer-filling read continues only while further bytes
    /// are already waiting. A zero-byte read before either condition is met
    /// is `ConnectionClosed`.
    pub async fn read_all(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        let framing = self.framing;
        let deadline = self.read_timeout;
        let reader = self
            .read
            .reader()
            .ok_or(Error::NoPermission(constants::ERR_READ_DENIED))?;

        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let mut filled = 0usize;

        if framing.use_stop_byte && !self.read_carry.is_empty() {
            // A previous read pulled in bytes past its own terminator.
            if let Some(pos) = find_byte(&self.read_carry, framing.stop_byte) {
                let message = self.read_carry.split_to(pos).to_vec();
                self.read_carry.advance(1);
                trace!(len = message.len(), "read message");
                return Ok(message);
            }
            // Partial message: seed the buffer and keep reading.
            if self.read_carry.len() >= buf.len() {
                buf.resize(self.read_carry.len() + READ_CHUNK_SIZE, 0);
            }
            buf[..self.read_carry.len()].copy_from_slice(&self.read_carry);
            filled = self.read_carry.len();
            self.read_carry.clear();
        }

        let mut n = with_timeout(deadline, async {
            Ok(reader.read(&mut buf[filled..]).await?)
        })
        .await?;

        loop {
            if n == 0 {
                // End of stream. Terminates an unframed message that already
                // produced bytes; otherwise the peer vanished mid-message.
                if filled > 0 && !framing.use_stop_byte {
                    break;
                }
                return Err(Error::ConnectionClosed);
            }
            filled += n;

            if framing.use_stop_byte {
                // Only the newly read region can hold the terminator.
                if let Some(pos) = find_byte(&buf[filled - n..filled], framing.stop_byte) {
                    let end = filled - n + pos;
                    self.read_carry.extend_from_slice(&buf[end + 1..filled]);
                    buf.truncate(end);
                    trace!(len = buf.len(), "read message");
                    return Ok(buf);
                }
                if filled == buf.len() {
                    buf.resize(filled + READ_CHUNK_SIZE, 0);
                }
                n = with_timeout(deadline, async {
                    Ok(reader.read(&mut buf[filled..]).await?)
                })
                .await?;
                continue;
            }

            // Heuristic termination: a read that left room ends the message.
            if filled < buf.len() {
                break;
            }
            buf.resize(filled + READ_CHUNK_SIZE, 0);
            match read_available(reader, &mut buf[filled..]).await {
                None => break,
                Some(result) => n = result?,
            }
        }

        buf.truncate(filled);
        trace!(len = filled, "read message");
        Ok(buf)
    }

    /// Read one message as a UTF-8 string; an empty message is `None`.
    pub async fn read_string(&mut self) -> Result<Option<String>> {
        let bytes = self.read_all().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(encoding::decode_string(bytes)?))
    }

    /// Read one message as a big-endian 32-bit integer; empty is `None`.
    pub async fn read_i32(&mut self) -> Result<Option<i32>> {
        let bytes = self.read_all().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(encoding::decode_i32(&bytes)?))
    }

    /// Read one message as a big-endian 64-bit integer; empty is `None`.
    pub async fn read_i64(&mut self) -> Result<Option<i64>> {
        let bytes = self.read_all().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(encoding::decode_i64(&bytes)?))
    }

    /// Read one message as a big-endian 32-bit float; empty is `None`.
    pub async fn read_f32(&mut self) -> Result<Option<f32>> {
        let bytes = self.read_all().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(encoding::decode_f32(&bytes)?))
    }

    /// Read one message as a big-endian 64-bit float; empty is `None`.
    pub async fn read_f64(&mut self) -> Result<Option<f64>> {
        let bytes = self.read_all().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(encoding::decode_f64(&bytes)?))
    }

    /// Read one message as a single-byte boolean; empty is `None`.
    pub async fn read_bool(&mut self) -> Result<Option<bool>> {
        let bytes = self.read_all().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(encoding::decode_bool(&bytes)?))
    }

    /// Write one raw message.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.append(bytes).await
    }

    /// Write one UTF-8 string message.
    pub async fn write_str(&mut self, value: &str) -> Result<()> {
        self.append(value.as_bytes()).await
    }

    pub async fn write_i32(&mut self, value: i32) -> Result<()> {
        self.append(&value.to_be_bytes()).await
    }

    pub async fn write_i64(&mut self, value: i64) -> Result<()> {
        self.append(&value.to_be_bytes()).await
    }

    pub async fn write_f32(&mut self, value: f32) -> Result<()> {
        self.append(&value.to_be_bytes()).await
    }

    pub async fn write_f64(&mut self, value: f64) -> Result<()> {
        self.append(&value.to_be_bytes()).await
    }

    pub async fn write_bool(&mut self, value: bool) -> Result<()> {
        self.append(&encoding::encode_bool(value)).await
    }

    /// Append to the write buffer, terminating with the stop byte unless it
    /// is already the trailing byte. Auto-flush delivers immediately.
    async fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        if !self.can_write() {
            return Err(Error::NoPermission(constants::ERR_WRITE_DENIED));
        }
        self.write_buf.extend_from_slice(bytes);
        if self.framing.use_stop_byte && self.write_buf.last() != Some(&self.framing.stop_byte) {
            self.write_buf.put_u8(self.framing.stop_byte);
        }
        if self.auto_flush {
            self.flush().await?;
        }
        Ok(())
    }

    /// Drain the write buffer to the underlying stream and flush it.
    pub async fn flush(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        let writer = self
            .write
            .writer()
            .ok_or(Error::NoPermission(constants::ERR_WRITE_DENIED))?;
        if !self.write_buf.is_empty() {
            writer.write_all(&self.write_buf).await?;
            self.write_buf.clear();
        }
        writer.flush().await?;
        Ok(())
    }

    /// Write one serialized object through the length-delimited object path.
    ///
    /// The object encoder is opened on first use and reused for the channel's
    /// lifetime; the stop-byte write buffer is bypassed.
    pub async fn write_object<T: Serialize>(&mut self, value: &T) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        let payload = bincode::serialize(value)?;
        let framed = self.write.object()?;
        framed.send(Bytes::from(payload)).await?;
        Ok(())
    }

    /// Read one serialized object through the length-delimited object path.
    pub async fn read_object<T: DeserializeOwned>(&mut self) -> Result<T> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        let deadline = self.read_timeout;
        let framed = self.read.object()?;
        let frame = with_timeout(deadline, async {
            framed.next().await.transpose().map_err(Error::from)
        })
        .await?
        .ok_or(Error::ConnectionClosed)?;
        Ok(bincode::deserialize(&frame)?)
    }

    /// Attach a value for the output phase of this exchange.
    pub fn set_bind<T: Send + 'static>(&mut self, value: T) {
        self.bind = Some(Box::new(value));
    }

    /// Attach an already-boxed bind value.
    pub fn set_bind_value(&mut self, value: BindValue) {
        self.bind = Some(value);
    }

    /// Take the pending bind value, clearing the slot.
    pub fn take_bind_value(&mut self) -> Option<BindValue> {
        self.bind.take()
    }

    /// Take the pending bind value as a concrete type, clearing the slot.
    /// A type mismatch also clears the slot and yields `None`.
    pub fn take_bind<T: 'static>(&mut self) -> Option<T> {
        self.bind
            .take()
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Close the channel: best-effort flush, reset the write buffer, shut
    /// down the write side, drop both sides, mark permanently closed.
    /// Every step runs even when an earlier one fails; idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.can_write() && !self.write_buf.is_empty() {
            let _ = self.flush().await;
        }
        self.write_buf.clear();
        match std::mem::replace(&mut self.write, WriteSide::None) {
            WriteSide::Raw(mut writer) => {
                let _ = writer.shutdown().await;
            }
            WriteSide::Object(framed) => {
                let mut writer = framed.into_inner();
                let _ = writer.shutdown().await;
            }
            WriteSide::None => {}
        }
        self.read = ReadSide::None;
        self.read_carry.clear();
        self.bind = None;
        self.closed = true;
    }
}

fn find_byte(haystack: &[u8], needle: u8) -> Option<usize> {
    haystack.iter().position(|b| *b == needle)
}

/// Single poll of the reader: `None` when no bytes are immediately available.
async fn read_available(reader: &mut Reader, buf: &mut [u8]) -> Option<io::Result<usize>> {
    futures::future::poll_fn(|cx| {
        let mut read_buf = ReadBuf::new(&mut *buf);
        match Pin::new(&mut **reader).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Ready(None),
            Poll::Ready(Ok(())) => Poll::Ready(Some(Ok(read_buf.filled().len()))),
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
        }
    })
    .await
}
