use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::channel::{Frame, FrameChannel, FrameSubscription};
use super::framing::FrameCodec;
use super::{Result, SerialError};
use crate::config::LinkConfig;
use crate::logging::LinkLog;

const READ_BUFFER_SIZE: usize = 512;

/// Any duplex byte stream a link can run over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedTransport = Box<dyn Transport>;

/// Produces a fresh transport each time a link opens.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<BoxedTransport>;

    fn describe(&self) -> String {
        "transport".to_string()
    }
}

impl<F> Connector for F
where
    F: Fn() -> Result<BoxedTransport> + Send + Sync,
{
    fn connect(&self) -> Result<BoxedTransport> {
        self()
    }
}

/// Opens an OS serial device through `tokio-serial`.
#[derive(Debug, Clone)]
pub struct SerialPortConnector {
    pub path: String,
    pub baud_rate: u32,
}

impl SerialPortConnector {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

impl Connector for SerialPortConnector {
    fn connect(&self) -> Result<BoxedTransport> {
        let builder = tokio_serial::new(self.path.as_str(), self.baud_rate);
        let stream = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| SerialError::ConnectionFailed(format!("{}: {}", self.path, e)))?;
        Ok(Box::new(stream))
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.path, self.baud_rate)
    }
}

/// Connection state of one link.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

type SharedWriter = Arc<Mutex<WriteHalf<BoxedTransport>>>;

/// Write half of one connection cycle. `closing` fires on `close()` only, so
/// a write to a peer that hung up still reports the transport error.
struct WriteSide {
    half: SharedWriter,
    closing: CancellationToken,
}

struct LinkState {
    connection: ConnectionState,
    reader: Option<JoinHandle<()>>,
    writer: Option<WriteSide>,
}

/// One serial connection: open/close lifecycle, frame splitting, writes.
///
/// Opening connects the transport and spawns a reader task that splits the
/// byte stream with a [`FrameCodec`] and publishes every frame on the link's
/// [`FrameChannel`]. Writes go through a single-writer lock so a multi-packet
/// command reaches the wire contiguously.
pub struct SerialLink {
    id: Uuid,
    connector: Box<dyn Connector>,
    codec: FrameCodec,
    channel: FrameChannel,
    state: StdMutex<LinkState>,
    readable: Arc<AtomicBool>,
    config: LinkConfig,
    log: LinkLog,
}

impl SerialLink {
    pub fn builder(connector: impl Connector + 'static) -> SerialLinkBuilder {
        SerialLinkBuilder::new(connector)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn log(&self) -> &LinkLog {
        &self.log
    }

    pub fn delimiter(&self) -> Option<&[u8]> {
        self.codec.delimiter()
    }

    pub fn channel(&self) -> &FrameChannel {
        &self.channel
    }

    pub fn state(&self) -> ConnectionState {
        self.lock_state().connection
    }

    /// True iff the link is open and the transport has not ended.
    pub fn is_readable(&self) -> bool {
        self.state() == ConnectionState::Open && self.readable.load(Ordering::Acquire)
    }

    /// Connect the transport and start publishing frames. No-op when already open.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self) -> Result<()> {
        let mut state = self.lock_state();
        if state.connection == ConnectionState::Open {
            self.log.debug(format_args!("link {} already open", self.id));
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SerialError::ConnectionFailed(format!("no tokio runtime: {}", e)))?;
        let transport = self.connector.connect()?;
        let (read_half, write_half) = tokio::io::split(transport);

        self.channel.reopen();
        self.readable.store(true, Ordering::Release);

        let frames = FramedRead::with_capacity(read_half, self.codec.clone(), READ_BUFFER_SIZE);
        let reader = runtime.spawn(read_loop(
            frames,
            self.channel.clone(),
            self.channel.closed_token(),
            self.readable.clone(),
            self.log.clone(),
        ));

        state.connection = ConnectionState::Open;
        state.reader = Some(reader);
        state.writer = Some(WriteSide {
            half: Arc::new(Mutex::new(write_half)),
            closing: CancellationToken::new(),
        });
        self.log.info(format_args!("link {} opened on {}", self.id, self.connector.describe()));
        Ok(())
    }

    /// Tear down the reader, release pending reads and drop the transport.
    /// No-op when already closed.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if state.connection == ConnectionState::Closed {
            self.log.debug(format_args!("link {} already closed", self.id));
            return;
        }
        state.connection = ConnectionState::Closed;
        self.readable.store(false, Ordering::Release);
        self.channel.close();
        if let Some(reader) = state.reader.take() {
            reader.abort();
        }
        // Parked writes bail out and drop their handle on the transport.
        if let Some(writer) = state.writer.take() {
            writer.closing.cancel();
        }
        self.log.info(format_args!("link {} closed", self.id));
    }

    /// Send one packet, waiting for the transport to accept all of it.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        self.write_packets(&[bytes]).await
    }

    /// Send several packets back to back while holding the writer lock.
    ///
    /// A write waiting on backpressure (or on the lock) when the link closes
    /// fails with [`SerialError::ConnectionClosed`].
    pub async fn write_packets(&self, packets: &[&[u8]]) -> Result<()> {
        let (half, closing) = self
            .lock_state()
            .writer
            .as_ref()
            .map(|writer| (writer.half.clone(), writer.closing.clone()))
            .ok_or(SerialError::ConnectionClosed)?;

        let send = async {
            let mut writer = half.lock().await;
            for packet in packets {
                self.log.bytes("tx", packet);
                writer.write_all(packet).await?;
            }
            writer.flush().await?;
            Ok::<(), SerialError>(())
        };
        tokio::select! {
            result = send => result,
            _ = closing.cancelled() => {
                self.log.debug(format_args!("write on link {} abandoned by close", self.id));
                Err(SerialError::ConnectionClosed)
            }
        }
    }

    pub fn subscribe(&self) -> FrameSubscription {
        self.channel.subscribe()
    }

    pub fn observe_data(&self) -> BoxStream<'static, Frame> {
        self.channel.observe_data()
    }

    pub async fn read_next(&self) -> Result<Bytes> {
        self.channel.read_next().await
    }

    pub async fn read_first<P>(&self, predicate: P) -> Result<Bytes>
    where
        P: FnMut(&[u8]) -> bool,
    {
        self.channel.read_first(predicate).await
    }

    fn lock_state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop(
    mut frames: FramedRead<ReadHalf<BoxedTransport>, FrameCodec>,
    channel: FrameChannel,
    stop: CancellationToken,
    readable: Arc<AtomicBool>,
    log: LinkLog,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => return,
            next = frames.next() => next,
        };
        match next {
            Some(Ok(bytes)) => channel.publish(Frame::now(bytes)),
            Some(Err(e)) => {
                log.warn(format_args!("transport read error: {}", e));
                break;
            }
            None => {
                log.info(format_args!("transport ended"));
                break;
            }
        }
    }
    if frames.decoder().trimmed() > 0 {
        log.debug(format_args!("frame accumulator trimmed {} times", frames.decoder().trimmed()));
    }
    readable.store(false, Ordering::Release);
    // Only this generation's token; a reopened link has a fresh one.
    stop.cancel();
}

/// Builder for [`SerialLink`].
pub struct SerialLinkBuilder {
    connector: Box<dyn Connector>,
    delimiter: Option<Vec<u8>>,
    config: LinkConfig,
    log: Option<LinkLog>,
}

impl SerialLinkBuilder {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            delimiter: None,
            config: LinkConfig::default(),
            log: None,
        }
    }

    pub fn delimiter(mut self, delimiter: Option<&[u8]>) -> Self {
        self.delimiter = delimiter.map(<[u8]>::to_vec);
        self
    }

    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn log(mut self, log: LinkLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> SerialLink {
        let log = self.log.unwrap_or_else(|| self.config.log("boardlink::link"));
        let channel = FrameChannel::new(self.config.event_capacity, log.child("frames"))
            .with_read_timeout(self.config.read_timeout());
        SerialLink {
            id: Uuid::new_v4(),
            connector: self.connector,
            codec: FrameCodec::new(self.delimiter.as_deref(), self.config.max_frame_len),
            channel,
            state: StdMutex::new(LinkState {
                connection: ConnectionState::Closed,
                reader: None,
                writer: None,
            }),
            readable: Arc::new(AtomicBool::new(false)),
            config: self.config,
            log,
        }
    }
}
