//! Fan-out of received frames to any number of subscribers.
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use tokio::sync::broadcast;
use tokio::time::{timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{Result, SerialError};
use crate::logging::LinkLog;

/// One discrete unit of received bytes, timestamped at receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub timestamp: Instant,
    pub bytes: Bytes,
}

impl Frame {
    pub fn new(timestamp: Instant, bytes: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            bytes: bytes.into(),
        }
    }

    /// Frame stamped with the current instant.
    pub fn now(bytes: impl Into<Bytes>) -> Self {
        Self::new(Instant::now(), bytes)
    }
}

/// Broadcast channel of frames with point-in-time subscriptions.
///
/// Frames are published eagerly whether or not anyone listens. Each
/// subscription records its creation instant and never yields a frame stamped
/// earlier than that. Closing the channel releases every pending read with
/// [`SerialError::ConnectionClosed`].
#[derive(Clone)]
pub struct FrameChannel {
    tx: broadcast::Sender<Frame>,
    closed: Arc<Mutex<CancellationToken>>,
    read_timeout: Option<Duration>,
    log: LinkLog,
}

impl FrameChannel {
    /// A channel starts closed; [`FrameChannel::reopen`] arms it.
    pub fn new(capacity: usize, log: LinkLog) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        let closed = CancellationToken::new();
        closed.cancel();
        Self {
            tx,
            closed: Arc::new(Mutex::new(closed)),
            read_timeout: None,
            log,
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Arm the channel for a new connection cycle.
    pub fn reopen(&self) {
        let mut guard = self.closed.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_cancelled() {
            *guard = CancellationToken::new();
        }
    }

    /// Release every pending and future read of the current cycle.
    pub fn close(&self) {
        self.closed_token().cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed_token().is_cancelled()
    }

    pub(crate) fn closed_token(&self) -> CancellationToken {
        self.closed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Push a frame to every active subscription.
    pub fn publish(&self, frame: Frame) {
        self.log.bytes("rx", &frame.bytes);
        // No receivers is fine; frames are not retained for late subscribers.
        let _ = self.tx.send(frame);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Start observing frames received from now on.
    pub fn subscribe(&self) -> FrameSubscription {
        FrameSubscription {
            rx: self.tx.subscribe(),
            since: Instant::now(),
            closed: self.closed_token(),
            read_timeout: self.read_timeout,
            log: self.log.clone(),
        }
    }

    /// Live stream of frames; ends when the channel closes.
    pub fn observe_data(&self) -> BoxStream<'static, Frame> {
        let subscription = self.subscribe();
        Box::pin(stream::unfold(subscription, |mut sub| async move {
            match sub.wait_frame().await {
                Ok(frame) => Some((frame, sub)),
                Err(_) => None,
            }
        }))
    }

    /// First frame observed after the call begins.
    pub async fn read_next(&self) -> Result<Bytes> {
        self.subscribe().next_frame().await.map(|frame| frame.bytes)
    }

    /// First frame after the call begins whose bytes satisfy `predicate`.
    pub async fn read_first<P>(&self, predicate: P) -> Result<Bytes>
    where
        P: FnMut(&[u8]) -> bool,
    {
        self.subscribe().first_matching(predicate).await.map(|frame| frame.bytes)
    }
}

/// One consumer's view of a [`FrameChannel`].
pub struct FrameSubscription {
    rx: broadcast::Receiver<Frame>,
    since: Instant,
    closed: CancellationToken,
    read_timeout: Option<Duration>,
    log: LinkLog,
}

impl FrameSubscription {
    pub fn since(&self) -> Instant {
        self.since
    }

    /// Next frame not older than the subscription, bounded by the read timeout.
    pub async fn next_frame(&mut self) -> Result<Frame> {
        let read_timeout = self.read_timeout;
        match read_timeout {
            Some(limit) => timeout(limit, self.wait_frame())
                .await
                .map_err(|_| SerialError::Timeout)?,
            None => self.wait_frame().await,
        }
    }

    /// Next frame matching `predicate`; non-matching frames are discarded.
    pub async fn first_matching<P>(&mut self, mut predicate: P) -> Result<Frame>
    where
        P: FnMut(&[u8]) -> bool,
    {
        let read_timeout = self.read_timeout;
        let search = async {
            loop {
                let frame = self.wait_frame().await?;
                if predicate(&frame.bytes[..]) {
                    return Ok(frame);
                }
            }
        };
        match read_timeout {
            Some(limit) => timeout(limit, search).await.map_err(|_| SerialError::Timeout)?,
            None => search.await,
        }
    }

    async fn wait_frame(&mut self) -> Result<Frame> {
        loop {
            let received = tokio::select! {
                biased;
                // Drain what was published before the close.
                received = self.rx.recv() => received,
                _ = self.closed.cancelled() => return Err(SerialError::ConnectionClosed),
            };
            match received {
                Ok(frame) if frame.timestamp >= self.since => return Ok(frame),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.log.warn(format_args!("subscriber lagged, {} frames dropped", skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SerialError::ConnectionClosed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_channel() -> FrameChannel {
        let channel = FrameChannel::new(16, LinkLog::default());
        channel.reopen();
        channel
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_skips_frames_older_than_itself() {
        let channel = open_channel();
        let before = Instant::now();
        tokio::time::advance(Duration::from_millis(10)).await;

        let mut sub = channel.subscribe();
        channel.publish(Frame::new(before, vec![1]));
        channel.publish(Frame::new(sub.since(), vec![2]));
        channel.publish(Frame::new(sub.since() + Duration::from_millis(1), vec![3]));

        assert_eq!(sub.next_frame().await.unwrap().bytes.as_ref(), &[2]);
        assert_eq!(sub.next_frame().await.unwrap().bytes.as_ref(), &[3]);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_each_frame_in_order() {
        let channel = open_channel();
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();
        for i in 0..3u8 {
            channel.publish(Frame::now(vec![i]));
        }
        for i in 0..3u8 {
            assert_eq!(a.next_frame().await.unwrap().bytes.as_ref(), &[i]);
            assert_eq!(b.next_frame().await.unwrap().bytes.as_ref(), &[i]);
        }
    }

    #[tokio::test]
    async fn test_read_first_discards_non_matching() {
        let channel = open_channel();
        let reader = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.read_first(|b| b.first() == Some(&0x42)).await })
        };
        while channel.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }
        channel.publish(Frame::now(vec![0x01]));
        channel.publish(Frame::now(vec![0x42, 0x43]));
        assert_eq!(reader.await.unwrap().unwrap().as_ref(), &[0x42, 0x43]);
    }

    #[tokio::test]
    async fn test_close_releases_pending_read() {
        let channel = open_channel();
        let reader = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.read_next().await })
        };
        while channel.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }
        channel.close();
        assert!(matches!(reader.await.unwrap(), Err(SerialError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_after_close_fails_immediately() {
        let channel = open_channel();
        channel.close();
        assert!(channel.is_closed());
        assert!(matches!(channel.read_next().await, Err(SerialError::ConnectionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let channel = open_channel().with_read_timeout(Some(Duration::from_millis(50)));
        assert!(matches!(channel.read_next().await, Err(SerialError::Timeout)));
    }

    #[tokio::test]
    async fn test_observe_data_ends_on_close() {
        use futures_util::StreamExt;

        let channel = open_channel();
        let mut frames = channel.observe_data();
        channel.publish(Frame::now(vec![7]));
        assert_eq!(frames.next().await.unwrap().bytes.as_ref(), &[7]);
        channel.close();
        assert!(frames.next().await.is_none());
    }
}
