use std::sync::{Arc, Mutex};
use std::time::Duration;

use boardlink::device::{create_control, open_device};
use boardlink::protocol::layout::{MICROBIT_DELIMITER, WISE_XBOARD_DELIMITER, WISE_XBOARD_PREMIUM_DELIMITER};
use boardlink::protocol::ProtocolError;
use boardlink::serial::{BoxedTransport, Connector, SerialError, SerialLink};
use boardlink::{DeviceControl, DeviceError, DeviceKind, LinkConfig, WiseXboardControl, WiseXboardPremiumControl};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

const PREMIUM_PINS: [u8; 7] = [10, 20, 30, 40, 50, 60, 70];
// 10 ^ 20 ^ 30 ^ 40 ^ 50 ^ 60 ^ 70
const PREMIUM_XOR: u8 = 96;

fn pipe_connector(peers: Arc<Mutex<Vec<DuplexStream>>>) -> impl Connector {
    move || -> boardlink::serial::Result<BoxedTransport> {
        let (near, far) = duplex(1024);
        peers.lock().unwrap().push(far);
        Ok(Box::new(near) as BoxedTransport)
    }
}

/// Opened link for `kind` plus the board side of the pipe.
fn attach(kind: DeviceKind) -> (Arc<SerialLink>, DuplexStream) {
    let peers = Arc::new(Mutex::new(Vec::new()));
    let link = Arc::new(
        kind.descriptor()
            .link_with(pipe_connector(peers.clone()), LinkConfig::default()),
    );
    link.open().unwrap();
    let peer = peers.lock().unwrap().pop().unwrap();
    (link, peer)
}

fn framed(payload: &[u8], delimiter: &[u8]) -> Vec<u8> {
    let mut bytes = payload.to_vec();
    bytes.extend_from_slice(delimiter);
    bytes
}

fn premium_frame(trailer: u8) -> Vec<u8> {
    let mut payload = PREMIUM_PINS.to_vec();
    payload.push(trailer);
    framed(&payload, WISE_XBOARD_PREMIUM_DELIMITER)
}

async fn wait_for_subscriber(link: &SerialLink) {
    while link.channel().subscriber_count() == 0 {
        tokio::task::yield_now().await;
    }
}

/// Send `first` once a read is pending, then keep sending `rest` until the
/// task completes.
async fn feed_until_done<T>(
    link: &SerialLink,
    peer: &mut DuplexStream,
    task: &JoinHandle<T>,
    first: &[u8],
    rest: &[u8],
) {
    wait_for_subscriber(link).await;
    peer.write_all(first).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        while !task.is_finished() {
            peer.write_all(rest).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("read did not complete");
}

#[tokio::test]
async fn test_premium_read_recovers_from_one_corrupt_frame() {
    let (link, mut peer) = attach(DeviceKind::WiseXboardPremium);
    let control = Arc::new(WiseXboardPremiumControl::new(link.clone()));

    let task = {
        let control = control.clone();
        tokio::spawn(async move { control.analog_read().await })
    };
    feed_until_done(&link, &mut peer, &task, &premium_frame(0), &premium_frame(PREMIUM_XOR)).await;

    let reading = task.await.unwrap().unwrap();
    assert_eq!(reading.values(), &PREMIUM_PINS);
}

#[tokio::test]
async fn test_premium_read_gives_up_after_budget() {
    let (link, mut peer) = attach(DeviceKind::WiseXboardPremium);
    let control = Arc::new(WiseXboardPremiumControl::new(link.clone()));

    let task = {
        let control = control.clone();
        tokio::spawn(async move { control.analog_read().await })
    };
    let corrupt = premium_frame(0);
    feed_until_done(&link, &mut peer, &task, &corrupt, &corrupt).await;

    match task.await.unwrap() {
        Err(DeviceError::RetryExhausted { attempts, last }) => {
            assert_eq!(attempts, 2);
            assert!(matches!(last, ProtocolError::ChecksumMismatch { .. }));
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_premium_short_frame_is_a_length_error() {
    let (link, mut peer) = attach(DeviceKind::WiseXboardPremium);
    let control = Arc::new(WiseXboardPremiumControl::new(link.clone()));

    let task = {
        let control = control.clone();
        tokio::spawn(async move { control.analog_read().await })
    };
    let short = framed(&[1, 2, 3], WISE_XBOARD_PREMIUM_DELIMITER);
    feed_until_done(&link, &mut peer, &task, &short, &short).await;

    assert!(matches!(
        task.await.unwrap(),
        Err(DeviceError::RetryExhausted {
            last: ProtocolError::FrameLength { expected: 8, actual: 3 },
            ..
        })
    ));
}

#[tokio::test]
async fn test_premium_remocon_is_seventh_pin() {
    let (link, mut peer) = attach(DeviceKind::WiseXboardPremium);
    let control = Arc::new(WiseXboardPremiumControl::new(link.clone()));

    let task = {
        let control = control.clone();
        tokio::spawn(async move { control.read_remocon().await })
    };
    let valid = premium_frame(PREMIUM_XOR);
    feed_until_done(&link, &mut peer, &task, &valid, &valid).await;
    assert_eq!(task.await.unwrap().unwrap(), 70);
}

#[tokio::test]
async fn test_premium_motor_packet_on_the_wire() {
    let (link, mut peer) = attach(DeviceKind::WiseXboardPremium);
    let control = WiseXboardPremiumControl::new(link);

    control.set_dc_motor_speed(-20, 150, -5, 0).await.unwrap();
    let mut buf = [0u8; 8];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, [0x23, 5, 0x82, 236, 100, 251, 0, 241]);

    control.stop_dc_motor().await.unwrap();
    let mut buf = [0u8; 4];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, [0x23, 1, 0x83, 0x83]);
}

#[tokio::test]
async fn test_xboard_motor_command_is_followed_by_execute() {
    let (link, mut peer) = attach(DeviceKind::WiseXboard);
    let control = WiseXboardControl::new(link);

    control.set_dc_motor_speed(3, -3, 20, 0).await.unwrap();
    let mut buf = [0u8; 24];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf[..9], &[b'X', b'R', 0, 3, 253, 10, 0, 0, b'S']);
    assert_eq!(
        &buf[9..],
        &[0xFF, 0xFF, 0x4C, 0x53, 0, 0, 0, 0, 0x30, 0x0C, 0x03, 2, 0, 100, 0xA5]
    );
}

#[tokio::test]
async fn test_xboard_humanoid_motion_is_sent_alone() {
    let (link, mut peer) = attach(DeviceKind::WiseXboard);
    let control = WiseXboardControl::new(link);

    control.set_humanoid_motion(5).await.unwrap();
    control.digital_write(1, 1).await.unwrap();
    let mut buf = [0u8; 24];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf[11], 5);
    assert_eq!(buf[14], 168);
    assert_eq!(&buf[15..], b"XR\x02\x01\x00\x00\x00\x00S");
}

#[tokio::test]
async fn test_xboard_analog_read() {
    let (link, mut peer) = attach(DeviceKind::WiseXboard);
    let control = create_control(DeviceKind::WiseXboard, link.clone());

    let task = tokio::spawn(async move { control.analog_read().await });
    wait_for_subscriber(&link).await;
    peer.write_all(&framed(&[1, 2, 3, 4, 5], WISE_XBOARD_DELIMITER)).await.unwrap();
    assert_eq!(task.await.unwrap().unwrap().values(), &[1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_microbit_digital_read_thresholds_at_100() {
    let (link, mut peer) = attach(DeviceKind::Microbit);
    let control = create_control(DeviceKind::Microbit, link.clone());
    assert_eq!(control.descriptor().kind, DeviceKind::Microbit);

    let task = tokio::spawn(async move { control.digital_read().await });
    wait_for_subscriber(&link).await;
    peer.write_all(&framed(&[0, 101, 100, 255, 3], MICROBIT_DELIMITER)).await.unwrap();
    assert_eq!(task.await.unwrap().unwrap(), vec![false, true, false, true, false]);
}

#[tokio::test]
async fn test_operations_before_open_are_not_connected() {
    let link = Arc::new(
        DeviceKind::WiseXboardPremium
            .descriptor()
            .link_with(pipe_connector(Default::default()), LinkConfig::default()),
    );
    let control = WiseXboardPremiumControl::new(link);
    assert!(!control.is_readable());
    assert!(matches!(control.analog_read().await, Err(DeviceError::NotConnected)));
    assert!(matches!(control.stop_dc_motor().await, Err(DeviceError::NotConnected)));
}

#[tokio::test]
async fn test_peer_eof_releases_read_then_not_connected() {
    let (link, peer) = attach(DeviceKind::Microbit);
    let control = create_control(DeviceKind::Microbit, link.clone());
    let control = Arc::<dyn DeviceControl>::from(control);

    let task = {
        let control = control.clone();
        tokio::spawn(async move { control.analog_read().await })
    };
    wait_for_subscriber(&link).await;
    drop(peer);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_connection_closed());
    assert!(matches!(control.analog_read().await, Err(DeviceError::NotConnected)));
}

#[tokio::test]
async fn test_open_device_missing_port() {
    let err = open_device(DeviceKind::Microbit, "/dev/boardlink-missing", LinkConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, DeviceError::SerialError(SerialError::ConnectionFailed(_))));
}
