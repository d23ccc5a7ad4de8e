use std::time::Duration;

use tokio::{net::UdpSocket, sync::broadcast, time::timeout};

use wsjtx_relay::{
    contact::{ContactRecord, FieldValue},
    proto::{
        MAGIC,
        frame::FrameWriter,
        message::{self, MessageBody},
    },
    relay::{
        events::RelayEvent,
        handle::{RelayError, spawn_relay},
    },
    types::{RelaySettings, RelayStatus},
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn free_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("probe bind");
    socket.local_addr().expect("probe addr").port()
}

fn heartbeat_frame() -> Vec<u8> {
    let mut w = FrameWriter::new();
    w.u32(MAGIC)
        .u32(2)
        .u32(message::KIND_HEARTBEAT)
        .string(Some("WSJT-X"));
    w.into_bytes()
}

async fn wait_for(
    events: &mut broadcast::Receiver<RelayEvent>,
    pred: impl Fn(&RelayEvent) -> bool,
) -> RelayEvent {
    for _ in 0..100 {
        let event = timeout(RECV_TIMEOUT, events.recv())
            .await
            .expect("event timeout")
            .expect("event stream closed");
        if pred(&event) {
            return event;
        }
    }
    panic!("expected event never observed");
}

#[test]
fn settings_port_validation_rejects_only_zero() {
    assert!(!RelaySettings::valid_port(0));
    assert!(RelaySettings::valid_port(1));
    assert!(RelaySettings::valid_port(2237));
    assert!(RelaySettings::valid_port(u16::MAX));
}

#[tokio::test]
async fn client_traffic_fans_out_and_replies_route_back() {
    let forward = UdpSocket::bind("127.0.0.1:0").await.expect("forward bind");
    let forward_addr = forward.local_addr().expect("forward addr");
    let listen_port = free_port().await;

    let relay = spawn_relay(RelaySettings::new(listen_port, vec![forward_addr]));
    let mut events = relay.subscribe();
    relay.start().await.expect("start");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Running))
    })
    .await;
    assert_eq!(
        relay.is_running().await.expect("is_running"),
        RelayStatus::Running
    );

    // Client datagram reaches the forward verbatim.
    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client bind");
    let packet = heartbeat_frame();
    client
        .send_to(&packet, ("127.0.0.1", listen_port))
        .await
        .expect("client send");

    let mut buf = [0u8; 2048];
    let (len, _) = timeout(RECV_TIMEOUT, forward.recv_from(&mut buf))
        .await
        .expect("forward recv timeout")
        .expect("forward recv");
    assert_eq!(&buf[..len], packet.as_slice());

    let decoded = wait_for(&mut events, |e| matches!(e, RelayEvent::Decoded(_))).await;
    let RelayEvent::Decoded(frame) = decoded else {
        unreachable!()
    };
    assert_eq!(frame.body, MessageBody::Heartbeat);

    // Reply from the forward routes back through the mapping.
    forward
        .send_to(b"reply-bytes", ("127.0.0.1", listen_port))
        .await
        .expect("forward send");
    let (len, _) = timeout(RECV_TIMEOUT, client.recv_from(&mut buf))
        .await
        .expect("client recv timeout")
        .expect("client recv");
    assert_eq!(&buf[..len], b"reply-bytes");

    relay.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn forward_reply_without_mapping_is_dropped() {
    let forward = UdpSocket::bind("127.0.0.1:0").await.expect("forward bind");
    let forward_addr = forward.local_addr().expect("forward addr");
    let listen_port = free_port().await;

    let relay = spawn_relay(RelaySettings::new(listen_port, vec![forward_addr]));
    let mut events = relay.subscribe();
    relay.start().await.expect("start");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Running))
    })
    .await;

    forward
        .send_to(b"orphan", ("127.0.0.1", listen_port))
        .await
        .expect("forward send");

    let log = wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Log(line) if line.contains("<no-mapping> (dropped)"))
    })
    .await;
    let RelayEvent::Log(line) = log else {
        unreachable!()
    };
    assert!(line.contains("(6 bytes)"), "unexpected log line: {line}");

    relay.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn resend_frames_records_and_reaches_the_forward() {
    let forward = UdpSocket::bind("127.0.0.1:0").await.expect("forward bind");
    let forward_addr = forward.local_addr().expect("forward addr");
    let listen_port = free_port().await;

    let relay = spawn_relay(RelaySettings::new(listen_port, vec![forward_addr]));
    let mut events = relay.subscribe();
    relay.start().await.expect("start");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Running))
    })
    .await;

    let mut record = ContactRecord::new();
    record.insert("call", FieldValue::Text("JA1XYZ".to_string()));
    record.insert("band", FieldValue::Text("20M".to_string()));
    record.insert("mode", FieldValue::Text("FT8".to_string()));
    relay.resend(vec![record.clone()]).await.expect("resend");

    let mut buf = [0u8; 4096];
    let (len, _) = timeout(RECV_TIMEOUT, forward.recv_from(&mut buf))
        .await
        .expect("forward recv timeout")
        .expect("forward recv");
    let frame = message::decode(&buf[..len]).expect("decode");
    assert_eq!(frame.header.kind, message::KIND_LOGGED_ADIF);
    let MessageBody::LoggedAdif(body) = frame.body else {
        panic!("expected logged adif body");
    };
    assert_eq!(body.contacts, vec![record.clone()]);

    let logged = wait_for(&mut events, |e| matches!(e, RelayEvent::ContactLogged(_))).await;
    assert_eq!(logged, RelayEvent::ContactLogged(record));
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Log(line) if line.starts_with("Manual QSO -> "))
    })
    .await;

    relay.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn resend_without_forwards_is_a_logged_no_op() {
    let listen_port = free_port().await;
    let relay = spawn_relay(RelaySettings::new(listen_port, Vec::new()));
    let mut events = relay.subscribe();
    relay.start().await.expect("start");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Running))
    })
    .await;

    let mut record = ContactRecord::new();
    record.insert("call", FieldValue::Text("K1JT".to_string()));
    relay.resend(vec![record]).await.expect("resend");

    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Log(line) if line == "No forwards configured, resend skipped")
    })
    .await;

    relay.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn update_settings_restarts_only_on_material_change() {
    let fwd_a: std::net::SocketAddr = "127.0.0.1:2238".parse().expect("addr");
    let fwd_b: std::net::SocketAddr = "127.0.0.1:2239".parse().expect("addr");
    let listen_port = free_port().await;

    let relay = spawn_relay(RelaySettings::new(listen_port, vec![fwd_a, fwd_b]));
    let mut startup = relay.subscribe();
    relay.start().await.expect("start");
    wait_for(&mut startup, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Running))
    })
    .await;

    // Value-equal settings, different forward order: no restart.
    let mut events = relay.subscribe();
    relay
        .update_settings(RelaySettings::new(listen_port, vec![fwd_b, fwd_a]))
        .await
        .expect("update");
    assert!(
        timeout(Duration::from_millis(300), events.recv()).await.is_err(),
        "value-equal settings must not restart the relay"
    );

    // Port change: stop then start on the new port.
    let new_port = free_port().await;
    relay
        .update_settings(RelaySettings::new(new_port, vec![fwd_a, fwd_b]))
        .await
        .expect("update");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Stopped))
    })
    .await;
    let running = wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Log(line) if line.starts_with("Listening on "))
    })
    .await;
    let RelayEvent::Log(line) = running else {
        unreachable!()
    };
    assert!(line.contains(&format!("0.0.0.0:{new_port}")));
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Running))
    })
    .await;

    // Stopped relay takes new settings without starting.
    relay.stop().await.expect("stop");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Stopped))
    })
    .await;
    relay
        .update_settings(RelaySettings::new(free_port().await, vec![fwd_a]))
        .await
        .expect("update");
    assert_eq!(
        relay.is_running().await.expect("is_running"),
        RelayStatus::Stopped
    );

    relay.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let listen_port = free_port().await;
    let relay = spawn_relay(RelaySettings::new(listen_port, Vec::new()));

    // Stop before ever starting is safe.
    relay.stop().await.expect("stop");
    assert_eq!(
        relay.is_running().await.expect("is_running"),
        RelayStatus::Stopped
    );

    relay.start().await.expect("start");
    let mut events = relay.subscribe();
    relay.start().await.expect("second start");
    assert!(
        timeout(Duration::from_millis(300), events.recv()).await.is_err(),
        "second start must be a no-op"
    );

    relay.stop().await.expect("stop");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Stopped))
    })
    .await;
    relay.stop().await.expect("second stop");

    relay.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn bind_failure_fails_the_start_call() {
    // Hold the port so the relay's bind attempt loses.
    let occupied = UdpSocket::bind("0.0.0.0:0").await.expect("occupy bind");
    let port = occupied.local_addr().expect("occupy addr").port();

    let relay = spawn_relay(RelaySettings::new(port, Vec::new()));
    let mut events = relay.subscribe();
    let err = relay.start().await.expect_err("bind must fail");
    assert!(matches!(err, RelayError::Bind(_)));
    assert_eq!(
        relay.is_running().await.expect("is_running"),
        RelayStatus::Stopped
    );

    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Error(line) if line.starts_with("Bind failed on port "))
    })
    .await;
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Stopped))
    })
    .await;

    relay.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn inject_without_source_fans_out_but_records_no_mapping() {
    let forward = UdpSocket::bind("127.0.0.1:0").await.expect("forward bind");
    let forward_addr = forward.local_addr().expect("forward addr");
    let listen_port = free_port().await;

    let relay = spawn_relay(RelaySettings::new(listen_port, vec![forward_addr]));
    let mut events = relay.subscribe();
    relay.start().await.expect("start");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Status(RelayStatus::Running))
    })
    .await;

    relay
        .inject(heartbeat_frame(), None)
        .await
        .expect("inject");

    let mut buf = [0u8; 2048];
    let (len, _) = timeout(RECV_TIMEOUT, forward.recv_from(&mut buf))
        .await
        .expect("forward recv timeout")
        .expect("forward recv");
    assert_eq!(&buf[..len], heartbeat_frame().as_slice());

    // No mapping was recorded, so a reply from the forward is dropped.
    forward
        .send_to(b"orphan", ("127.0.0.1", listen_port))
        .await
        .expect("forward send");
    wait_for(&mut events, |e| {
        matches!(e, RelayEvent::Log(line) if line.contains("<no-mapping> (dropped)"))
    })
    .await;

    relay.shutdown().await.expect("shutdown");
}
