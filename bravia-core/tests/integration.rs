//! Integration tests: sessions over real TCP connections on localhost,
//! shared state across clients, and persistence across restarts.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bravia_core::{
    BraviaError, CloseReason, DeviceStateStore, DisplayClient, Frame, InputPort, Kind, Opcode,
    Session, SessionConfig,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// ── Helpers ──────────────────────────────────────────────────────

fn fast() -> SessionConfig {
    SessionConfig {
        pacing: Duration::from_millis(5),
        idle_timeout: None,
    }
}

/// Accept connections forever, one session task each. Returns the bound
/// address and a channel of session handles in accept order.
async fn serve(
    store: Arc<DeviceStateStore>,
) -> (SocketAddr, tokio::sync::mpsc::UnboundedReceiver<JoinHandle<CloseReason>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let (stream, peer) = listener.accept().await.unwrap();
            let session = Session::new(stream, peer, store.clone(), fast());
            if tx.send(tokio::spawn(session.run())).is_err() {
                break;
            }
        }
    });

    (addr, rx)
}

fn file_store(path: &Path) -> Arc<DeviceStateStore> {
    Arc::new(DeviceStateStore::open(path).unwrap())
}

// ── Control & enquiry ────────────────────────────────────────────

#[tokio::test]
async fn test_control_then_query_every_opcode() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();

    for (opcode, payload) in [
        (Opcode::Power, "1"),
        (Opcode::AudioMute, "1"),
        (Opcode::Volume, "60"),
        (Opcode::PictureMute, "1"),
        (Opcode::Input, "100000002"),
    ] {
        let (ack, notify) = client.control(opcode, payload).await.unwrap();
        assert_eq!(ack, Frame::acknowledge(opcode));
        assert_eq!(notify.kind().unwrap(), Kind::Notify);

        let reply = client.query(opcode).await.unwrap();
        assert_eq!(reply, store.get(opcode));
        assert_eq!(reply.with_kind(Kind::Notify), notify);
    }

    let status = store.status();
    assert!(status.power);
    assert!(status.audio_muted);
    assert!(status.picture_muted);
    assert_eq!(status.volume, Some(60));
    assert_eq!(status.input_port, Some(InputPort::Hdmi));
    assert_eq!(status.input_number, Some(2));
}

#[tokio::test]
async fn test_input_scenario_port_five() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();

    client
        .send(Frame::try_from("*SCINPT0000000500000001\n").unwrap())
        .await
        .unwrap();
    assert_eq!(client.recv().await.unwrap(), Frame::acknowledge(Opcode::Input));
    assert_eq!(
        client.recv().await.unwrap().as_str(),
        "*SNINPT0000000500000001\n"
    );

    let reply = client.query(Opcode::Input).await.unwrap();
    assert_eq!(reply.as_str(), "*SAINPT0000000500000001\n");
}

#[tokio::test]
async fn test_query_does_not_mutate() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let before = store.snapshot();
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();

    for opcode in Opcode::ALL {
        assert_eq!(client.query(opcode).await.unwrap(), before.get(opcode));
    }
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_repeated_control_yields_same_frames() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();

    let first = client.control(Opcode::AudioMute, "1").await.unwrap();
    let state = store.snapshot();
    let second = client.control(Opcode::AudioMute, "1").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.snapshot(), state);
}

// ── Malformed input ──────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_opcode_times_out() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr)
        .await
        .unwrap()
        .with_reply_timeout(Duration::from_millis(200));

    client.send_raw(b"*SCTYPE0000000000000001\n").await.unwrap();
    assert!(matches!(client.recv().await, Err(BraviaError::Timeout(_))));

    // The session is still there.
    assert_eq!(
        client.query(Opcode::Power).await.unwrap(),
        store.get(Opcode::Power)
    );
}

#[tokio::test]
async fn test_short_frame_dropped_connection_kept() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let before = store.snapshot();
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();

    client.send_raw(b"*SCPOWR000000000000001\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.snapshot(), before);

    assert_eq!(client.query(Opcode::Power).await.unwrap(), before.power);
}

#[tokio::test]
async fn test_long_frame_dropped_connection_kept() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let before = store.snapshot();
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();

    client.send_raw(b"*SCPOWR0000000000000001\n\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.snapshot(), before);

    // The next frame back answers the enquiry; no ack was sent.
    assert_eq!(client.query(Opcode::Power).await.unwrap(), before.power);
}

#[tokio::test]
async fn test_disconnect_ends_session() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let (addr, mut sessions) = serve(store).await;

    let client = DisplayClient::connect(addr).await.unwrap();
    let handle = sessions.recv().await.unwrap();
    drop(client);

    let reason = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("timeout")
        .unwrap();
    assert!(reason.is_disconnect());
}

// ── Shared state & persistence ───────────────────────────────────

#[tokio::test]
async fn test_clients_share_state() {
    let store = Arc::new(DeviceStateStore::in_memory());
    let (addr, _sessions) = serve(store).await;
    let mut a = DisplayClient::connect(addr).await.unwrap();
    let mut b = DisplayClient::connect(addr).await.unwrap();

    a.control(Opcode::Volume, "25").await.unwrap();
    let reply = b.query(Opcode::Volume).await.unwrap();
    assert_eq!(reply.trailing_number(3), Some(25));
}

#[tokio::test]
async fn test_concurrent_clients_no_lost_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = file_store(&path);
    let (addr, _sessions) = serve(store).await;

    let power = tokio::spawn(async move {
        let mut c = DisplayClient::connect(addr).await.unwrap();
        for _ in 0..5 {
            c.control(Opcode::Power, "1").await.unwrap();
        }
    });
    let volume = tokio::spawn(async move {
        let mut c = DisplayClient::connect(addr).await.unwrap();
        for _ in 0..5 {
            c.control(Opcode::Volume, "77").await.unwrap();
        }
    });
    power.await.unwrap();
    volume.await.unwrap();

    let reloaded = DeviceStateStore::open(&path).unwrap().status();
    assert!(reloaded.power);
    assert_eq!(reloaded.volume, Some(77));
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let store = file_store(&path);
    let (addr, _sessions) = serve(store.clone()).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();
    client.control(Opcode::PictureMute, "1").await.unwrap();
    client.control(Opcode::Input, "400000001").await.unwrap();
    let before = store.snapshot();

    let restarted = DeviceStateStore::open(&path).unwrap();
    assert_eq!(restarted.snapshot(), before);
    assert_eq!(
        restarted.get(Opcode::Input).as_str(),
        "*SAINPT0000000400000001\n"
    );
}
