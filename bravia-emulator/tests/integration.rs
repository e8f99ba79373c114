//! End-to-end tests: the acceptor, real TCP clients, stop handling and a
//! restart against the same state file.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bravia_core::{DisplayClient, Frame, Opcode};
use bravia_emulator::config::EmulatorConfig;
use bravia_emulator::server::EmulatorServer;
use tokio::task::JoinHandle;

// ── Helpers ──────────────────────────────────────────────────────

fn config_for(state_file: &Path) -> EmulatorConfig {
    let mut config = EmulatorConfig::default();
    config.network.port = 0;
    config.storage.state_file = state_file.to_path_buf();
    config.session.pacing_ms = 5;
    config
}

async fn start(
    config: EmulatorConfig,
) -> (Arc<EmulatorServer>, SocketAddr, JoinHandle<std::io::Result<()>>) {
    let server = Arc::new(EmulatorServer::new(config).unwrap());
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn({
        let server = server.clone();
        async move { server.serve(listener).await }
    });
    (server, addr, handle)
}

async fn stop(server: &EmulatorServer, handle: JoinHandle<std::io::Result<()>>) {
    server.stop();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

// ── Tests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_serves_defaults_on_fresh_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sony_stats.json");
    let (server, addr, handle) = start(config_for(&path)).await;

    let mut client = DisplayClient::connect(addr).await.unwrap();
    assert_eq!(
        client.query(Opcode::Volume).await.unwrap().as_str(),
        "*SAVOLU0000000000000064\n"
    );
    assert_eq!(
        client.query(Opcode::Input).await.unwrap().as_str(),
        "*SAINPT0000000100000003\n"
    );
    assert!(path.exists());

    stop(&server, handle).await;
}

#[tokio::test]
async fn test_many_clients_see_one_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sony_stats.json");
    let (server, addr, handle) = start(config_for(&path)).await;

    let mut clients = Vec::new();
    for _ in 0..4 {
        clients.push(DisplayClient::connect(addr).await.unwrap());
    }

    let (ack, notify) = clients[0].control(Opcode::Power, "1").await.unwrap();
    assert_eq!(ack, Frame::acknowledge(Opcode::Power));
    assert_eq!(notify.as_str(), "*SNPOWR0000000000000001\n");

    for client in clients.iter_mut().skip(1) {
        assert_eq!(
            client.query(Opcode::Power).await.unwrap().as_str(),
            "*SAPOWR0000000000000001\n"
        );
    }

    stop(&server, handle).await;
}

#[tokio::test]
async fn test_restart_reloads_persisted_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sony_stats.json");

    let (server, addr, handle) = start(config_for(&path)).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();
    client.control(Opcode::Volume, "12").await.unwrap();
    client.control(Opcode::Input, "500000001").await.unwrap();
    drop(client);
    stop(&server, handle).await;

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["audio_volume_stat"], "*SAVOLU0000000000000012\n");
    assert_eq!(json["input_stat"], "*SAINPT0000000500000001\n");

    let (server, addr, handle) = start(config_for(&path)).await;
    let mut client = DisplayClient::connect(addr).await.unwrap();
    assert_eq!(
        client.query(Opcode::Volume).await.unwrap().as_str(),
        "*SAVOLU0000000000000012\n"
    );
    stop(&server, handle).await;
}

#[tokio::test]
async fn test_stop_closes_open_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sony_stats.json");
    let (server, addr, handle) = start(config_for(&path)).await;

    let mut client = DisplayClient::connect(addr)
        .await
        .unwrap()
        .with_reply_timeout(Duration::from_secs(2));
    client.query(Opcode::Power).await.unwrap();

    stop(&server, handle).await;
    assert!(client.query(Opcode::Power).await.is_err());
}
