//! Full bridge over a loopback socket: a fake peer announces three anchors,
//! the detector file holds the matching markers plus one unpaired marker, and
//! the peer must receive that marker mapped into its own frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use approx::assert_relative_eq;
use framebridge_middleware::{DEFAULT_MAX_FRAME_BYTES, JsonFileSource, SocketSession};
use framebridge_perception::{CalibrationEngine, CalibrationRecord, PairingTable, Transform};
use framebridge_runtime::{OrchestratorConfig, SessionContext, SessionOrchestrator};
use framebridge_types::CorrespondencePair;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

const ANCHORS: &str = concat!(
    r#"{"resp":"anchor_created","id":0,"x":0.0,"y":0.0,"z":0.0}"#,
    "\n",
    r#"{"resp":"From Server"}"#,
    "\n",
    r#"{"resp":"anchor_created","id":1,"x":1.0,"y":0.0,"z":0.0}"#,
    "\n",
    r#"{"resp":"anchor_created","id":2,"x":0.0,"y":1.0,"z":0.0}"#,
    "\n",
);

const DETECTIONS: &str =
    r#"{"0": [10, 5, 0], "1": [11, 5, 0], "2": [10, 6, 0], "3": [10, 5, 0]}"#;

#[tokio::test]
async fn unpaired_marker_reaches_peer_in_reference_frame() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let detections = dir.path().join("output.json");
    let record = dir.path().join("calibration.json");
    std::fs::write(&detections, DETECTIONS).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let shutdown = Arc::new(AtomicBool::new(false));

    // Fake peer: announce anchors, wait for pose 3, then ask the bridge to stop
    // and drain until it closes its side.
    let peer_flag = shutdown.clone();
    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(ANCHORS.as_bytes()).await.unwrap();

        let mut lines = BufReader::new(read_half).lines();
        let mut pose = None;
        while let Some(line) = lines.next_line().await.unwrap() {
            let value: Value = serde_json::from_str(&line).unwrap();
            let message = &value["message"];
            assert_eq!(message["type"], "pose");
            if pose.is_none() && message["id"] == 3 {
                pose = Some(message.clone());
                peer_flag.store(true, Ordering::SeqCst);
            }
        }
        pose
    });

    let session = SocketSession::connect(addr, Duration::from_secs(2), DEFAULT_MAX_FRAME_BYTES)
        .await
        .unwrap();
    let pairing = PairingTable::new((0..3).map(|i| CorrespondencePair::new(i, i))).unwrap();
    let context = SessionContext::new(pairing, CalibrationEngine::default());
    let config = OrchestratorConfig {
        poll_interval: Duration::from_millis(5),
        record_path: Some(record.clone()),
        ..OrchestratorConfig::default()
    };
    let mut orchestrator =
        SessionOrchestrator::new(session, JsonFileSource::new(&detections), context, config);

    tokio::time::timeout(Duration::from_secs(10), orchestrator.run(shutdown))
        .await
        .expect("bridge stops once the peer has its pose")
        .unwrap();

    let pose = peer.await.unwrap().expect("peer received pose 3");
    assert_relative_eq!(pose["x"].as_f64().unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(pose["y"].as_f64().unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(pose["z"].as_f64().unwrap(), 0.0, epsilon = 1e-9);

    let Some(Transform::Rigid(rigid)) = orchestrator.context().transform().copied() else {
        panic!("rigid transform frozen");
    };
    assert_relative_eq!(rigid.scale, 1.0, epsilon = 1e-9);
    assert_relative_eq!(rigid.rotation.determinant(), 1.0, epsilon = 1e-9);
    assert_relative_eq!(rigid.translation.x, -10.0, epsilon = 1e-9);
    assert_relative_eq!(rigid.translation.y, -5.0, epsilon = 1e-9);

    let saved = CalibrationRecord::load(&record).unwrap();
    assert_eq!(saved.pair_count, 3);
    assert!(saved.rms_error < 1e-6);
}
