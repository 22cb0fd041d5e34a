use std::sync::Arc;
use std::time::Duration;

use lib_yamcs::model::{TelemetryIdentifier, TelemetryPoint, TelemetryValue};
use lib_yamcs::provider::NAMESPACE;
use lib_yamcs::YamcsPlugin;
use project_tests::fake_yamcs::{FakeParameter, FakeYamcs};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn identifier(key: &str) -> TelemetryIdentifier {
    TelemetryIdentifier::new(NAMESPACE, key)
}

fn recorder() -> (
    Arc<dyn Fn(TelemetryPoint) + Send + Sync>,
    mpsc::UnboundedReceiver<TelemetryPoint>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Arc::new(move |point| {
            let _ = tx.send(point);
        }),
        rx,
    )
}

async fn recv_point(rx: &mut mpsc::UnboundedReceiver<TelemetryPoint>) -> TelemetryPoint {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a telemetry point")
        .expect("point channel closed")
}

async fn assert_no_more_controls(server: &mut FakeYamcs) {
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        server.inbound_rx.try_recv().is_err(),
        "unexpected extra control frame"
    );
}

#[tokio::test]
async fn subscribe_then_dispose_sends_one_subscribe_then_one_unsubscribe() {
    let mut server = FakeYamcs::spawn(vec![FakeParameter::new("Alpha", "float")]).await;
    let plugin = YamcsPlugin::new(&server.config()).unwrap();
    server.wait_connected().await;

    let (callback, _rx) = recorder();
    let subscription = plugin
        .live
        .subscribe(&identifier("Alpha"), callback)
        .await
        .unwrap();

    let frame = server.next_control().await;
    assert_eq!(frame[3]["parameter"], "subscribe");
    assert_eq!(frame[3]["data"]["list"][0]["name"], "/YSS/SIMULATOR/Alpha");

    subscription.cancel();
    let frame = server.next_control().await;
    assert_eq!(frame[3]["parameter"], "unsubscribe");
    assert_eq!(frame[3]["data"]["list"][0]["name"], "/YSS/SIMULATOR/Alpha");

    assert_no_more_controls(&mut server).await;
    plugin.shutdown();
}

#[tokio::test]
async fn both_listeners_receive_frames_until_each_is_removed() {
    let mut server = FakeYamcs::spawn(vec![FakeParameter::new("Alpha", "float")]).await;
    let plugin = YamcsPlugin::new(&server.config()).unwrap();
    server.wait_connected().await;

    let (cb1, mut rx1) = recorder();
    let (cb2, mut rx2) = recorder();
    let sub1 = plugin.live.subscribe(&identifier("Alpha"), cb1).await.unwrap();
    let _sub2 = plugin.live.subscribe(&identifier("Alpha"), cb2).await.unwrap();

    // One interest transition, one subscribe frame.
    let frame = server.next_control().await;
    assert_eq!(frame[3]["parameter"], "subscribe");
    assert_no_more_controls(&mut server).await;

    server.push(
        r#"[1,4,100,{"data":{"parameter":[{"id":{"name":"Alpha"},
            "engValue":{"type":"FLOAT","floatValue":3.5}}]}}]"#,
    );
    assert_eq!(recv_point(&mut rx1).await.value, Some(TelemetryValue::Float(3.5)));
    assert_eq!(recv_point(&mut rx2).await.value, Some(TelemetryValue::Float(3.5)));

    // Removing one listener leaves the other receiving and sends nothing.
    sub1.cancel();
    assert_no_more_controls(&mut server).await;
    server.push(
        r#"[1,4,101,{"data":{"parameter":[{"id":{"name":"Alpha"},
            "engValue":{"type":"FLOAT","floatValue":3.6}}]}}]"#,
    );
    assert_eq!(recv_point(&mut rx2).await.value, Some(TelemetryValue::Float(3.6)));
    assert!(rx1.try_recv().is_err());

    plugin.shutdown();
}

#[tokio::test]
async fn malformed_frames_do_not_break_the_feed() {
    let mut server = FakeYamcs::spawn(vec![FakeParameter::new("Alpha", "float")]).await;
    let plugin = YamcsPlugin::new(&server.config()).unwrap();
    server.wait_connected().await;

    let (callback, mut rx) = recorder();
    let _sub = plugin.live.subscribe(&identifier("Alpha"), callback).await.unwrap();
    server.next_control().await;

    server.push("this is not json");
    server.push(r#"{"an":"object, not an array"}"#);
    server.push(
        r#"[1,4,102,{"data":{"parameter":[{"id":{"name":"Alpha"},
            "engValue":{"type":"FLOAT","floatValue":1.25}}]}}]"#,
    );

    // Only the valid frame is delivered.
    let point = recv_point(&mut rx).await;
    assert_eq!(point.value, Some(TelemetryValue::Float(1.25)));
    assert!(rx.try_recv().is_err());

    plugin.shutdown();
}

#[tokio::test]
async fn commands_queued_during_an_outage_collapse_into_the_repair_pass() {
    let mut server = FakeYamcs::spawn(vec![
        FakeParameter::new("Alpha", "float"),
        FakeParameter::new("Mode", "enumeration"),
    ])
    .await;
    let plugin = YamcsPlugin::new(&server.config()).unwrap();
    server.wait_connected().await;

    let (cb1, _rx1) = recorder();
    let sub_alpha = plugin.live.subscribe(&identifier("Alpha"), cb1).await.unwrap();
    let frame = server.next_control().await;
    assert_eq!(frame[3]["parameter"], "subscribe");

    server.drop_connections();

    // While the connection is down the interest set changes entirely.
    sub_alpha.cancel();
    let (cb2, mut rx2) = recorder();
    let _sub_mode = plugin.live.subscribe(&identifier("Mode"), cb2).await.unwrap();

    server.wait_connected().await;

    // The new connection is built from the registry alone: one subscribe
    // for Mode, nothing for the cancelled Alpha.
    let frame = server.next_control().await;
    assert_eq!(frame[3]["parameter"], "subscribe");
    assert_eq!(frame[3]["data"]["list"][0]["name"], "/YSS/SIMULATOR/Mode");
    assert_no_more_controls(&mut server).await;

    server.push(
        r#"[1,4,104,{"data":{"parameter":[{"id":{"name":"Mode"},
            "engValue":{"type":"STRING","stringValue":"SAFE"}}]}}]"#,
    );
    assert_eq!(
        recv_point(&mut rx2).await.value,
        Some(TelemetryValue::Text("SAFE".to_string()))
    );

    plugin.shutdown();
}

#[tokio::test]
async fn reconnect_reissues_subscribes_for_registered_names() {
    let mut server = FakeYamcs::spawn(vec![
        FakeParameter::new("Alpha", "float"),
        FakeParameter::new("Mode", "enumeration"),
    ])
    .await;
    let plugin = YamcsPlugin::new(&server.config()).unwrap();
    server.wait_connected().await;

    let (cb1, mut rx1) = recorder();
    let (cb2, _rx2) = recorder();
    let _sub1 = plugin.live.subscribe(&identifier("Alpha"), cb1).await.unwrap();
    let _sub2 = plugin.live.subscribe(&identifier("Mode"), cb2).await.unwrap();
    server.next_control().await;
    server.next_control().await;

    server.drop_connections();
    server.wait_connected().await;

    // The repair path re-subscribes every name still in the registry.
    let mut names = vec![
        server.next_control().await[3]["data"]["list"][0]["name"].clone(),
        server.next_control().await[3]["data"]["list"][0]["name"].clone(),
    ];
    names.sort_by_key(|n| n.to_string());
    assert_eq!(names[0], "/YSS/SIMULATOR/Alpha");
    assert_eq!(names[1], "/YSS/SIMULATOR/Mode");

    // And the feed is live again.
    server.push(
        r#"[1,4,103,{"data":{"parameter":[{"id":{"name":"Alpha"},
            "engValue":{"type":"FLOAT","floatValue":9.0}}]}}]"#,
    );
    assert_eq!(recv_point(&mut rx1).await.value, Some(TelemetryValue::Float(9.0)));

    plugin.shutdown();
}
