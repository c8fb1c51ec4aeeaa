//! Heartbeat POSTs against a local HTTP endpoint

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::sync::mpsc;

use interpose_runtime::{Heartbeat, HeartbeatConfig, HeartbeatHandle, HeartbeatPayload};

async fn serve(status: StatusCode) -> (SocketAddr, mpsc::UnboundedReceiver<Value>) {
    serve_slowly(status, Duration::ZERO).await
}

/// Records each body on arrival, then answers after `delay`
async fn serve_slowly(status: StatusCode, delay: Duration) -> (SocketAddr, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route(
        "/heartbeat",
        post(move |Json(body): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(body);
                tokio::time::sleep(delay).await;
                status
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, rx)
}

fn config(url: String) -> HeartbeatConfig {
    HeartbeatConfig {
        enabled: true,
        interval: Duration::from_millis(50),
        initial_delay: Duration::ZERO,
        url: Some(url),
        ..HeartbeatConfig::default()
    }
}

async fn stop(handle: HeartbeatHandle) {
    tokio::task::spawn_blocking(move || handle.stop()).await.unwrap();
}

async fn wait_for(handle: &HeartbeatHandle, done: impl Fn(&HeartbeatHandle) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(handle) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn posts_json_payload() {
    let (addr, mut rx) = serve(StatusCode::OK).await;
    let handle = Heartbeat::start(config(format!("http://{}/heartbeat", addr))).unwrap();

    let body = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let payload: HeartbeatPayload = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(payload.agent, "bytebuddy_agent");
    assert!(payload.timestamp > 0);
    assert!(body.get("runtimeVersion").is_some());

    wait_for(&handle, |h| h.stats().delivered() >= 1).await;
    assert_eq!(handle.stats().failed(), 0);
    stop(handle).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_status_is_counted_and_beating_continues() {
    let (addr, _rx) = serve(StatusCode::INTERNAL_SERVER_ERROR).await;
    let handle = Heartbeat::start(config(format!("http://{}/heartbeat", addr))).unwrap();

    wait_for(&handle, |h| h.stats().failed() >= 2).await;
    assert_eq!(handle.stats().delivered(), 0);
    assert!(handle.is_running());
    stop(handle).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_endpoint_is_tolerated() {
    // reserve a port, then close it
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let handle = Heartbeat::start(config(format!("http://{}/heartbeat", addr))).unwrap();

    wait_for(&handle, |h| h.stats().failed() >= 1).await;
    assert!(handle.is_running());
    stop(handle).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_prevents_further_posts() {
    let (addr, mut rx) = serve(StatusCode::OK).await;
    let handle = Heartbeat::start(config(format!("http://{}/heartbeat", addr))).unwrap();
    wait_for(&handle, |h| h.stats().delivered() >= 1).await;
    stop(handle).await;

    // drain what was sent before the stop
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_during_beat_wins_over_due_tick() {
    let (addr, mut rx) = serve_slowly(StatusCode::OK, Duration::from_millis(200)).await;
    let handle = Heartbeat::start(HeartbeatConfig {
        interval: Duration::from_millis(5),
        ..config(format!("http://{}/heartbeat", addr))
    })
    .unwrap();

    // the first beat is in flight and the next tick falls due while it waits
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    stop(handle).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
}
