//! End-to-end relay tests against a broker bound on a loopback port.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use compute_relay::api;
use compute_relay::app_state::AppState;
use compute_relay::config::RelayConfig;
use compute_relay::relay::RESET_SIGNAL;

const TOKEN: &str = "supersecretsauce";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_broker(config: RelayConfig) -> (SocketAddr, AppState) {
    let state = AppState::new(config);
    let app = Router::new()
        .merge(api::build_router())
        .with_state(state.clone());

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("failed to bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener has no local address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

fn test_config() -> RelayConfig {
    RelayConfig::new(TOKEN)
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    let reached = timeout(Duration::from_secs(5), async {
        while !cond() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "condition not reached in time");
}

async fn connect_worker(addr: SocketAddr, name: &str) -> WsStream {
    let url = format!("ws://{addr}/registerCompute/{name}/{TOKEN}");
    let Ok((ws, _)) = connect_async(url).await else {
        panic!("worker {name} failed to register");
    };
    ws
}

async fn connect_client(addr: SocketAddr) -> WsStream {
    let Ok((ws, _)) = connect_async(format!("ws://{addr}/inputStream")).await else {
        panic!("client failed to connect");
    };
    ws
}

/// Replies to every binary frame with the same bytes; forwards text
/// frames (the reset signal) to `control`.
fn spawn_echo_worker(mut ws: WsStream, control: Option<mpsc::UnboundedSender<String>>) {
    tokio::spawn(async move {
        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Binary(data) => {
                    if ws.send(Message::Binary(data)).await.is_err() {
                        break;
                    }
                }
                Message::Text(text) => {
                    if let Some(control) = &control {
                        let _ = control.send(text.as_str().to_owned());
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });
}

async fn round_trip(client: &mut WsStream, payload: &str) -> String {
    let sent = client.send(Message::text(payload)).await;
    assert!(sent.is_ok(), "client send failed");
    let Ok(Some(Ok(Message::Text(reply)))) = timeout(Duration::from_secs(5), client.next()).await
    else {
        panic!("no text reply for {payload}");
    };
    reply.as_str().to_owned()
}

/// Returns `true` once the server has closed `client`.
async fn closed_by_server(client: &mut WsStream) -> bool {
    loop {
        match timeout(Duration::from_secs(5), client.next()).await {
            Err(_) => return false,
            Ok(Some(Ok(Message::Close(_)) | Err(_)) | None) => return true,
            Ok(Some(Ok(_))) => {}
        }
    }
}

#[tokio::test]
async fn zero_workers_rejects_client_immediately() {
    let (addr, _state) = spawn_broker(test_config()).await;

    let attempt = timeout(
        Duration::from_secs(2),
        connect_async(format!("ws://{addr}/inputStream")),
    )
    .await;
    let Ok(Err(tungstenite::Error::Http(response))) = attempt else {
        panic!("expected an HTTP rejection");
    };
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn bad_token_is_rejected_without_registration() {
    let (addr, state) = spawn_broker(test_config()).await;

    let attempt = connect_async(format!("ws://{addr}/registerCompute/intruder/wrongtoken")).await;
    let Err(tungstenite::Error::Http(response)) = attempt else {
        panic!("expected an HTTP rejection");
    };
    assert_eq!(response.status().as_u16(), 401);
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn plain_get_with_bad_token_is_unauthorized() {
    let (addr, state) = spawn_broker(test_config()).await;

    let Ok(response) =
        reqwest::get(format!("http://{addr}/registerCompute/intruder/wrongtoken")).await
    else {
        panic!("request failed");
    };
    assert_eq!(response.status().as_u16(), 401);
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("expected a JSON error body");
    };
    assert_eq!(body["error"]["code"], 1001);
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn plain_get_with_good_token_is_not_registered() {
    let (addr, state) = spawn_broker(test_config()).await;

    let Ok(response) =
        reqwest::get(format!("http://{addr}/registerCompute/alpha/{TOKEN}")).await
    else {
        panic!("request failed");
    };
    assert!(response.status().is_client_error());
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn round_trip_relays_frames_in_order() {
    let (addr, state) = spawn_broker(test_config()).await;
    spawn_echo_worker(connect_worker(addr, "echo").await, None);
    wait_until(|| state.registry.len() == 1).await;

    let mut client = connect_client(addr).await;
    assert_eq!(state.registry.available(), 0);
    assert_eq!(round_trip(&mut client, "A").await, "A");
    assert_eq!(round_trip(&mut client, "B").await, "B");
}

#[tokio::test]
async fn concurrent_clients_do_not_cross_talk() {
    let (addr, state) = spawn_broker(test_config()).await;
    spawn_echo_worker(connect_worker(addr, "echo-1").await, None);
    spawn_echo_worker(connect_worker(addr, "echo-2").await, None);
    wait_until(|| state.registry.len() == 2).await;

    let first = connect_client(addr).await;
    let second = connect_client(addr).await;
    assert_eq!(state.registry.available(), 0);

    let drive = |tag: &'static str, mut ws: WsStream| async move {
        for i in 0..25 {
            let payload = format!("{tag}-{i}");
            assert_eq!(round_trip(&mut ws, &payload).await, payload);
        }
        ws
    };
    let (mut first, mut second) = tokio::join!(drive("first", first), drive("second", second));

    let _ = first.close(None).await;
    let _ = second.close(None).await;
    wait_until(|| state.registry.available() == 2).await;
}

#[tokio::test]
async fn client_disconnect_releases_worker_and_resets_it() {
    let (addr, state) = spawn_broker(test_config()).await;
    let (control_tx, mut control_rx) = mpsc::unbounded_channel();
    spawn_echo_worker(connect_worker(addr, "echo").await, Some(control_tx));
    wait_until(|| state.registry.len() == 1).await;

    let mut client = connect_client(addr).await;
    assert_eq!(round_trip(&mut client, "A").await, "A");
    let _ = client.close(None).await;

    let Ok(Some(signal)) = timeout(Duration::from_secs(5), control_rx.recv()).await else {
        panic!("worker never received the reset signal");
    };
    assert_eq!(signal, RESET_SIGNAL);
    wait_until(|| state.registry.available() == 1).await;

    let mut next = connect_client(addr).await;
    assert_eq!(round_trip(&mut next, "C").await, "C");
}

#[tokio::test]
async fn worker_failure_evicts_worker() {
    let (addr, state) = spawn_broker(test_config()).await;
    let mut worker = connect_worker(addr, "flaky").await;
    wait_until(|| state.registry.len() == 1).await;

    // Accept one request, then hang up instead of replying.
    tokio::spawn(async move {
        while let Some(Ok(msg)) = worker.next().await {
            if msg.is_binary() {
                let _ = worker.close(None).await;
                break;
            }
        }
    });

    let mut client = connect_client(addr).await;
    assert!(client.send(Message::text("A")).await.is_ok());
    assert!(closed_by_server(&mut client).await);

    wait_until(|| state.registry.is_empty()).await;
    let attempt = connect_async(format!("ws://{addr}/inputStream")).await;
    assert!(matches!(attempt, Err(tungstenite::Error::Http(_))));
}

#[tokio::test]
async fn silent_worker_is_evicted_after_reply_timeout() {
    let mut config = test_config();
    config.worker_reply_timeout = Some(Duration::from_millis(200));
    let (addr, state) = spawn_broker(config).await;

    let mut worker = connect_worker(addr, "silent").await;
    wait_until(|| state.registry.len() == 1).await;
    tokio::spawn(async move { while let Some(Ok(_)) = worker.next().await {} });

    let mut client = connect_client(addr).await;
    assert!(client.send(Message::text("A")).await.is_ok());
    assert!(closed_by_server(&mut client).await);
    wait_until(|| state.registry.is_empty()).await;
}

#[tokio::test]
async fn idle_client_is_closed_and_worker_released() {
    let mut config = test_config();
    config.client_idle_timeout = Duration::from_millis(300);
    let (addr, state) = spawn_broker(config).await;
    spawn_echo_worker(connect_worker(addr, "echo").await, None);
    wait_until(|| state.registry.len() == 1).await;

    let mut client = connect_client(addr).await;
    assert_eq!(round_trip(&mut client, "A").await, "A");

    assert!(closed_by_server(&mut client).await);
    wait_until(|| state.registry.available() == 1).await;
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn binary_client_frame_ends_session_and_releases_worker() {
    let (addr, state) = spawn_broker(test_config()).await;
    spawn_echo_worker(connect_worker(addr, "echo").await, None);
    wait_until(|| state.registry.len() == 1).await;

    let mut client = connect_client(addr).await;
    assert!(client.send(Message::binary(vec![1u8, 2, 3])).await.is_ok());
    assert!(closed_by_server(&mut client).await);
    wait_until(|| state.registry.available() == 1).await;
}

#[tokio::test]
async fn health_reports_worker_counts() {
    let (addr, state) = spawn_broker(test_config()).await;
    spawn_echo_worker(connect_worker(addr, "echo").await, None);
    wait_until(|| state.registry.len() == 1).await;

    let Ok(response) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    assert_eq!(response.status().as_u16(), 200);
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("health body is not JSON");
    };
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["workers_registered"], 1);
    assert_eq!(body["workers_available"], 1);

    let Ok(response) = reqwest::get(format!("http://{addr}/workers")).await else {
        panic!("workers request failed");
    };
    let Ok(body) = response.json::<serde_json::Value>().await else {
        panic!("workers body is not JSON");
    };
    assert_eq!(body["total"], 1);
    assert_eq!(body["workers"][0]["name"], "echo");
    assert_eq!(body["workers"][0]["state"], "available");
}
