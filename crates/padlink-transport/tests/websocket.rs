//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and drive it with a `tokio-tungstenite`
//! client to verify that frames, close codes, and the Origin allow-list
//! actually behave over the network.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

use padlink_protocol::CloseCode;
use padlink_transport::{Frame, WsListener, WsReader, WsSender};

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn bind(origins: Vec<String>) -> (WsListener, String) {
    let listener = WsListener::bind("127.0.0.1:0", origins)
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have addr").to_string();
    (listener, addr)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("client should connect");
    ws
}

/// Accepts one connection in the background while a client dials in.
async fn accept_one(
    listener: WsListener,
    addr: &str,
) -> (WsReader, WsSender, String, ClientWs) {
    let server = tokio::spawn(async move {
        listener.accept().await.expect("should accept")
    });
    let client = connect(addr).await;
    let (reader, sender, remote) = server.await.expect("accept task");
    (reader, sender, remote, client)
}

#[tokio::test]
async fn test_accept_reports_peer_ip() {
    let (listener, addr) = bind(vec![]).await;
    let (_reader, _sender, remote, _client) = accept_one(listener, &addr).await;
    assert_eq!(remote, "127.0.0.1");
}

#[tokio::test]
async fn test_text_frames_flow_both_ways() {
    let (listener, addr) = bind(vec![]).await;
    let (mut reader, sender, _remote, mut client) =
        accept_one(listener, &addr).await;

    client
        .send(Message::Text("from client".into()))
        .await
        .expect("client send");
    match reader.next_frame().await.expect("recv") {
        Some(Frame::Text(data)) => assert_eq!(&data[..], b"from client"),
        other => panic!("expected text frame, got {other:?}"),
    }

    sender
        .send_text(Bytes::from_static(b"from server"))
        .await
        .expect("server send");
    let msg = client.next().await.unwrap().expect("client recv");
    assert_eq!(msg, Message::Text("from server".into()));
}

#[tokio::test]
async fn test_binary_frame_surfaces_as_binary() {
    // Binary frames must be distinguishable: the hub closes on them with
    // 1003 instead of treating them as payloads.
    let (listener, addr) = bind(vec![]).await;
    let (mut reader, _sender, _remote, mut client) =
        accept_one(listener, &addr).await;

    client
        .send(Message::Binary(vec![1u8, 2, 3].into()))
        .await
        .expect("client send");
    match reader.next_frame().await.expect("recv") {
        Some(Frame::Binary(data)) => assert_eq!(&data[..], &[1, 2, 3]),
        other => panic!("expected binary frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reader_returns_none_on_client_close() {
    let (listener, addr) = bind(vec![]).await;
    let (mut reader, _sender, _remote, mut client) =
        accept_one(listener, &addr).await;

    client.send(Message::Close(None)).await.expect("close");

    let frame = reader.next_frame().await.expect("recv should not error");
    assert!(frame.is_none(), "clean close should read as None");
}

#[tokio::test]
async fn test_close_carries_code_and_reason_to_peer() {
    let (listener, addr) = bind(vec![]).await;
    let (_reader, sender, _remote, mut client) =
        accept_one(listener, &addr).await;

    sender.close(CloseCode::Policy, "controller replaced").await;

    let msg = client.next().await.unwrap().expect("client recv");
    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 1008);
            assert_eq!(frame.reason.as_str(), "controller replaced");
        }
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_close_is_safe_to_call_twice() {
    let (listener, addr) = bind(vec![]).await;
    let (_reader, sender, _remote, _client) = accept_one(listener, &addr).await;

    sender.close(CloseCode::Normal, "normal closure").await;
    // Second close hits an already-closing socket; must not panic.
    sender.close(CloseCode::Normal, "normal closure").await;
}

#[tokio::test]
async fn test_origin_allow_list_rejects_unlisted_origin() {
    let (listener, addr) = bind(vec!["https://pads.example".into()]).await;

    let server = tokio::spawn(async move { listener.accept().await });

    let mut request = format!("ws://{addr}")
        .into_client_request()
        .expect("request");
    request
        .headers_mut()
        .insert("Origin", "https://evil.example".parse().unwrap());

    let client = tokio_tungstenite::connect_async(request).await;
    assert!(client.is_err(), "client upgrade should be rejected");

    let accepted = server.await.expect("accept task");
    assert!(accepted.is_err(), "server should report handshake failure");
}

#[tokio::test]
async fn test_origin_allow_list_accepts_listed_origin() {
    let (listener, addr) = bind(vec!["https://pads.example".into()]).await;

    let server = tokio::spawn(async move { listener.accept().await });

    let mut request = format!("ws://{addr}")
        .into_client_request()
        .expect("request");
    request
        .headers_mut()
        .insert("Origin", "https://pads.example".parse().unwrap());

    tokio_tungstenite::connect_async(request)
        .await
        .expect("client should connect");
    server
        .await
        .expect("accept task")
        .expect("server should accept listed origin");
}

#[tokio::test]
async fn test_accept_prefers_x_forwarded_for() {
    let (listener, addr) = bind(vec![]).await;

    let server = tokio::spawn(async move { listener.accept().await });

    let mut request = format!("ws://{addr}")
        .into_client_request()
        .expect("request");
    request
        .headers_mut()
        .insert("X-Forwarded-For", "203.0.113.9, 10.0.0.1".parse().unwrap());

    let _client = tokio_tungstenite::connect_async(request)
        .await
        .expect("client should connect");
    let (_reader, _sender, remote) =
        server.await.expect("accept task").expect("should accept");
    assert_eq!(remote, "203.0.113.9");
}
