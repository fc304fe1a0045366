//! Joining a room through the builder, against a local WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use razchess::prelude::*;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[tokio::test]
async fn test_session_link_reaches_room_endpoint_and_receives_state() {
    razchess::init_tracing("razchess=debug");
    // A second call is harmless.
    razchess::init_tracing("razchess=debug");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut path = String::new();
        let mut ws = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                path = req.uri().path().to_string();
                Ok(resp)
            },
        )
        .await
        .unwrap();

        let push = json!({
            "jsonrpc": "2.0",
            "id": "p1",
            "method": "Session.Update",
            "params": [{"fen": START, "opening": "", "status": "White to move"}],
        });
        ws.send(Message::Text(push.to_string().into())).await.unwrap();

        // Wait for the client's acknowledgement.
        let ack = ws.next().await.unwrap().unwrap();
        let ack: Value = serde_json::from_str(ack.to_text().unwrap()).unwrap();
        (path, ack, ws)
    });

    let session = ClientBuilder::new()
        .session_url(format!("http://{addr}/room/lobby-7"))
        .reconnect_delay(Duration::from_millis(50))
        .connect()
        .unwrap();
    assert_eq!(session.room().as_str(), "lobby-7");
    let mut events = session.subscribe();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no update within 5s")
        .unwrap();
    let SessionEvent::Updated(transition) = event else {
        panic!("expected an update, got {event:?}");
    };
    assert_eq!(transition.current.fen, START);
    assert_eq!(transition.current.turn, Color::White);
    assert_eq!(transition.current.opening, None);
    assert_eq!(transition.sound, None);
    assert!(session.can_drag(Color::White));

    let (path, ack, _ws) = server.await.unwrap();
    assert_eq!(path, "/ws/lobby-7");
    assert_eq!(ack["id"], "p1");
    assert_eq!(ack["result"], true);

    session.close().await;
}
