//! Integration tests for the reconnecting WebSocket channel.
//!
//! These tests spin up a real WebSocket server on a random local port and
//! let the channel dial it, so frames and disconnects travel over an actual
//! socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use razchess_transport::{
        ChannelConfig, ChannelEvent, ChannelStatus, ConnectionState, Generation,
        RoomId, TransportChannel, TransportError, WebSocketConnector,
    };
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::handshake::server::{
        ErrorResponse, Request, Response,
    };

    type ServerWs = WebSocketStream<TcpStream>;

    /// Accepts one WebSocket client and returns it with the requested path.
    async fn accept_one(listener: &TcpListener) -> (ServerWs, String) {
        let (stream, _) = listener.accept().await.expect("should accept");
        let mut path = String::new();
        let ws = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                path = req.uri().path().to_string();
                Ok(resp)
            },
        )
        .await
        .expect("handshake should succeed");
        (ws, path)
    }

    fn fast_reconnect() -> ChannelConfig {
        ChannelConfig {
            reconnect_delay: Duration::from_millis(30),
        }
    }

    async fn next_event(events: &mut UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for channel event")
            .expect("event stream ended")
    }

    /// Skips events until a status with the given state shows up.
    async fn wait_for_state(
        events: &mut UnboundedReceiver<ChannelEvent>,
        state: ConnectionState,
    ) -> ChannelStatus {
        loop {
            if let ChannelEvent::Status(status) = next_event(events).await {
                if status.state == state {
                    return status;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_channel_dials_room_path_and_exchanges_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut ws, path) = accept_one(&listener).await;
            let msg = ws.next().await.unwrap().unwrap();
            let reply = format!("echo:{}", msg.to_text().unwrap());
            ws.send(Message::Text(reply.into())).await.unwrap();
            (path, ws)
        });

        let (channel, mut events) = TransportChannel::spawn(
            WebSocketConnector::new(format!("ws://{addr}")),
            RoomId::new("room-1"),
            ChannelConfig::default(),
        );

        let first = next_event(&mut events).await;
        assert_eq!(
            first,
            ChannelEvent::Status(ChannelStatus {
                state: ConnectionState::Connecting,
                generation: None,
            })
        );

        let open = wait_for_state(&mut events, ConnectionState::Open).await;
        assert_eq!(open.generation, Some(Generation::FIRST));
        assert_eq!(channel.status().open_generation(), Some(Generation::FIRST));

        channel.send(Generation::FIRST, "ping".into()).unwrap();

        let frame = next_event(&mut events).await;
        assert_eq!(
            frame,
            ChannelEvent::Frame {
                generation: Generation::FIRST,
                text: "echo:ping".into(),
            }
        );

        let (path, _ws) = server.await.unwrap();
        assert_eq!(path, "/ws/room-1");

        channel.close().await;
    }

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut ws, _) = accept_one(&listener).await;
            for text in ["a", "b", "c"] {
                ws.send(Message::Text(text.into())).await.unwrap();
            }
            ws
        });

        let (channel, mut events) = TransportChannel::spawn(
            WebSocketConnector::new(format!("ws://{addr}")),
            RoomId::new("ordered"),
            ChannelConfig::default(),
        );
        wait_for_state(&mut events, ConnectionState::Open).await;

        let mut received = Vec::new();
        while received.len() < 3 {
            if let ChannelEvent::Frame { generation, text } = next_event(&mut events).await {
                assert_eq!(generation, Generation::FIRST);
                received.push(text);
            }
        }
        assert_eq!(received, ["a", "b", "c"]);

        let _ws = server.await.unwrap();
        channel.close().await;
    }

    #[tokio::test]
    async fn test_reconnect_bumps_generation_and_drops_stale_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            // First connection is dropped straight away.
            let (first, _) = accept_one(&listener).await;
            drop(first);

            let (mut second, path) = accept_one(&listener).await;
            let msg = second.next().await.unwrap().unwrap();
            (msg.to_text().unwrap().to_string(), path, second)
        });

        let (channel, mut events) = TransportChannel::spawn(
            WebSocketConnector::new(format!("ws://{addr}")),
            RoomId::new("flaky"),
            fast_reconnect(),
        );

        let open = wait_for_state(&mut events, ConnectionState::Open).await;
        assert_eq!(open.generation, Some(Generation::FIRST));

        // Collect every status up to the second Open.
        let mut states = Vec::new();
        let reopened = loop {
            if let ChannelEvent::Status(status) = next_event(&mut events).await {
                states.push(status.state);
                if status.state == ConnectionState::Open {
                    break status;
                }
                if status.state == ConnectionState::Disconnected {
                    assert_eq!(status.generation, Some(Generation::FIRST));
                }
            }
        };
        assert_eq!(
            states,
            [
                ConnectionState::Disconnected,
                ConnectionState::Reconnecting,
                ConnectionState::Connecting,
                ConnectionState::Open,
            ]
        );
        assert_eq!(reopened.generation, Some(Generation::new(2)));

        channel.send(Generation::FIRST, "stale".into()).unwrap();
        channel.send(Generation::new(2), "fresh".into()).unwrap();

        let (received, path, _ws) = server.await.unwrap();
        assert_eq!(received, "fresh");
        assert_eq!(path, "/ws/flaky");

        channel.close().await;
    }

    #[tokio::test]
    async fn test_failed_dials_retry_without_limit() {
        // Grab a free port, then stop listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (channel, mut events) = TransportChannel::spawn(
            WebSocketConnector::new(format!("ws://{addr}")),
            RoomId::new("nobody-home"),
            fast_reconnect(),
        );

        let mut cycles = 0;
        while cycles < 3 {
            let status = wait_for_state(&mut events, ConnectionState::Disconnected).await;
            assert_eq!(status.generation, None, "no connection ever opened");
            let next = wait_for_state(&mut events, ConnectionState::Reconnecting).await;
            assert_eq!(next.generation, None);
            cycles += 1;
        }

        channel.close().await;
    }

    #[tokio::test]
    async fn test_close_emits_final_disconnect_and_rejects_sends() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut ws, _) = accept_one(&listener).await;
            // Drain until the client goes away.
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (channel, mut events) = TransportChannel::spawn(
            WebSocketConnector::new(format!("ws://{addr}")),
            RoomId::new("closing"),
            ChannelConfig::default(),
        );
        wait_for_state(&mut events, ConnectionState::Open).await;

        let sender = channel.frame_sender();
        channel.close().await;

        let mut last = None;
        while let Some(event) = events.recv().await {
            if let ChannelEvent::Status(status) = event {
                last = Some(status);
            }
        }
        let last = last.expect("should see a final status");
        assert_eq!(last.state, ConnectionState::Disconnected);
        assert_eq!(last.generation, Some(Generation::FIRST));

        let err = sender.send(Generation::FIRST, "late".into()).unwrap_err();
        assert!(matches!(err, TransportError::Shutdown));

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should see the close")
            .unwrap();
    }
}
