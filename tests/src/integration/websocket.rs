//! # Websocket Round Trips
//!
//! Binds the real gateway on an ephemeral port and talks to it with a
//! tungstenite client, the way a browser viewer would.

#[cfg(test)]
mod tests {
    use super::super::{block, fast_sync, key, server};
    use cw_02_diff_sync::{decode_diff, encode_status, DiffFrame, StatusMessage};
    use cw_03_viewer_gateway::{GatewayConfig, ServerState, ViewerGateway};
    use futures::{SinkExt, StreamExt};
    use node_runtime::{NodeConfig, NodeRuntime};
    use shared_types::{Index, Topic};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_gateway(
        server: Arc<ServerState>,
    ) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
        let config = GatewayConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            ..GatewayConfig::default()
        };
        let gateway = ViewerGateway::bind(config, server).await.unwrap();
        let addr = gateway.local_addr();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            gateway
                .run(async move {
                    let _ = stop_rx.await;
                })
                .await
                .unwrap();
        });
        (addr, stop_tx, task)
    }

    async fn open(addr: SocketAddr) -> Socket {
        let (socket, _response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        socket
    }

    async fn send_status(socket: &mut Socket, start: Index, counts: Vec<u32>) {
        let frame = encode_status(&StatusMessage {
            topic: Topic::BLOCKS,
            start,
            counts,
        });
        socket.send(Message::Binary(frame)).await.unwrap();
    }

    async fn next_frame(socket: &mut Socket) -> DiffFrame {
        loop {
            let msg = timeout(Duration::from_secs(5), socket.next())
                .await
                .expect("frame in time")
                .expect("socket open")
                .unwrap();
            if let Message::Binary(data) = msg {
                return decode_diff(&data).unwrap();
            }
        }
    }

    async fn wait_for_viewers(server: &ServerState, n: usize) {
        timeout(Duration::from_secs(5), async {
            while server.hub().viewer_count() != n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("viewer count reached");
    }

    #[tokio::test]
    async fn test_status_then_frames_over_websocket() {
        let (server, _dag) = server(16, fast_sync(8));
        server.apply_event(block(0, 1, None));
        let (addr, stop, task) = start_gateway(Arc::clone(&server)).await;

        let mut socket = open(addr).await;
        wait_for_viewers(&server, 1).await;
        send_status(&mut socket, 0, vec![0; 8]).await;

        let first = next_frame(&mut socket).await;
        assert_eq!((first.index, first.depth), (0, 0));
        assert_eq!(first.key, key(1));

        server.apply_event(block(1, 2, Some(1)));
        server.apply_event(block(2, 3, Some(2)));
        let mut rest = vec![next_frame(&mut socket).await, next_frame(&mut socket).await];
        rest.sort_by_key(|f| f.index);
        assert_eq!(rest[0].key, key(2));
        assert_eq!(rest[0].parent_key, key(1));
        assert_eq!(rest[1].index, 2);
        assert_eq!(&rest[1].payload[..], &[3]);

        socket.close(None).await.unwrap();
        wait_for_viewers(&server, 0).await;
        assert!(server.stats().frames_sent >= 3);

        stop.send(()).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_status_keeps_connection() {
        let (server, _dag) = server(16, fast_sync(4));
        server.apply_event(block(0, 1, None));
        let (addr, stop, task) = start_gateway(Arc::clone(&server)).await;

        let mut socket = open(addr).await;
        wait_for_viewers(&server, 1).await;
        socket
            .send(Message::Binary(vec![1u8, 0, 0].into()))
            .await
            .unwrap();
        // wrong count for the configured window
        send_status(&mut socket, 0, vec![0; 3]).await;
        send_status(&mut socket, 0, vec![0; 4]).await;

        let frame = next_frame(&mut socket).await;
        assert_eq!(frame.key, key(1));
        assert_eq!(server.hub().viewer_count(), 1);

        drop(socket);
        wait_for_viewers(&server, 0).await;
        stop.send(()).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wide_window_status_fits_transport() {
        // 8 + 4 * 200 bytes, over the default 512 byte frame limit
        let (server, _dag) = server(300, fast_sync(200));
        server.apply_event(block(0, 1, None));
        let (addr, stop, task) = start_gateway(Arc::clone(&server)).await;

        let mut socket = open(addr).await;
        wait_for_viewers(&server, 1).await;
        send_status(&mut socket, 0, vec![0; 200]).await;

        let frame = next_frame(&mut socket).await;
        assert_eq!(frame.key, key(1));
        assert_eq!(server.hub().viewer_count(), 1);

        socket.close(None).await.unwrap();
        wait_for_viewers(&server, 0).await;
        stop.send(()).unwrap();
        timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_runtime_streams_mock_blocks() {
        let mut config = NodeConfig::default();
        config.network.listen_addr = "127.0.0.1:0".parse().unwrap();
        config.window.capacity = 32;
        config.source.interval = Duration::from_millis(5);
        config.sync = fast_sync(32);

        let runtime = NodeRuntime::new(config).unwrap();
        let addr = runtime.start().await.unwrap();

        // no status sent: the first trigger opens the window
        let mut socket = open(addr).await;
        let frame = next_frame(&mut socket).await;
        assert_eq!(frame.topic, Topic::BLOCKS);
        assert_eq!(&frame.payload[..], b"foobar");

        drop(socket);
        timeout(Duration::from_secs(10), runtime.shutdown())
            .await
            .expect("shutdown in time");
    }
}
