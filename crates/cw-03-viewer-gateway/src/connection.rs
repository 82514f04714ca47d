//! Per-connection read and write pumps.
//!
//! The read pump is the only reader of a socket and the write pump its only
//! writer. A connection ends when either pump stops; the viewer is then
//! unregistered, which winds down its diff loops and, once their frame
//! senders are gone, the write pump.

use crate::domain::GatewayConfig;
use crate::server_state::ServerState;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use cw_02_diff_sync::{peek_topic, ClientState};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use shared_bus::{TriggerSink, ViewerId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info, warn};

pub async fn serve_socket(state: Arc<ServerState>, config: Arc<GatewayConfig>, socket: WebSocket) {
    let (out_tx, out_rx) = mpsc::channel(state.sync_config().outbound_queue_capacity);
    let client = Arc::new(state.new_client_state(out_tx));
    let viewer_id = state
        .hub()
        .register(Arc::clone(&client) as Arc<dyn TriggerSink>);
    let loops = client.handle_events();

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_pump(
        sink,
        out_rx,
        Arc::clone(&config),
        Arc::clone(&state),
        viewer_id,
    ));

    let writer_done = tokio::select! {
        _ = read_pump(stream, &client, &config, viewer_id) => false,
        _ = &mut writer => true,
    };

    state.hub().unregister(viewer_id);
    for task in loops {
        if let Err(e) = task.await {
            warn!(viewer_id, error = %e, "Viewer loop ended abnormally");
        }
    }
    // last frame senders go with the client
    drop(client);
    if !writer_done {
        if let Err(e) = writer.await {
            warn!(viewer_id, error = %e, "Write pump ended abnormally");
        }
    }
    info!(viewer_id, "Connection closed");
}

async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    client: &ClientState,
    config: &GatewayConfig,
    viewer_id: ViewerId,
) {
    loop {
        let next = match timeout(config.pong_wait, stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                info!(viewer_id, "Viewer went quiet, closing");
                return;
            }
        };
        match next {
            Some(Ok(Message::Binary(frame))) => handle_frame(client, &frame, viewer_id),
            Some(Ok(Message::Text(text))) => handle_frame(client, text.as_bytes(), viewer_id),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => {
                debug!(viewer_id, "Viewer closed the connection");
                return;
            }
            Some(Err(e)) => {
                debug!(viewer_id, error = %e, "Read failed");
                return;
            }
        }
    }
}

fn handle_frame(client: &ClientState, frame: &[u8], viewer_id: ViewerId) {
    if let Err(e) = client.on_message(frame) {
        debug!(
            viewer_id,
            topic = ?peek_topic(frame),
            len = frame.len(),
            error = %e,
            "Dropped status frame"
        );
    }
}

async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Bytes>,
    config: Arc<GatewayConfig>,
    state: Arc<ServerState>,
    viewer_id: ViewerId,
) {
    let mut ping = interval_at(Instant::now() + config.ping_period, config.ping_period);
    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    let _ = timed_write(viewer_id, config.write_wait, sink.send(Message::Close(None))).await;
                    return;
                };
                // everything already queued goes out with this write
                let mut batch = vec![frame];
                while let Ok(more) = outbound.try_recv() {
                    batch.push(more);
                }
                let n = batch.len() as u64;
                let write = async {
                    for frame in batch {
                        sink.feed(Message::Binary(frame.to_vec())).await?;
                    }
                    sink.flush().await
                };
                if !timed_write(viewer_id, config.write_wait, write).await {
                    return;
                }
                state.record_frames(n);
            }
            _ = ping.tick() => {
                if !timed_write(viewer_id, config.write_wait, sink.send(Message::Ping(Vec::new()))).await {
                    return;
                }
            }
        }
    }
}

async fn timed_write<F>(viewer_id: ViewerId, wait: Duration, write: F) -> bool
where
    F: Future<Output = Result<(), axum::Error>>,
{
    match timeout(wait, write).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(viewer_id, error = %e, "Write failed");
            false
        }
        Err(_) => {
            debug!(viewer_id, "Write timed out");
            false
        }
    }
}
