//! # Store → Hub → Viewer Flows
//!
//! Drives the whole pipeline without a socket:
//!
//! 1. **Events → store**: `ServerState::apply_event` inserts and publishes
//! 2. **Hub → handlers**: triggers land in each viewer's queue
//! 3. **Handlers → frames**: diffs against the viewer's cursor come out as
//!    wire frames on the outbound channel

#[cfg(test)]
mod tests {
    use super::super::{block, fast_sync, key, server};
    use bytes::Bytes;
    use cw_01_window_store::StatusCursor;
    use cw_02_diff_sync::{decode_diff, encode_status, ClientState, DiffFrame, StatusMessage};
    use cw_03_viewer_gateway::ServerState;
    use shared_bus::TriggerSink;
    use shared_types::{Index, Topic, ZERO_HASH};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    struct Viewer {
        id: u64,
        client: Arc<ClientState>,
        frames: mpsc::Receiver<Bytes>,
        loops: Vec<JoinHandle<()>>,
    }

    fn connect(server: &ServerState) -> Viewer {
        let (tx, frames) = mpsc::channel(64);
        let client = Arc::new(server.new_client_state(tx));
        let id = server
            .hub()
            .register(Arc::clone(&client) as Arc<dyn TriggerSink>);
        let loops = client.handle_events();
        Viewer {
            id,
            client,
            frames,
            loops,
        }
    }

    fn status(start: Index, counts: Vec<u32>) -> Bytes {
        encode_status(&StatusMessage {
            topic: Topic::BLOCKS,
            start,
            counts,
        })
    }

    async fn collect(frames: &mut mpsc::Receiver<Bytes>, n: usize) -> Vec<DiffFrame> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let frame = timeout(Duration::from_secs(5), frames.recv())
                .await
                .expect("frame in time")
                .expect("channel open");
            out.push(decode_diff(&frame).unwrap());
        }
        out.sort_by_key(|f| (f.index, f.depth));
        out
    }

    async fn assert_quiet(frames: &mut mpsc::Receiver<Bytes>) {
        let extra = timeout(Duration::from_millis(100), frames.recv()).await;
        assert!(extra.is_err(), "unexpected frame: {extra:?}");
    }

    // =========================================================================
    // STORE-LEVEL
    // =========================================================================

    #[test]
    fn test_capacity_three_window_after_gc() {
        let (server, dag) = server(3, fast_sync(4));
        assert!(server.apply_event(block(0, 0xA, None)));
        assert!(server.apply_event(block(1, 0xB, None)));
        assert!(server.apply_event(block(2, 0xC, None)));
        assert!(server.apply_event(block(3, 0xD, Some(0xC))));

        let report = dag.gc();
        assert_eq!(report.evicted_layers, 1);
        assert!(dag.get_node(&key(0xA)).is_none());

        let mut cursor = StatusCursor::new(4);
        let atoms = dag.get_status_update(&mut cursor, 0, 4);
        let indices: Vec<Index> = atoms.iter().map(|a| a.index()).collect();
        assert_eq!(indices, vec![1, 2, 3]);

        let d = dag.get_node(&key(0xD)).unwrap();
        assert_eq!(d.parent().unwrap().key(), &key(0xC));
    }

    #[test]
    fn test_stale_event_is_not_published() {
        let (server, _dag) = server(2, fast_sync(2));
        assert!(server.apply_event(block(5, 1, None)));
        assert!(!server.apply_event(block(1, 2, None)));
        assert_eq!(server.hub().stats().published, 1);
        assert_eq!(server.stats().inserted, 1);
    }

    // =========================================================================
    // PIPELINE
    // =========================================================================

    #[tokio::test]
    async fn test_events_reach_viewer_as_frames() {
        let (server, _dag) = server(8, fast_sync(8));
        let mut viewer = connect(&server);
        assert_eq!(
            viewer.client.on_message(&status(0, vec![0; 8])).unwrap(),
            Topic::BLOCKS
        );

        server.apply_event(block(0, 1, None));
        server.apply_event(block(1, 2, Some(1)));
        server.apply_event(block(1, 3, Some(1)));
        server.apply_event(block(2, 4, Some(3)));

        let frames = collect(&mut viewer.frames, 4).await;
        let positions: Vec<(Index, u32)> = frames.iter().map(|f| (f.index, f.depth)).collect();
        assert_eq!(positions, vec![(0, 0), (1, 0), (1, 1), (2, 0)]);
        assert_eq!(frames[0].parent_key, ZERO_HASH);
        assert_eq!(frames[2].key, key(3));
        assert_eq!(frames[3].parent_key, key(3));
        assert_eq!(&frames[3].payload[..], &[4]);
        assert!(frames.iter().all(|f| f.topic == Topic::BLOCKS));
        assert_quiet(&mut viewer.frames).await;

        assert_eq!(viewer.client.counters().frames, 4);
    }

    #[tokio::test]
    async fn test_viewer_status_skips_known_nodes() {
        let (server, _dag) = server(8, fast_sync(4));
        server.apply_event(block(0, 1, None));
        server.apply_event(block(0, 2, None));
        server.apply_event(block(1, 3, Some(1)));

        let mut viewer = connect(&server);
        // already holds the first node of index 0
        viewer.client.on_message(&status(0, vec![1, 0, 0, 0])).unwrap();

        let frames = collect(&mut viewer.frames, 2).await;
        assert_eq!(frames[0].key, key(2));
        assert_eq!(frames[0].depth, 1);
        assert_eq!(frames[1].key, key(3));
        assert_quiet(&mut viewer.frames).await;
    }

    #[tokio::test]
    async fn test_events_outside_interest_window_are_ignored() {
        let (server, _dag) = server(64, fast_sync(4));
        let mut viewer = connect(&server);
        viewer.client.on_message(&status(0, vec![0; 4])).unwrap();

        server.apply_event(block(10, 1, None));
        server.apply_event(block(11, 2, Some(1)));
        assert_quiet(&mut viewer.frames).await;

        // moving the window picks them up
        viewer.client.on_message(&status(10, vec![0; 4])).unwrap();
        let frames = collect(&mut viewer.frames, 2).await;
        assert_eq!(frames[0].index, 10);
        assert_eq!(frames[1].index, 11);
    }

    #[tokio::test]
    async fn test_first_trigger_opens_default_window() {
        let (server, _dag) = server(16, fast_sync(4));
        let mut viewer = connect(&server);

        server.apply_event(block(3, 1, None));
        server.apply_event(block(4, 2, Some(1)));
        let frames = collect(&mut viewer.frames, 2).await;
        assert_eq!(frames[0].index, 3);
        assert_eq!(frames[1].index, 4);

        let request = viewer.client.handler(Topic::BLOCKS).unwrap().last_request();
        assert_eq!(request.map(|r| (r.start, r.end)), Some((3, 7)));
    }

    #[tokio::test]
    async fn test_every_viewer_receives_frames() {
        let (server, _dag) = server(8, fast_sync(8));
        let mut a = connect(&server);
        let mut b = connect(&server);
        a.client.on_message(&status(0, vec![0; 8])).unwrap();
        b.client.on_message(&status(0, vec![0; 8])).unwrap();

        server.apply_event(block(0, 1, None));
        server.apply_event(block(1, 2, Some(1)));

        assert_eq!(collect(&mut a.frames, 2).await.len(), 2);
        assert_eq!(collect(&mut b.frames, 2).await.len(), 2);
        assert_eq!(server.hub().stats().delivered, 4);
    }

    #[tokio::test]
    async fn test_unregister_ends_viewer_loops() {
        let (server, _dag) = server(8, fast_sync(8));
        let viewer = connect(&server);
        assert_eq!(server.hub().viewer_count(), 1);

        assert!(server.hub().unregister(viewer.id));
        for task in viewer.loops {
            timeout(Duration::from_secs(5), task)
                .await
                .expect("loop stops")
                .unwrap();
        }
        assert_eq!(server.hub().viewer_count(), 0);
    }

    #[tokio::test]
    async fn test_event_pipe_feeds_viewers() {
        let (server, dag) = server(8, fast_sync(8));
        let mut viewer = connect(&server);
        viewer.client.on_message(&status(0, vec![0; 8])).unwrap();

        let pipe = tokio::spawn(Arc::clone(&server).pipe_events());
        let events = server.event_sender().unwrap();
        for (i, tag) in [(0, 1u8), (1, 2), (2, 3)] {
            events.send(block(i, tag, None)).await.unwrap();
        }

        let frames = collect(&mut viewer.frames, 3).await;
        assert_eq!(frames.len(), 3);

        drop(events);
        server.close_events();
        timeout(Duration::from_secs(5), pipe)
            .await
            .expect("pipe stops")
            .unwrap();
        assert_eq!(dag.max_index(), 2);
        assert_eq!(server.stats().inserted, 3);
    }
}
