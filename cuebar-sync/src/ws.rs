//! WebSocket client for the meeting server

use crate::transport::{next_snapshot, StateFeed, SyncTransport};
use crate::{decode_state, Error, Outbound, Result};
use cuebar_core::LogicalClock;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket URL of a meeting room on a server rooted at `base`
pub fn meeting_url(base: &str, room: &str) -> String {
    format!("{}/ws/meeting/{}/", base.trim_end_matches('/'), room)
}

/// Connected WebSocket transport.
///
/// A reader task decodes inbound frames in arrival order; a writer task owns
/// the socket sink so sends never block on the network. The reader starts on
/// connect, so a state the server pushes right away is kept for
/// `request_snapshot`.
pub struct WsTransport {
    outbound: mpsc::UnboundedSender<String>,
    feed: StateFeed,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsTransport {
    /// Connects to `url` and returns the transport with its inbound clock stream
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<LogicalClock>)> {
        let (socket, response) = connect_async(url).await?;
        info!("sync socket connected to {} ({})", url, response.status());

        let (sink, stream) = socket.split();
        let (feed, clocks) = StateFeed::new();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let reader = tokio::spawn(run_reader(stream, feed.clone(), cancel.clone()));
        let writer = tokio::spawn(run_writer(sink, outbound_rx, cancel.clone()));

        let transport = Self {
            outbound,
            feed,
            cancel,
            reader,
            writer,
        };
        Ok((transport, clocks))
    }

    /// Checks whether the socket is still up
    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Closes the socket and waits for both tasks to finish
    pub async fn close(self) -> Result<()> {
        self.cancel.cancel();
        self.writer.await?;
        self.reader.await?;
        info!("sync socket closed");
        Ok(())
    }
}

impl SyncTransport for WsTransport {
    async fn send(&self, message: Outbound) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Closed);
        }
        let text = serde_json::to_string(&message)?;
        debug!("sending {}", text);
        self.outbound.send(text).map_err(|_| Error::Closed)
    }

    async fn request_snapshot(&self, timeout: Duration) -> Result<LogicalClock> {
        if !self.is_connected() {
            return Err(Error::Closed);
        }
        next_snapshot(self.feed.latest(), timeout).await
    }
}

async fn run_reader(mut stream: SplitStream<WsStream>, feed: StateFeed, cancel: CancellationToken) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if let Some(clock) = decode_state(text.as_str()) {
                    feed.deliver(clock);
                }
            }
            Some(Ok(Message::Close(reason))) => {
                info!("sync socket closed by server: {:?}", reason);
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                error!("sync socket error: {}", err);
                break;
            }
            None => break,
        }
    }
    cancel.cancel();
}

async fn run_writer(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = outbound.recv() => match next {
                Some(text) => {
                    if let Err(err) = sink.send(Message::text(text)).await {
                        error!("failed to send sync frame: {}", err);
                        break;
                    }
                }
                None => break,
            },
        }
    }

    if let Err(err) = sink.close().await {
        debug!("sync socket close handshake failed: {}", err);
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    type ServerSocket = WebSocketStream<TcpStream>;

    /// Accepts one client on a local port and hands its socket to `handler`
    async fn serve<F, Fut>(handler: F) -> String
    where
        F: FnOnce(ServerSocket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let socket = tokio_tungstenite::accept_async(stream).await.unwrap();
            handler(socket).await;
        });
        meeting_url(&format!("ws://{}", addr), "test")
    }

    /// Keeps the server side open until the client goes away
    async fn hold_open(socket: &mut ServerSocket) {
        while let Some(Ok(_)) = socket.next().await {}
    }

    fn sync_update(time: f64) -> Message {
        Message::text(format!(
            r#"{{"type":"sync_update","state":{{"stopped":false,"current_time":{}}}}}"#,
            time
        ))
    }

    #[test]
    fn test_meeting_url() {
        assert_eq!(meeting_url("ws://localhost:8001", "abc"), "ws://localhost:8001/ws/meeting/abc/");
        assert_eq!(meeting_url("ws://host/", "r1"), "ws://host/ws/meeting/r1/");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let result = WsTransport::connect("ws://127.0.0.1:1/ws/meeting/x/").await;
        assert!(matches!(result, Err(Error::WebSocket(_))));
    }

    #[tokio::test]
    async fn test_initial_state_served_to_late_snapshot_request() {
        let url = serve(|mut socket| async move {
            let initial = r#"{"type":"initial_meeting_state","state":{"stopped":false,"current_time":42}}"#;
            socket.send(Message::text(initial)).await.unwrap();
            hold_open(&mut socket).await;
        })
        .await;

        let (transport, mut clocks) = WsTransport::connect(&url).await.unwrap();
        // The state is already in by the time anyone asks for it.
        assert_eq!(clocks.recv().await.map(|c| c.current_time), Some(42.0));

        let snapshot = transport.request_snapshot(Duration::from_secs(2)).await.unwrap();
        assert!(!snapshot.stopped);
        assert_eq!(snapshot.current_time, 42.0);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_frames_decoded_in_order_skipping_malformed() {
        let url = serve(|mut socket| async move {
            socket.send(sync_update(1.0)).await.unwrap();
            socket.send(Message::text("{oops")).await.unwrap();
            socket.send(Message::text(r#"{"type":"meeting_state_changed"}"#)).await.unwrap();
            socket.send(Message::text(r#"{"type":"chat","body":"hi"}"#)).await.unwrap();
            socket.send(sync_update(2.0)).await.unwrap();
            hold_open(&mut socket).await;
        })
        .await;

        let (transport, mut clocks) = WsTransport::connect(&url).await.unwrap();
        assert_eq!(clocks.recv().await.map(|c| c.current_time), Some(1.0));
        assert_eq!(clocks.recv().await.map(|c| c.current_time), Some(2.0));
        assert!(transport.is_connected());
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_sent_state_reaches_server() {
        let (frames_tx, frames_rx) = oneshot::channel();
        let url = serve(|mut socket| async move {
            if let Some(Ok(Message::Text(text))) = socket.next().await {
                let _ = frames_tx.send(text.as_str().to_string());
            }
            hold_open(&mut socket).await;
        })
        .await;

        let (transport, _clocks) = WsTransport::connect(&url).await.unwrap();
        transport.send_state(&LogicalClock::stopped_at(7.5)).await.unwrap();

        let frame: serde_json::Value = serde_json::from_str(&frames_rx.await.unwrap()).unwrap();
        assert_eq!(frame["type"], "update_state");
        assert_eq!(frame["stopped"], true);
        assert_eq!(frame["current_time"], 7.5);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_with_undrained_receiver() {
        let url = serve(|mut socket| async move {
            for i in 0..100 {
                socket.send(sync_update(i as f64)).await.unwrap();
            }
            hold_open(&mut socket).await;
        })
        .await;

        let (transport, _clocks) = WsTransport::connect(&url).await.unwrap();
        let last = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                let snapshot = transport.request_snapshot(Duration::from_secs(1)).await.unwrap();
                if snapshot.current_time == 99.0 {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(last.current_time, 99.0);

        tokio::time::timeout(Duration::from_secs(3), transport.close())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_after_server_hangs_up() {
        let url = serve(|socket| async move { drop(socket) }).await;

        let (transport, _clocks) = WsTransport::connect(&url).await.unwrap();
        tokio::time::timeout(Duration::from_secs(3), async {
            while transport.is_connected() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let result = transport.send_state(&LogicalClock::default()).await;
        assert!(matches!(result, Err(Error::Closed)));
        transport.close().await.unwrap();
    }
}
