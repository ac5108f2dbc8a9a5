//! Transport seam shared by the WebSocket and loopback clients

use crate::{Error, Outbound, Result};
use cuebar_core::LogicalClock;
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time;

/// Capacity of the inbound clock channel handed to the caller
pub const CLOCK_BUFFER: usize = 64;

/// Duplex channel carrying logical clocks between a client and the meeting server
pub trait SyncTransport {
    /// Sends one frame
    fn send(&self, message: Outbound) -> impl Future<Output = Result<()>> + Send;

    /// Returns the latest state received since connecting, waiting up to
    /// `timeout` for the first one if none has arrived yet
    fn request_snapshot(&self, timeout: Duration) -> impl Future<Output = Result<LogicalClock>> + Send;

    /// Broadcasts an authoritative clock
    fn send_state(&self, clock: &LogicalClock) -> impl Future<Output = Result<()>> + Send {
        self.send(Outbound::from(clock))
    }

    /// Asks the server to start the meeting on `video_url`
    fn start_meeting(&self, video_url: &str) -> impl Future<Output = Result<()>> + Send {
        self.send(Outbound::StartMeeting {
            video_url: video_url.to_string(),
        })
    }
}

/// Fan-out of decoded inbound clocks: every clock goes to the ordered caller
/// channel and replaces the latest state served to snapshot requests.
///
/// Delivery never waits on the caller. When the caller falls `CLOCK_BUFFER`
/// states behind, newer states are dropped from the channel but still become
/// the latest snapshot.
#[derive(Debug, Clone)]
pub(crate) struct StateFeed {
    clocks: mpsc::Sender<LogicalClock>,
    latest: Arc<watch::Sender<Option<LogicalClock>>>,
}

impl StateFeed {
    pub(crate) fn new() -> (Self, mpsc::Receiver<LogicalClock>) {
        let (clocks, clock_rx) = mpsc::channel(CLOCK_BUFFER);
        let (latest, _) = watch::channel(None);
        let feed = Self {
            clocks,
            latest: Arc::new(latest),
        };
        (feed, clock_rx)
    }

    pub(crate) fn deliver(&self, clock: LogicalClock) {
        self.latest.send_replace(Some(clock.clone()));
        match self.clocks.try_send(clock) {
            Ok(()) => {}
            Err(TrySendError::Full(clock)) => warn!(
                "clock receiver is {} states behind, dropping state at {}s",
                CLOCK_BUFFER, clock.current_time
            ),
            Err(TrySendError::Closed(_)) => {
                debug!("clock receiver dropped, only snapshot requests are served")
            }
        }
    }

    pub(crate) fn latest(&self) -> watch::Receiver<Option<LogicalClock>> {
        self.latest.subscribe()
    }
}

/// Returns the latest state seen by `latest`, waiting up to `timeout` for the first one
pub(crate) async fn next_snapshot(
    mut latest: watch::Receiver<Option<LogicalClock>>,
    timeout: Duration,
) -> Result<LogicalClock> {
    let wait = async {
        match latest.wait_for(Option::is_some).await {
            Ok(state) => (*state).clone().ok_or(Error::Closed),
            Err(_) => Err(Error::Closed),
        }
    };
    time::timeout(timeout, wait)
        .await
        .map_err(|_| Error::Timeout(timeout))?
}
