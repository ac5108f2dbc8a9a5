//! In-process transport that plays the meeting server's part

use crate::transport::{next_snapshot, StateFeed, SyncTransport};
use crate::{decode_state, Outbound, Result};
use cuebar_core::LogicalClock;
use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Number of sent frames kept for [`LoopbackTransport::sent`]
pub const SENT_LOG_CAPACITY: usize = 256;

/// Reflects every `update_state` back as a `sync_update`, the way the
/// server echoes the controller's clock to the room.
#[derive(Debug)]
pub struct LoopbackTransport {
    feed: StateFeed,
    sent: Mutex<VecDeque<Outbound>>,
}

impl LoopbackTransport {
    /// Creates the transport and its inbound clock stream
    pub fn new() -> (Self, mpsc::Receiver<LogicalClock>) {
        let (feed, clocks) = StateFeed::new();
        let transport = Self {
            feed,
            sent: Mutex::new(VecDeque::with_capacity(SENT_LOG_CAPACITY)),
        };
        (transport, clocks)
    }

    /// Feeds a raw server frame through the same decoding path as the socket
    pub async fn inject(&self, frame: &str) {
        if let Some(clock) = decode_state(frame) {
            self.feed.deliver(clock);
        }
    }

    /// The last [`SENT_LOG_CAPACITY`] frames sent, oldest first
    pub async fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().await.iter().cloned().collect()
    }
}

impl SyncTransport for LoopbackTransport {
    async fn send(&self, message: Outbound) -> Result<()> {
        debug!("loopback send {:?}", message);
        {
            let mut sent = self.sent.lock().await;
            if sent.len() == SENT_LOG_CAPACITY {
                sent.pop_front();
            }
            sent.push_back(message.clone());
        }

        if let Outbound::UpdateState {
            stopped,
            current_time,
            speed,
            ending_id,
        } = message
        {
            let clock = LogicalClock {
                current_time,
                stopped,
                ending_id,
                speed,
            };
            self.feed.deliver(clock);
        }
        Ok(())
    }

    async fn request_snapshot(&self, timeout: Duration) -> Result<LogicalClock> {
        next_snapshot(self.feed.latest(), timeout).await
    }
}
