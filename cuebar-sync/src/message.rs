//! JSON frames exchanged with the meeting server

use cuebar_core::LogicalClock;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Frame sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Authoritative clock from the controlling client
    UpdateState {
        stopped: bool,
        current_time: f64,
        speed: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ending_id: Option<String>,
    },
    StartMeeting { video_url: String },
}

impl From<&LogicalClock> for Outbound {
    fn from(clock: &LogicalClock) -> Self {
        Outbound::UpdateState {
            stopped: clock.stopped,
            current_time: clock.current_time,
            speed: clock.speed,
            ending_id: clock.ending_id.clone(),
        }
    }
}

/// Clock state carried by inbound frames; missing fields read as a stopped clock at zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteState {
    pub stopped: bool,
    pub current_time: f64,
    pub ending_id: Option<String>,
    pub speed: f64,
}

impl Default for RemoteState {
    fn default() -> Self {
        Self {
            stopped: true,
            current_time: 0.0,
            ending_id: None,
            speed: 1.0,
        }
    }
}

impl From<RemoteState> for LogicalClock {
    fn from(state: RemoteState) -> Self {
        LogicalClock {
            current_time: state.current_time,
            stopped: state.stopped,
            ending_id: state.ending_id,
            speed: state.speed,
        }
    }
}

impl From<&LogicalClock> for RemoteState {
    fn from(clock: &LogicalClock) -> Self {
        Self {
            stopped: clock.stopped,
            current_time: clock.current_time,
            ending_id: clock.ending_id.clone(),
            speed: clock.speed,
        }
    }
}

/// Frame received from the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    SyncUpdate {
        #[serde(default)]
        state: RemoteState,
    },
    InitialMeetingState {
        #[serde(default)]
        state: RemoteState,
    },
    MeetingStateChanged,
    #[serde(other)]
    Unknown,
}

impl Inbound {
    /// Clock carried by this frame, if it is a state frame
    pub fn into_clock(self) -> Option<LogicalClock> {
        match self {
            Inbound::SyncUpdate { state } | Inbound::InitialMeetingState { state } => Some(state.into()),
            Inbound::MeetingStateChanged | Inbound::Unknown => None,
        }
    }
}

/// Decodes a text frame into a clock.
///
/// Malformed frames are logged and skipped, as are frames that carry no state.
pub fn decode_state(text: &str) -> Option<LogicalClock> {
    match serde_json::from_str::<Inbound>(text) {
        Ok(frame) => {
            let clock = frame.clone().into_clock();
            if clock.is_none() {
                debug!("ignoring frame {:?}", frame);
            }
            clock
        }
        Err(err) => {
            warn!("skipping malformed sync frame: {}", err);
            None
        }
    }
}
