//! Async playback driver
//!
//! Two independent tasks run per driver: the sync task advances the clock on
//! a fixed interval and applies inbound clocks in delivery order, and the
//! needle task smooths the play-head once per animation frame. Both stop when
//! the driver's cancellation token fires.

use crate::{Key, MediaElement, PlaybackEvent, PlaybackSynchronizer, Result, SyncConfig, TickOutcome};
use cuebar_core::{LogicalClock, TimelineSession};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Running sync and needle tasks for one session
pub struct PlaybackDriver<M: MediaElement + 'static> {
    session: Arc<Mutex<TimelineSession>>,
    synchronizer: Arc<Mutex<PlaybackSynchronizer<M>>>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    needle: watch::Receiver<f64>,
    cancel: CancellationToken,
    sync_task: JoinHandle<()>,
    needle_task: JoinHandle<()>,
    _guard: DropGuard,
}

impl<M: MediaElement + 'static> PlaybackDriver<M> {
    /// Spawns the driver tasks on the current tokio runtime.
    ///
    /// Clocks received on `clocks` are applied one at a time in arrival order.
    /// Returns the driver and the stream of playback events.
    pub fn spawn(
        session: Arc<Mutex<TimelineSession>>,
        synchronizer: PlaybackSynchronizer<M>,
        clocks: mpsc::Receiver<LogicalClock>,
        config: SyncConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let cancel = CancellationToken::new();
        let synchronizer = Arc::new(Mutex::new(synchronizer));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (needle_tx, needle_rx) = watch::channel(0.0);

        let sync_task = tokio::spawn(run_sync_loop(
            session.clone(),
            synchronizer.clone(),
            clocks,
            event_tx.clone(),
            config,
            cancel.clone(),
        ));
        let needle_task = tokio::spawn(run_needle_loop(session.clone(), needle_tx, config, cancel.clone()));

        info!("playback driver started (tick {:?})", config.tick_interval);

        let driver = Self {
            session,
            synchronizer,
            events: event_tx,
            needle: needle_rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
            sync_task,
            needle_task,
        };
        (driver, event_rx)
    }

    /// Shared session the driver is playing
    pub fn session(&self) -> &Arc<Mutex<TimelineSession>> {
        &self.session
    }

    /// Latest smoothed needle position in pixels
    pub fn needle_position(&self) -> f64 {
        *self.needle.borrow()
    }

    /// Token that stops both tasks when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Play/pause from the controlling client; returns the clock to broadcast
    pub async fn toggle_play(&self) -> LogicalClock {
        self.control(|sync, session| sync.toggle_play(session)).await
    }

    /// Key press from the controlling client; returns a clock to broadcast if the key did anything
    pub async fn handle_key(&self, key: Key) -> Option<LogicalClock> {
        self.control(|sync, session| sync.handle_key(session, key)).await
    }

    /// Timeline click from the controlling client; returns the clock to broadcast
    pub async fn seek(&self, time: f64) -> LogicalClock {
        self.control(|sync, session| sync.seek(session, time)).await
    }

    async fn control<R, F>(&self, action: F) -> R
    where
        F: FnOnce(&mut PlaybackSynchronizer<M>, &mut TimelineSession) -> R,
    {
        let mut sync = self.synchronizer.lock().await;
        let mut session = self.session.lock().await;
        let result = action(&mut sync, &mut session);
        for event in sync.drain_events() {
            // Receiver gone means nobody is listening; the action itself still applies.
            let _ = self.events.send(event);
        }
        result
    }

    /// Stops both tasks and waits for them to finish
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.sync_task.await?;
        self.needle_task.await?;
        info!("playback driver stopped");
        Ok(())
    }
}

async fn run_sync_loop<M: MediaElement>(
    session: Arc<Mutex<TimelineSession>>,
    synchronizer: Arc<Mutex<PlaybackSynchronizer<M>>>,
    mut clocks: mpsc::Receiver<LogicalClock>,
    events: mpsc::UnboundedSender<PlaybackEvent>,
    config: SyncConfig,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();
    let mut clocks_open = true;
    let mut listening = true;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = clocks.recv(), if clocks_open => match received {
                Some(clock) => {
                    let mut sync = synchronizer.lock().await;
                    let mut session = session.lock().await;
                    sync.apply_clock(&mut session, clock)
                }
                None => {
                    debug!("clock channel closed, continuing on local ticks");
                    clocks_open = false;
                    continue;
                }
            },
            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;
                let mut sync = synchronizer.lock().await;
                let mut session = session.lock().await;
                sync.tick(&mut session, elapsed)
            }
        };

        if listening && !publish(&events, outcome) {
            warn!("event receiver dropped, playback continues without events");
            listening = false;
        }
    }
}

/// Sends the outcome's events; false once the receiver is gone
fn publish(events: &mpsc::UnboundedSender<PlaybackEvent>, outcome: TickOutcome) -> bool {
    outcome.events.into_iter().all(|event| events.send(event).is_ok())
}

async fn run_needle_loop(
    session: Arc<Mutex<TimelineSession>>,
    needle: watch::Sender<f64>,
    config: SyncConfig,
    cancel: CancellationToken,
) {
    let mut frames = time::interval(config.needle_frame);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = frames.tick() => {
                let position = session.lock().await.step_needle();
                needle.send_replace(position);
            }
        }
    }
}
