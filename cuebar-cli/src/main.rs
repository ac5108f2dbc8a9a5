//! Cuebar CLI Tool
//!
//! Command-line interface for authoring question-card timelines and for
//! following or controlling synchronized playback.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use cuebar_core::{
    parse_questions, GeometryConfig, Question, SegmentId, SegmentKind, TimelineGeometry, TimelineSession,
    TimelineSnapshot,
};
use cuebar_player::{
    real_time, PlaybackDriver, PlaybackEvent, PlaybackSynchronizer, SimulatedMedia, SyncConfig,
};
use cuebar_store::{FileStore, StoreHandle, TimelineStore};
use cuebar_sync::{meeting_url, SyncTransport, WsTransport};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "cuebar")]
#[command(about = "Cuebar - question-card timelines for video meetings")]
#[command(version)]
struct Cli {
    /// Directory holding stored timelines
    #[arg(long, global = true, env = "CUEBAR_STORE_DIR", default_value = ".cuebar")]
    store_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a timeline over a source video
    New {
        /// Timeline id
        id: String,

        /// Source video path or URL
        #[arg(long)]
        video: String,

        /// Video duration in seconds (probed with FFmpeg when omitted and supported)
        #[arg(long)]
        duration: Option<f64>,

        /// Length of newly inserted question cards in seconds
        #[arg(long, default_value = "10")]
        default_length: f64,
    },

    /// Show a timeline's segments and tick marks
    Info {
        /// Timeline id
        id: String,

        /// Zoom level in percent (1-100)
        #[arg(long, default_value = "50")]
        zoom: f64,
    },

    /// Parse and print a question file
    Questions {
        /// Question file path
        file: PathBuf,
    },

    /// Insert a question card at a point on the timeline
    AddQuestion {
        /// Timeline id
        id: String,

        /// Edited-timeline time to insert at, in seconds
        #[arg(long)]
        at: f64,

        /// Question file to take the question from
        #[arg(long)]
        questions: PathBuf,

        /// Which valid question of the file to use
        #[arg(long, default_value = "0")]
        index: usize,

        /// Card length in seconds (defaults to the timeline's default length)
        #[arg(long)]
        length: Option<f64>,
    },

    /// Move a segment's end, shifting everything after it
    Resize {
        id: String,
        segment: String,
        new_end: f64,
    },

    /// Move a question segment by a number of seconds, keeping its length
    Shift {
        id: String,
        segment: String,
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
    },

    /// Remove a segment
    Delete { id: String, segment: String },

    /// Map an edited-timeline time to source video time
    RealTime { id: String, edited_time: f64 },

    /// Follow a meeting's playback as a viewer until Ctrl-C
    Follow {
        /// Timeline id
        id: String,

        /// Meeting server socket URL
        #[arg(long, env = "CUEBAR_SYNC_URL")]
        url: String,

        /// Meeting room; when given, `url` is the server root
        #[arg(long)]
        room: Option<String>,
    },

    /// Broadcast one playback command as the controlling client
    #[command(group(ArgGroup::new("action").required(true).args(["play", "pause", "seek"])))]
    Control {
        /// Timeline id
        id: String,

        /// Meeting server socket URL
        #[arg(long, env = "CUEBAR_SYNC_URL")]
        url: String,

        /// Meeting room; when given, `url` is the server root
        #[arg(long)]
        room: Option<String>,

        #[arg(long)]
        play: bool,

        #[arg(long)]
        pause: bool,

        /// Jump to this edited-timeline time in seconds
        #[arg(long)]
        seek: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut store = FileStore::new(cli.store_dir);

    match cli.command {
        Commands::New {
            id,
            video,
            duration,
            default_length,
        } => create_timeline(&mut store, &id, video, duration, default_length)?,

        Commands::Info { id, zoom } => show_info(&store, &id, zoom)?,

        Commands::Questions { file } => show_questions(&file)?,

        Commands::AddQuestion {
            id,
            at,
            questions,
            index,
            length,
        } => {
            let question = pick_question(&questions, index)?;
            let session = edit_timeline(&mut store, &id, |session| {
                if let Some(length) = length {
                    session.set_default_length(length)?;
                }
                let inserted = session.insert_question(at, question)?;
                println!("Inserted question segment {}", inserted);
                Ok(())
            })?;
            print_segments(&session);
        }

        Commands::Resize { id, segment, new_end } => {
            let segment = SegmentId::from(segment);
            let session = edit_timeline(&mut store, &id, |session| Ok(session.resize(&segment, new_end)?))?;
            print_segments(&session);
        }

        Commands::Shift { id, segment, seconds } => {
            let segment = SegmentId::from(segment);
            let session = edit_timeline(&mut store, &id, |session| Ok(session.reposition(&segment, seconds)?))?;
            print_segments(&session);
        }

        Commands::Delete { id, segment } => {
            let segment = SegmentId::from(segment);
            let session = edit_timeline(&mut store, &id, |session| Ok(session.delete(&segment)?))?;
            print_segments(&session);
        }

        Commands::RealTime { id, edited_time } => {
            let session = load_session(&store, &id)?;
            let real = real_time(&session.segments, edited_time);
            match session.segments.segment_at(edited_time) {
                Some(segment) => println!(
                    "Edited {:.3}s -> video {:.3}s ({} segment {})",
                    edited_time,
                    real,
                    if segment.is_question() { "question" } else { "plain" },
                    segment.id
                ),
                None => println!("Edited {:.3}s is outside the timeline", edited_time),
            }
        }

        Commands::Follow { id, url, room } => {
            let url = resolve_url(&url, room.as_deref());
            follow(store, &id, &url).await?;
        }

        Commands::Control {
            id,
            url,
            room,
            play,
            pause,
            seek,
        } => {
            let action = match (play, pause, seek) {
                (_, _, Some(time)) => ControlAction::Seek(time),
                (true, _, _) => ControlAction::Play,
                (_, true, _) => ControlAction::Pause,
                _ => bail!("One of --play, --pause or --seek is required"),
            };
            let url = resolve_url(&url, room.as_deref());
            control(&store, &id, &url, action).await?;
        }
    }

    Ok(())
}

fn create_timeline(
    store: &mut FileStore,
    id: &str,
    video: String,
    duration: Option<f64>,
    default_length: f64,
) -> Result<()> {
    let duration = match duration {
        Some(duration) => duration,
        None => probe_video(&video)?,
    };
    if !(duration.is_finite() && duration > 0.0) {
        bail!("Video duration must be positive, got {}", duration);
    }

    let mut session = TimelineSession::new(id, video, duration);
    session.set_default_length(default_length)?;
    store
        .save(id, &session.snapshot())
        .with_context(|| format!("Failed to save timeline '{}'", id))?;

    println!("Created timeline '{}' ({:.3}s)", id, duration);
    print_segments(&session);
    Ok(())
}

#[cfg(feature = "ffmpeg")]
fn probe_video(video: &str) -> Result<f64> {
    cuebar_store::probe_duration(video).with_context(|| format!("Failed to probe duration of {}", video))
}

#[cfg(not(feature = "ffmpeg"))]
fn probe_video(_video: &str) -> Result<f64> {
    bail!("--duration is required when built without the ffmpeg feature")
}

fn load_session(store: &FileStore, id: &str) -> Result<TimelineSession> {
    let snapshot = store
        .load_by_id(id)
        .with_context(|| format!("Failed to load timeline '{}'", id))?
        .with_context(|| format!("Timeline '{}' not found in {}", id, store.root().display()))?;
    Ok(TimelineSession::from_snapshot(id, snapshot))
}

fn edit_timeline<F>(store: &mut FileStore, id: &str, edit: F) -> Result<TimelineSession>
where
    F: FnOnce(&mut TimelineSession) -> Result<()>,
{
    let mut session = load_session(store, id)?;
    edit(&mut session)?;
    store
        .save(id, &session.snapshot())
        .with_context(|| format!("Failed to save timeline '{}'", id))?;
    Ok(session)
}

fn show_info(store: &FileStore, id: &str, zoom: f64) -> Result<()> {
    let session = load_session(store, id)?.with_geometry(GeometryConfig {
        zoom_percent: zoom,
        ..GeometryConfig::default()
    });
    let total = session.total_duration();

    println!("Timeline: {}", session.id);
    println!("Source video: {}", session.source_video);
    println!(
        "Duration: {:.3}s edited, {:.3}s of video",
        total,
        real_time(&session.segments, total)
    );
    println!("Default question length: {:.3}s", session.default_length());
    print_segments(&session);

    let geometry: &TimelineGeometry = &session.geometry;
    println!(
        "Bar width at {}% zoom: {:.0}px",
        geometry.zoom_percent(),
        geometry.rendered_width(total)
    );
    let ticks: Vec<String> = geometry.ticks(total).iter().map(|t| format!("{}s", t)).collect();
    println!("Ticks: {}", ticks.join(" "));
    Ok(())
}

fn print_segments(session: &TimelineSession) {
    println!("Segments ({}):", session.segments.len());
    for (index, segment) in session.segments.iter().enumerate() {
        let label = match &segment.kind {
            SegmentKind::Plain => "video".to_string(),
            SegmentKind::Question(q) => format!("question [{}] {}", q.question_type, q.question),
        };
        println!(
            "  {:>3}  {:>9.3} - {:>9.3}  ({:>7.3}s)  {}  {}",
            index,
            segment.start,
            segment.end,
            segment.duration(),
            segment.id,
            label
        );
    }
}

fn read_questions(path: &Path) -> Result<Vec<Question>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut questions = Vec::new();
    for (block, result) in parse_questions(&text).into_iter().enumerate() {
        match result {
            Ok(question) => questions.push(question),
            Err(err) => warn!("Skipping question block {}: {}", block + 1, err),
        }
    }
    Ok(questions)
}

fn show_questions(path: &Path) -> Result<()> {
    let questions = read_questions(path)?;
    println!("{} question(s) in {}", questions.len(), path.display());

    for (index, q) in questions.iter().enumerate() {
        println!("[{}] {} ({}, {}, display {})", index, q.question, q.question_type, q.difficulty, q.display_type);
        for answer in &q.answers {
            let mark = if q.correct_answers.contains(answer) { "*" } else { " " };
            println!("    {} {}", mark, answer);
        }
        if q.show_winner || q.live {
            println!("    winner: {}, live: {}", q.show_winner, q.live);
        }
    }
    Ok(())
}

fn pick_question(path: &Path, index: usize) -> Result<Arc<Question>> {
    let mut questions = read_questions(path)?;
    if index >= questions.len() {
        bail!(
            "Question index {} out of range, {} contains {} valid question(s)",
            index,
            path.display(),
            questions.len()
        );
    }
    Ok(Arc::new(questions.swap_remove(index)))
}

fn resolve_url(url: &str, room: Option<&str>) -> String {
    match room {
        Some(room) => meeting_url(url, room),
        None => url.to_string(),
    }
}

/// Source video length a simulated player needs for this timeline
fn video_length(session: &TimelineSession) -> f64 {
    real_time(&session.segments, session.total_duration())
}

async fn follow(store: FileStore, id: &str, url: &str) -> Result<()> {
    let handle = StoreHandle::new(store);
    let snapshot: TimelineSnapshot = handle
        .load_by_id(id)
        .await
        .with_context(|| format!("Failed to load timeline '{}'", id))?
        .with_context(|| format!("Timeline '{}' not found", id))?;
    let session = TimelineSession::from_snapshot(id, snapshot);
    let config = SyncConfig::default();
    let media = SimulatedMedia::new(video_length(&session));

    let (transport, clocks) = WsTransport::connect(url)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    match transport.request_snapshot(Duration::from_secs(5)).await {
        Ok(clock) => info!(
            "Initial state: {} at {:.3}s",
            if clock.stopped { "stopped" } else { "playing" },
            clock.current_time
        ),
        Err(err) => warn!("No initial state from server ({}), starting stopped", err),
    }

    let session = Arc::new(Mutex::new(session));
    let (driver, mut events) = PlaybackDriver::spawn(
        session,
        PlaybackSynchronizer::new(media, config),
        clocks,
        config,
    );

    println!("Following '{}' on {} (Ctrl-C to stop)", id, url);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }

    driver.shutdown().await.context("Playback driver failed")?;
    transport.close().await.context("Failed to close socket")?;
    Ok(())
}

fn print_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::StateChanged(state) => println!("state: {:?}", state),
        PlaybackEvent::QuestionShown { segment, question } => {
            println!("question on {}: {}", segment, question.question);
            for answer in &question.answers {
                println!("  - {}", answer);
            }
        }
        PlaybackEvent::QuestionCleared => println!("question closed"),
        PlaybackEvent::Resynced { real_time } => println!("resynced video to {:.3}s", real_time),
        PlaybackEvent::Wrapped => println!("wrapped to start"),
        PlaybackEvent::Ended => println!("video ended"),
        PlaybackEvent::EndingChanged(ending) => println!("ending segment: {}", ending.as_deref().unwrap_or("none")),
        PlaybackEvent::MediaFailed(reason) => println!("media failed: {}", reason),
    }
}

enum ControlAction {
    Play,
    Pause,
    Seek(f64),
}

async fn control(store: &FileStore, id: &str, url: &str, action: ControlAction) -> Result<()> {
    let mut session = load_session(store, id)?;
    let mut sync = PlaybackSynchronizer::new(SimulatedMedia::new(video_length(&session)), SyncConfig::default());

    let (transport, _) = WsTransport::connect(url)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    match transport.request_snapshot(Duration::from_secs(2)).await {
        Ok(clock) => {
            sync.apply_clock(&mut session, clock);
        }
        Err(err) => match action {
            ControlAction::Seek(_) => warn!("No current state from server ({}), seeking from a stopped clock", err),
            ControlAction::Play | ControlAction::Pause => {
                transport.close().await.context("Failed to close socket")?;
                bail!("No current state from server ({}), refusing to change playback at an unknown position", err);
            }
        },
    }

    let clock = match action {
        ControlAction::Play if session.clock.stopped => sync.toggle_play(&mut session),
        ControlAction::Pause if !session.clock.stopped => sync.toggle_play(&mut session),
        ControlAction::Play | ControlAction::Pause => session.clock.clone(),
        ControlAction::Seek(time) => sync.seek(&mut session, time),
    };

    transport
        .send_state(&clock)
        .await
        .context("Failed to send playback state")?;
    println!(
        "Sent: {} at {:.3}s{}",
        if clock.stopped { "stopped" } else { "playing" },
        clock.current_time,
        clock
            .ending_id
            .as_deref()
            .map(|e| format!(" (ending {})", e))
            .unwrap_or_default()
    );

    transport.close().await.context("Failed to close socket")?;
    Ok(())
}
