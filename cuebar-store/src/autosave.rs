//! Change-tracking autosave

use crate::{Result, StoreHandle, TimelineStore};
use cuebar_core::{TimelineSession, TimelineSnapshot};
use log::{debug, error};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Saves a timeline only when it differs from what was last written
#[derive(Debug, Clone)]
pub struct AutoSave {
    id: String,
    last_saved: Option<TimelineSnapshot>,
}

impl AutoSave {
    /// Creates an autosave for `id` with nothing saved yet
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last_saved: None,
        }
    }

    /// Creates an autosave that treats `snapshot` as already stored, e.g. right after a load
    pub fn from_saved(id: impl Into<String>, snapshot: TimelineSnapshot) -> Self {
        Self {
            id: id.into(),
            last_saved: Some(snapshot),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Checks whether `snapshot` differs from the last saved one
    pub fn is_dirty(&self, snapshot: &TimelineSnapshot) -> bool {
        self.last_saved.as_ref() != Some(snapshot)
    }

    /// Saves through `store` if dirty; returns whether a write happened
    pub fn save_if_changed<S: TimelineStore>(&mut self, store: &mut S, snapshot: &TimelineSnapshot) -> Result<bool> {
        if !self.is_dirty(snapshot) {
            return Ok(false);
        }
        store.save(&self.id, snapshot)?;
        self.last_saved = Some(snapshot.clone());
        Ok(true)
    }

    /// Async form of [`save_if_changed`](Self::save_if_changed) going through a handle
    pub async fn save_if_changed_async<S: TimelineStore + Send + 'static>(
        &mut self,
        store: &StoreHandle<S>,
        snapshot: &TimelineSnapshot,
    ) -> Result<bool> {
        if !self.is_dirty(snapshot) {
            return Ok(false);
        }
        store.save(&self.id, snapshot.clone()).await?;
        self.last_saved = Some(snapshot.clone());
        Ok(true)
    }

    /// Periodically saves `session` until `cancel` fires, with a final save on the way out.
    ///
    /// Failed saves are logged and retried on the next period.
    pub fn spawn<S: TimelineStore + Send + 'static>(
        mut self,
        store: StoreHandle<S>,
        session: Arc<Mutex<TimelineSession>>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let stopping = tokio::select! {
                    _ = cancel.cancelled() => true,
                    _ = ticker.tick() => false,
                };

                let snapshot = session.lock().await.snapshot();
                match self.save_if_changed_async(&store, &snapshot).await {
                    Ok(true) => debug!("autosaved {}", self.id),
                    Ok(false) => {}
                    Err(err) => error!("autosave of {} failed: {}", self.id, err),
                }

                if stopping {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use cuebar_core::{Difficulty, Question, QuestionType, SegmentList};

    #[test]
    fn test_saves_only_changes() {
        let mut store = MemoryStore::new();
        let mut autosave = AutoSave::new("talk");
        let snapshot = TimelineSnapshot::new(SegmentList::new(30.0), "talk.mp4", 10.0);

        assert!(autosave.save_if_changed(&mut store, &snapshot).unwrap());
        assert!(!autosave.save_if_changed(&mut store, &snapshot).unwrap());

        let id = snapshot.segments.segments()[0].id.clone();
        let q = Arc::new(Question::new("?", Difficulty::Hard, QuestionType::Rank));
        let edited = TimelineSnapshot::new(snapshot.segments.split_and_add(&id, 5.0, q, 10.0), "talk.mp4", 10.0);
        assert!(autosave.is_dirty(&edited));
        assert!(autosave.save_if_changed(&mut store, &edited).unwrap());
        assert_eq!(store.load_by_id("talk").unwrap(), Some(edited));
    }

    #[test]
    fn test_from_saved_starts_clean() {
        let snapshot = TimelineSnapshot::new(SegmentList::new(30.0), "talk.mp4", 10.0);
        let autosave = AutoSave::from_saved("talk", snapshot.clone());
        assert!(!autosave.is_dirty(&snapshot));
    }

    #[tokio::test]
    async fn test_background_autosave_saves_on_cancel() {
        let store = StoreHandle::new(MemoryStore::new());
        let session = Arc::new(Mutex::new(TimelineSession::new("talk", "talk.mp4", 30.0)));
        let cancel = CancellationToken::new();

        let task = AutoSave::new("talk").spawn(
            store.clone(),
            session.clone(),
            Duration::from_secs(3600),
            cancel.clone(),
        );

        {
            let mut session = session.lock().await;
            let q = Arc::new(Question::new("?", Difficulty::Easy, QuestionType::Mc));
            session.insert_question(10.0, q).unwrap();
        }
        cancel.cancel();
        task.await.unwrap();

        let saved = store.load_by_id("talk").await.unwrap().unwrap();
        assert_eq!(saved.total_duration, 40.0);
    }
}
