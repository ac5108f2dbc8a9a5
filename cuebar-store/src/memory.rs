//! In-memory store

use crate::{validate_id, Result, TimelineStore};
use cuebar_core::TimelineSnapshot;
use std::collections::BTreeMap;
use std::io::Cursor;

/// Keeps encoded snapshots in memory.
///
/// Snapshots go through the same container encoding as the file store, so a
/// load returns exactly what a file round-trip would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TimelineStore for MemoryStore {
    fn save(&mut self, id: &str, snapshot: &TimelineSnapshot) -> Result<()> {
        validate_id(id)?;
        let mut buffer = Vec::new();
        snapshot.write(&mut buffer)?;
        self.entries.insert(id.to_string(), buffer);
        Ok(())
    }

    fn load_by_id(&self, id: &str) -> Result<Option<TimelineSnapshot>> {
        validate_id(id)?;
        self.entries
            .get(id)
            .map(|bytes| TimelineSnapshot::read(Cursor::new(bytes)).map_err(Into::into))
            .transpose()
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuebar_core::SegmentList;

    #[test]
    fn test_roundtrip_and_list() {
        let mut store = MemoryStore::new();
        let snapshot = TimelineSnapshot::new(SegmentList::new(42.0), "clip.mp4", 8.0);

        store.save("zeta", &snapshot).unwrap();
        store.save("alpha", &snapshot).unwrap();

        assert_eq!(store.load_by_id("zeta").unwrap(), Some(snapshot));
        assert_eq!(store.load_by_id("missing").unwrap(), None);
        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
        assert_eq!(store.len(), 2);
    }
}
