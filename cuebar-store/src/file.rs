//! Directory-backed store: one `<id>.cue` container per timeline

use crate::{validate_id, Result, TimelineStore};
use cuebar_core::TimelineSnapshot;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

const EXTENSION: &str = "cue";

/// Stores snapshots as container files in one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`; the directory is created on first save
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(format!("{}.{}", id, EXTENSION)))
    }
}

impl TimelineStore for FileStore {
    fn save(&mut self, id: &str, snapshot: &TimelineSnapshot) -> Result<()> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.root)?;

        // Readers never see a half-written file: write aside, then rename over.
        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            snapshot.write(&mut writer)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;

        info!(
            "saved timeline {} ({} segments, {:.2}s)",
            id,
            snapshot.segments.len(),
            snapshot.segments.total_duration()
        );
        Ok(())
    }

    fn load_by_id(&self, id: &str) -> Result<Option<TimelineSnapshot>> {
        let path = self.path_for(id)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no stored timeline at {}", path.display());
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot = TimelineSnapshot::read(BufReader::new(file))?;
        info!("loaded timeline {} from {}", id, path.display());
        Ok(Some(snapshot))
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
