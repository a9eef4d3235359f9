// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Move history for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::evaluation::Score;
use crate::folders::{move_file, Bucket};
use crate::Result;

/// A single move into a bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub score: Score,
    pub bucket: String,
    #[serde(default)]
    pub undone: bool,
}

impl HistoryEntry {
    pub fn new(original_path: PathBuf, new_path: PathBuf, score: Score) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            original_path,
            new_path,
            score,
            bucket: Bucket::for_score(score).name(),
            undone: false,
        }
    }
}

/// Result of undoing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Restored,
    WouldRestore,
    /// The moved file is gone
    Missing,
    /// Something already sits at the original path
    Occupied,
}

/// History manager for tracking moves
pub struct History {
    path: PathBuf,
}

impl History {
    /// Create a new history manager
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all history entries
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Failed to parse history entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Entries not yet undone, oldest first
    pub fn get_undoable(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().filter(|e| !e.undone).collect())
    }

    /// Mark entries as undone, rewriting the file
    pub fn mark_undone(&self, ids: &[String]) -> Result<()> {
        let entries = self.read_all()?;

        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if ids.contains(&entry.id) {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Move the last `count` files back where they came from, newest first.
    ///
    /// If a move fails, entries restored before it are still marked undone
    /// and the error is returned.
    pub fn undo(&self, count: usize, dry_run: bool) -> Result<Vec<(HistoryEntry, UndoOutcome)>> {
        let entries = self.get_undoable()?;
        let mut results = Vec::new();
        let mut restored = Vec::new();
        let mut failure = None;

        for entry in entries.into_iter().rev().take(count) {
            let outcome = if !entry.new_path.exists() {
                warn!("File not found (may have been moved/deleted): {:?}", entry.new_path);
                UndoOutcome::Missing
            } else if entry.original_path.exists() {
                warn!("Original path already exists: {:?}", entry.original_path);
                UndoOutcome::Occupied
            } else if dry_run {
                UndoOutcome::WouldRestore
            } else if let Err(e) = restore(&entry) {
                warn!("Failed to restore {:?}: {}", entry.new_path, e);
                failure = Some(e);
                break;
            } else {
                info!("Restored {:?} -> {:?}", entry.new_path, entry.original_path);
                restored.push(entry.id.clone());
                UndoOutcome::Restored
            };
            results.push((entry, outcome));
        }

        if !restored.is_empty() {
            self.mark_undone(&restored)?;
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get history file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn restore(entry: &HistoryEntry) -> Result<()> {
    if let Some(parent) = entry.original_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    move_file(&entry.new_path, &entry.original_path)
}
