// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Append-only, human-readable evaluation log

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::evaluation::{Attribute, EvaluationRecord, Score};
use crate::Result;

/// Line closing every entry
pub const SEPARATOR: &str = "----------------------------------------";

/// First lines of a new log file
pub const LOG_HEADER: &str = "Image Evaluation Log\n========================================\n\n";

/// What the log records about one image
#[derive(Debug, Clone)]
pub enum LogEntry<'a> {
    Scored {
        image: &'a str,
        score: Score,
        record: &'a EvaluationRecord,
    },
    Failed {
        image: &'a str,
        reason: String,
    },
}

impl LogEntry<'_> {
    /// Entry text, separator line included
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self {
            LogEntry::Scored { image, score, record } => {
                let _ = writeln!(out, "Image: {}", image);
                let _ = writeln!(out, "Score: {}", score);
                let _ = writeln!(out, "Description: {}", record.description);
                for attribute in Attribute::ALL {
                    if let Some(value) = record.attributes.get(&attribute) {
                        let _ = writeln!(out, "{}: {}/10", attribute.label(), value.value());
                    }
                }
                if let Some(analysis) = &record.final_analysis {
                    let _ = writeln!(out, "Final Analysis: {}", analysis);
                }
            }
            LogEntry::Failed { image, reason } => {
                let _ = writeln!(out, "Image: {}", image);
                let _ = writeln!(out, "Score: N/A");
                let _ = writeln!(out, "Reason: {}", reason);
            }
        }
        out.push_str(SEPARATOR);
        out.push('\n');
        out
    }
}

/// Evaluation log file, opened for each write
#[derive(Debug, Clone)]
pub struct EvaluationLog {
    path: PathBuf,
}

impl EvaluationLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Write the header if the log does not exist yet. An existing log is
    /// left untouched.
    pub fn ensure_header(&self) -> Result<()> {
        self.create_parent()?;

        match OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(mut file) => {
                file.write_all(LOG_HEADER.as_bytes())?;
                debug!("Started evaluation log {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append one entry
    pub fn append(&self, entry: &LogEntry<'_>) -> Result<()> {
        self.create_parent()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.render().as_bytes())?;

        Ok(())
    }

    /// Get log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
