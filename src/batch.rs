// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Batch processing of a file or directory tree
//!
//! A run creates the output and log directories, evaluates every image one
//! after another, and returns a summary. A failure on one image is logged and
//! the run moves on to the next; only setup problems end a run early.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::AppConfig;
use crate::evaluation::{Score, TokenUsage};
use crate::evaluator::Evaluator;
use crate::folders::{Bucket, BucketMover, MoveOutcome};
use crate::history::{History, HistoryEntry};
use crate::report::{EvaluationLog, LogEntry};
use crate::vision::VisionModel;
use crate::{Result, SorterError};

/// Extensions accepted as images, compared case-insensitively
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Check if a path has an accepted image extension
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Images to process under `source`.
///
/// A single file must itself be an accepted image. Directories are listed in
/// the order the filesystem returns; with `recursive` the whole subtree is
/// walked.
pub fn collect_images(source: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if source.is_file() {
        if is_supported_image(source) {
            return Ok(vec![source.to_path_buf()]);
        }
        return Err(SorterError::InvalidSource(format!(
            "{} is not a supported image ({})",
            source.display(),
            IMAGE_EXTENSIONS.join(", ")
        )));
    }
    if !source.is_dir() {
        return Err(SorterError::InvalidSource(format!(
            "{} does not exist",
            source.display()
        )));
    }

    let mut files = Vec::new();
    if recursive {
        for entry in WalkDir::new(source) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.path().is_file() && is_supported_image(entry.path()) {
                files.push(entry.into_path());
            }
        }
    } else {
        for entry in std::fs::read_dir(source)?.flatten() {
            let path = entry.path();
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

/// Token and item counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub processed_count: u64,
}

impl RunningTotals {
    /// Count one image, adding its usage when the model was reached
    pub fn record(&mut self, usage: Option<TokenUsage>) {
        self.processed_count += 1;
        if let Some(usage) = usage {
            self.prompt_tokens += usage.prompt_tokens;
            self.completion_tokens += usage.completion_tokens;
            self.total_tokens += usage.total_tokens;
        }
    }

    pub fn average_tokens_per_image(&self) -> Option<f64> {
        if self.processed_count == 0 {
            None
        } else {
            Some(self.total_tokens as f64 / self.processed_count as f64)
        }
    }
}

/// Final state of a run
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub totals: RunningTotals,
    /// Images moved into a bucket (or that would be, in a dry run)
    pub sorted: usize,
    /// Scored images left in place because the destination was taken
    pub skipped: usize,
    /// Images without a score, or whose move failed
    pub failed: usize,
    /// Buckets that received at least one image
    pub folders: BTreeSet<Bucket>,
}

/// Progress notifications emitted during a run
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started {
        total: usize,
    },
    ImageStarted {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    Usage {
        path: &'a Path,
        usage: TokenUsage,
        totals: &'a RunningTotals,
    },
    /// `destination` is `None` in a dry run
    Sorted {
        path: &'a Path,
        score: Score,
        bucket: Bucket,
        destination: Option<&'a Path>,
    },
    Skipped {
        path: &'a Path,
        score: Score,
        existing: &'a Path,
    },
    Failed {
        path: &'a Path,
        reason: &'a str,
    },
    Finished {
        summary: &'a BatchSummary,
    },
}

/// Receives progress while a run is in flight
pub trait BatchObserver {
    fn on_event(&mut self, event: BatchEvent<'_>);
}

/// Observer that ignores everything
pub struct SilentObserver;

impl BatchObserver for SilentObserver {
    fn on_event(&mut self, _event: BatchEvent<'_>) {}
}

/// Walks a source, evaluating and filing each image
pub struct BatchRunner<'a, M> {
    evaluator: &'a Evaluator<M>,
    mover: BucketMover,
    log: EvaluationLog,
    logs_dir: PathBuf,
    history: Option<History>,
    dry_run: bool,
}

impl<'a, M: VisionModel> BatchRunner<'a, M> {
    pub fn new(evaluator: &'a Evaluator<M>, config: &AppConfig) -> Self {
        Self {
            evaluator,
            mover: BucketMover::new(&config.directories.output, config.scoring.collision),
            log: EvaluationLog::new(config.log_path()),
            logs_dir: config.directories.logs.clone(),
            history: Some(History::new(config.history_path())),
            dry_run: false,
        }
    }

    /// Evaluate and log, but leave every file where it is
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Do not record moves for undo
    pub fn without_history(mut self) -> Self {
        self.history = None;
        self
    }

    /// Create the output and log directories, and the log header if the
    /// log is new
    pub fn initialize(&self) -> Result<()> {
        std::fs::create_dir_all(self.mover.output_dir())?;
        std::fs::create_dir_all(&self.logs_dir)?;
        self.log.ensure_header()?;
        Ok(())
    }

    /// Process every image under `source`
    pub async fn run(
        &self,
        source: &Path,
        recursive: bool,
        observer: &mut dyn BatchObserver,
    ) -> Result<BatchSummary> {
        self.initialize()?;

        let images = collect_images(source, recursive)?;
        let total = images.len();
        info!("Found {} images in {:?}", total, source);
        observer.on_event(BatchEvent::Started { total });

        let mut summary = BatchSummary::default();
        for (index, path) in images.iter().enumerate() {
            observer.on_event(BatchEvent::ImageStarted {
                index: index + 1,
                total,
                path,
            });
            self.process_image(path, &mut summary, observer).await;
        }

        info!(
            "Batch finished: {} processed, {} sorted, {} failed",
            summary.totals.processed_count, summary.sorted, summary.failed
        );
        observer.on_event(BatchEvent::Finished { summary: &summary });
        Ok(summary)
    }

    async fn process_image(
        &self,
        path: &Path,
        summary: &mut BatchSummary,
        observer: &mut dyn BatchObserver,
    ) {
        let outcome = self.evaluator.evaluate(path).await;

        summary.totals.record(outcome.usage);
        if let Some(usage) = outcome.usage {
            observer.on_event(BatchEvent::Usage {
                path,
                usage,
                totals: &summary.totals,
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let evaluation = match outcome.result {
            Ok(evaluation) => evaluation,
            Err(failure) => {
                let reason = failure.to_string();
                self.write_log(&LogEntry::Failed { image: &name, reason: reason.clone() });
                summary.failed += 1;
                observer.on_event(BatchEvent::Failed { path, reason: &reason });
                return;
            }
        };

        let score = evaluation.score;
        let bucket = Bucket::for_score(score);
        let scored_entry = LogEntry::Scored {
            image: &name,
            score,
            record: &evaluation.record,
        };

        if self.dry_run {
            debug!("Dry run: would move {:?} into {}", path, bucket);
            self.write_log(&scored_entry);
            summary.sorted += 1;
            summary.folders.insert(bucket);
            observer.on_event(BatchEvent::Sorted {
                path,
                score,
                bucket,
                destination: None,
            });
            return;
        }

        match self.mover.move_into(path, score) {
            Ok(MoveOutcome::Moved(destination)) => {
                if let Some(history) = &self.history {
                    let entry = HistoryEntry::new(path.to_path_buf(), destination.clone(), score);
                    if let Err(e) = history.append(&entry) {
                        warn!("Failed to record move in history: {}", e);
                    }
                }
                self.write_log(&scored_entry);
                summary.sorted += 1;
                summary.folders.insert(bucket);
                observer.on_event(BatchEvent::Sorted {
                    path,
                    score,
                    bucket,
                    destination: Some(&destination),
                });
            }
            Ok(MoveOutcome::Skipped(existing)) => {
                self.write_log(&scored_entry);
                summary.skipped += 1;
                observer.on_event(BatchEvent::Skipped {
                    path,
                    score,
                    existing: &existing,
                });
            }
            Err(e) => {
                warn!("Could not move {:?} into {}: {}", path, bucket, e);
                let reason = format!("Scored {} but could not move into {}: {}", score, bucket, e);
                self.write_log(&LogEntry::Failed { image: &name, reason: reason.clone() });
                summary.failed += 1;
                observer.on_event(BatchEvent::Failed { path, reason: &reason });
            }
        }
    }

    fn write_log(&self, entry: &LogEntry<'_>) {
        if let Err(e) = self.log.append(entry) {
            warn!("Failed to write evaluation log {:?}: {}", self.log.path(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("a.jpg")));
        assert!(is_supported_image(Path::new("a.JPEG")));
        assert!(is_supported_image(Path::new("dir/a.WebP")));
        assert!(is_supported_image(Path::new("a.bmp")));
        assert!(!is_supported_image(Path::new("a.tiff")));
        assert!(!is_supported_image(Path::new("a.txt")));
        assert!(!is_supported_image(Path::new("jpg")));
    }

    #[test]
    fn test_collect_non_recursive_skips_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("b.png"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("folder.jpg")).unwrap();

        let flat = collect_images(dir.path(), false).unwrap();
        assert_eq!(flat, vec![dir.path().join("a.jpg")]);

        let mut deep = collect_images(dir.path(), true).unwrap();
        deep.sort();
        assert_eq!(
            deep,
            vec![dir.path().join("a.jpg"), dir.path().join("nested").join("b.png")]
        );
    }

    #[test]
    fn test_collect_rejects_bad_sources() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"x").unwrap();

        assert!(matches!(collect_images(&text, false), Err(SorterError::InvalidSource(_))));
        assert!(matches!(
            collect_images(&dir.path().join("missing"), false),
            Err(SorterError::InvalidSource(_))
        ));
    }

    #[test]
    fn test_running_totals() {
        let mut totals = RunningTotals::default();
        assert_eq!(totals.average_tokens_per_image(), None);

        totals.record(Some(TokenUsage { prompt_tokens: 90, completion_tokens: 10, total_tokens: 100 }));
        totals.record(None);
        totals.record(Some(TokenUsage { prompt_tokens: 150, completion_tokens: 50, total_tokens: 200 }));

        assert_eq!(totals.processed_count, 3);
        assert_eq!(totals.prompt_tokens, 240);
        assert_eq!(totals.completion_tokens, 60);
        assert_eq!(totals.total_tokens, 300);
        assert_eq!(totals.average_tokens_per_image(), Some(100.0));
    }
}
