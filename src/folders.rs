// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Score buckets and moving images into them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::evaluation::Score;
use crate::{Result, SorterError};

/// A 3-point score range such as `7-9`; the last one is `100-100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bucket {
    lower: u8,
    upper: u8,
}

impl Bucket {
    /// Width of every bucket except the last
    pub const WIDTH: u8 = 3;

    pub fn for_score(score: Score) -> Self {
        let lower = (score.value() - 1) / Self::WIDTH * Self::WIDTH + 1;
        let upper = (lower + Self::WIDTH - 1).min(Score::MAX);
        Self { lower, upper }
    }

    pub fn lower(self) -> u8 {
        self.lower
    }

    pub fn upper(self) -> u8 {
        self.upper
    }

    pub fn contains(self, score: Score) -> bool {
        (self.lower..=self.upper).contains(&score.value())
    }

    /// Directory name, `L-U`
    pub fn name(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lower, self.upper)
    }
}

/// What to do when the destination file already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Append `_1`, `_2`, ... to the file stem
    #[default]
    Rename,
    /// Leave the source where it is
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Fail the item
    Error,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rename" => Ok(CollisionPolicy::Rename),
            "skip" => Ok(CollisionPolicy::Skip),
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "error" => Ok(CollisionPolicy::Error),
            other => Err(format!("unknown collision policy '{}'", other)),
        }
    }
}

/// Where a file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(PathBuf),
    /// Destination was taken and the policy said to skip
    Skipped(PathBuf),
}

/// Moves scored images into `<output>/<bucket>/`
#[derive(Debug, Clone)]
pub struct BucketMover {
    output_dir: PathBuf,
    policy: CollisionPolicy,
}

impl BucketMover {
    pub fn new(output_dir: impl Into<PathBuf>, policy: CollisionPolicy) -> Self {
        Self {
            output_dir: output_dir.into(),
            policy,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory for a bucket, created if missing
    pub fn ensure_bucket_dir(&self, bucket: Bucket) -> Result<PathBuf> {
        let dir = self.output_dir.join(bucket.name());
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            debug!("Created bucket directory: {:?}", dir);
        }
        Ok(dir)
    }

    /// Move `source` into the bucket for `score`, keeping its file name
    pub fn move_into(&self, source: &Path, score: Score) -> Result<MoveOutcome> {
        let bucket = Bucket::for_score(score);
        let dir = self.ensure_bucket_dir(bucket)?;

        let file_name = source
            .file_name()
            .ok_or_else(|| SorterError::Config(format!("No file name in {:?}", source)))?;
        let destination = dir.join(file_name);

        let destination = if destination.exists() {
            match self.policy {
                CollisionPolicy::Rename => free_name(&destination),
                CollisionPolicy::Skip => {
                    info!("{:?} already exists, leaving {:?} in place", destination, source);
                    return Ok(MoveOutcome::Skipped(destination));
                }
                CollisionPolicy::Overwrite => destination,
                CollisionPolicy::Error => {
                    return Err(SorterError::Collision(destination.display().to_string()))
                }
            }
        } else {
            destination
        };

        move_file(source, &destination)?;
        info!("Moved {:?} to {:?}", source, destination);
        Ok(MoveOutcome::Moved(destination))
    }
}

/// First `stem_N.ext` next to `taken` that does not exist yet
fn free_name(taken: &Path) -> PathBuf {
    let parent = taken.parent().unwrap_or_else(|| Path::new(""));
    let stem = taken
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = taken.extension().map(|e| e.to_string_lossy().into_owned());

    (1u32..)
        .map(|n| match &ext {
            Some(ext) => parent.join(format!("{}_{}.{}", stem, n, ext)),
            None => parent.join(format!("{}_{}", stem, n)),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| taken.to_path_buf())
}

/// Rename, falling back to copy + remove across filesystems
pub fn move_file(source: &Path, destination: &Path) -> Result<()> {
    match std::fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!("rename failed ({}), copying instead", e);
            copy_then_remove(source, destination, |path| std::fs::remove_file(path))
        }
    }
}

/// Copy, then remove the source with `remove`. If the source cannot be
/// removed the copy is deleted, so the file only ever ends up in one place.
fn copy_then_remove<F>(source: &Path, destination: &Path, remove: F) -> Result<()>
where
    F: FnOnce(&Path) -> std::io::Result<()>,
{
    std::fs::copy(source, destination)?;
    if let Err(e) = remove(source) {
        if let Err(cleanup) = std::fs::remove_file(destination) {
            warn!("Could not delete copy {:?}: {}", destination, cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(n: u64) -> Score {
        Score::new(n).unwrap()
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(Bucket::for_score(score(1)).name(), "1-3");
        assert_eq!(Bucket::for_score(score(3)).name(), "1-3");
        assert_eq!(Bucket::for_score(score(4)).name(), "4-6");
        assert_eq!(Bucket::for_score(score(50)).name(), "49-51");
        assert_eq!(Bucket::for_score(score(99)).name(), "97-99");
        assert_eq!(Bucket::for_score(score(100)).name(), "100-100");
    }

    #[test]
    fn test_buckets_partition_range() {
        let mut previous: Option<Bucket> = None;
        for n in 1..=100u64 {
            let s = score(n);
            let bucket = Bucket::for_score(s);

            assert_eq!(bucket.lower() % 3, 1);
            assert_eq!(bucket.upper(), (bucket.lower() + 2).min(100));
            assert!(bucket.contains(s));
            assert_eq!(bucket, Bucket::for_score(s));

            if let Some(prev) = previous {
                if prev != bucket {
                    // No gap and no overlap between neighbours
                    assert_eq!(bucket.lower(), prev.upper() + 1);
                }
            } else {
                assert_eq!(bucket.lower(), 1);
            }
            previous = Some(bucket);
        }
        assert_eq!(previous.map(Bucket::upper), Some(100));
    }

    #[test]
    fn test_move_creates_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("cat.jpg");
        std::fs::write(&source, b"jpeg").unwrap();

        let mover = BucketMover::new(dir.path().join("out"), CollisionPolicy::Rename);
        let outcome = mover.move_into(&source, score(58)).unwrap();

        let expected = dir.path().join("out").join("58-60").join("cat.jpg");
        assert_eq!(outcome, MoveOutcome::Moved(expected.clone()));
        assert!(expected.exists());
        assert!(!source.exists());
    }

    #[test]
    fn test_failed_source_removal_drops_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.jpg");
        let destination = dir.path().join("b.jpg");
        std::fs::write(&source, b"img").unwrap();

        let err = copy_then_remove(&source, &destination, |_| {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
        })
        .unwrap_err();

        assert!(matches!(err, SorterError::FileSystem(_)));
        assert!(source.exists());
        assert!(!destination.exists());

        copy_then_remove(&source, &destination, |path| std::fs::remove_file(path)).unwrap();
        assert!(!source.exists());
        assert_eq!(std::fs::read(&destination).unwrap(), b"img");
    }

    #[test]
    fn test_collision_policies() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join("1-3")).unwrap();
        std::fs::write(out.join("1-3").join("a.png"), b"old").unwrap();

        let write_source = || {
            let source = dir.path().join("a.png");
            std::fs::write(&source, b"new").unwrap();
            source
        };

        let source = write_source();
        let outcome = BucketMover::new(&out, CollisionPolicy::Skip)
            .move_into(&source, score(2))
            .unwrap();
        assert!(matches!(outcome, MoveOutcome::Skipped(_)));
        assert!(source.exists());

        let err = BucketMover::new(&out, CollisionPolicy::Error)
            .move_into(&source, score(2))
            .unwrap_err();
        assert!(matches!(err, SorterError::Collision(_)));
        assert!(source.exists());

        let outcome = BucketMover::new(&out, CollisionPolicy::Rename)
            .move_into(&source, score(2))
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Moved(out.join("1-3").join("a_1.png")));

        let source = write_source();
        BucketMover::new(&out, CollisionPolicy::Overwrite)
            .move_into(&source, score(2))
            .unwrap();
        assert_eq!(std::fs::read(out.join("1-3").join("a.png")).unwrap(), b"new");
    }
}
