// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for Aesthete

use thiserror::Error;

/// Result type alias for Aesthete operations
pub type Result<T> = std::result::Result<T, SorterError>;

/// Errors that stop a command outright.
///
/// Problems with a single image are not reported through this type; the batch
/// records them as an [`EvaluationFailure`] and moves on.
#[derive(Error, Debug)]
pub enum SorterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Destination already exists: {0}")]
    Collision(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Why a single image ended up without a score.
///
/// The `Display` output is what gets written to the evaluation log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationFailure {
    /// The file could not be read or the model call failed.
    #[error("Error during evaluation: {0}")]
    Request(String),

    /// The reply lacked the lines the scoring mode needs.
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Could not parse scores from response")]
    NoScores,

    /// Direct mode: the `Score:` line carried no number.
    #[error("Could not parse score from: {0}")]
    UnparsableScore(String),

    /// Direct mode: the number was outside 1..=100.
    #[error("Invalid score value: {0}")]
    ScoreOutOfRange(u64),
}
