// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Aesthete: AI Image Quality Sorter
//!
//! Sends images to a vision model, turns its ten-attribute aesthetic rating
//! into a 1-100 score, and files each image into a score-range folder while
//! keeping an append-only evaluation log.

pub mod batch;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod folders;
pub mod history;
pub mod openai;
pub mod report;
pub mod vision;

pub use config::AppConfig;
pub use error::{EvaluationFailure, Result, SorterError};
