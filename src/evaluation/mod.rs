// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Evaluation records and the logic that turns model replies into scores

pub mod parser;
pub mod score;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

pub use parser::{leading_integer, parse_response};
pub use score::{average_score, Score, ScoringMode};

/// One of the ten aesthetic dimensions the model rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Composition,
    Color,
    Lighting,
    Subject,
    Originality,
    TechnicalSkill,
    Emotion,
    Storytelling,
    Clarity,
    Creativity,
}

impl Attribute {
    /// All attributes, in the order they are asked for and logged
    pub const ALL: [Attribute; 10] = [
        Attribute::Composition,
        Attribute::Color,
        Attribute::Lighting,
        Attribute::Subject,
        Attribute::Originality,
        Attribute::TechnicalSkill,
        Attribute::Emotion,
        Attribute::Storytelling,
        Attribute::Clarity,
        Attribute::Creativity,
    ];

    /// Highest value a single attribute can take
    pub const MAX_VALUE: u8 = 10;

    /// Label used in the model's reply and in the log file
    pub fn label(self) -> &'static str {
        match self {
            Attribute::Composition => "Composition",
            Attribute::Color => "Color",
            Attribute::Lighting => "Lighting",
            Attribute::Subject => "Subject",
            Attribute::Originality => "Originality",
            Attribute::TechnicalSkill => "Technical Skill",
            Attribute::Emotion => "Emotion",
            Attribute::Storytelling => "Storytelling",
            Attribute::Clarity => "Clarity",
            Attribute::Creativity => "Creativity",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Value found on an attribute line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    /// A number in 0..=10
    Scored(u8),
    /// The line was there but held no usable number
    Unreadable,
}

impl AttributeValue {
    /// Numeric value, with unreadable lines counting as zero
    pub fn value(self) -> u8 {
        match self {
            AttributeValue::Scored(v) => v,
            AttributeValue::Unreadable => 0,
        }
    }
}

/// Structured result of parsing one model reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// What the model says is in the image
    pub description: String,
    /// Attribute lines that were present in the reply
    pub attributes: BTreeMap<Attribute, AttributeValue>,
    /// Text of the `Reason:` line, if any
    pub final_analysis: Option<String>,
}

impl EvaluationRecord {
    /// Value for an attribute; missing or unreadable lines give 0
    pub fn value(&self, attribute: Attribute) -> u8 {
        self.attributes
            .get(&attribute)
            .map(|v| v.value())
            .unwrap_or(0)
    }

    /// Values that were actually read from the reply
    pub fn parsed_values(&self) -> impl Iterator<Item = u8> + '_ {
        self.attributes.values().filter_map(|v| match v {
            AttributeValue::Scored(n) => Some(*n),
            AttributeValue::Unreadable => None,
        })
    }

    /// Number of attributes that parsed successfully
    pub fn parsed_count(&self) -> usize {
        self.parsed_values().count()
    }
}

/// Token counts reported by the provider for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A scored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub score: Score,
    pub record: EvaluationRecord,
}

/// Everything one evaluation produced
///
/// `usage` is present whenever the model was actually called, including
/// when its reply could not be scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    pub result: std::result::Result<Evaluation, crate::EvaluationFailure>,
    pub usage: Option<TokenUsage>,
}

impl EvaluationOutcome {
    /// Score, if the image was scored
    pub fn score(&self) -> Option<Score> {
        self.result.as_ref().ok().map(|e| e.score)
    }
}
