// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Score derivation from parsed replies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::parser::{leading_integer, ResponseFields};
use super::{Evaluation, EvaluationRecord};
use crate::EvaluationFailure;

/// An overall score in 1..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    /// Returns `None` outside 1..=100
    pub fn new(value: u64) -> Option<Self> {
        if (u64::from(Self::MIN)..=u64::from(Self::MAX)).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    /// Clamp any value into range
    pub fn saturating(value: u64) -> Self {
        Self(value.clamp(u64::from(Self::MIN), u64::from(Self::MAX)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u64> for Score {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score {} is outside 1-100", value))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the overall score is derived from a reply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Mean of the attribute values that parsed, scaled to 1-100
    #[default]
    AveragedAttributes,
    /// The reply's own `Score: N` line, validated to 1-100
    DirectScore,
}

impl ScoringMode {
    /// Parse a reply and derive its score under this mode
    pub fn evaluate(self, raw: &str) -> Result<Evaluation, EvaluationFailure> {
        match self {
            ScoringMode::AveragedAttributes => {
                let record = super::parse_response(raw)?;
                let score = average_score(&record)?;
                Ok(Evaluation { score, record })
            }
            ScoringMode::DirectScore => direct_score(raw),
        }
    }
}

impl FromStr for ScoringMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "averaged" | "averaged_attributes" | "average" => Ok(ScoringMode::AveragedAttributes),
            "direct" | "direct_score" => Ok(ScoringMode::DirectScore),
            other => Err(format!(
                "unknown scoring mode '{}' (expected 'averaged' or 'direct')",
                other
            )),
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::AveragedAttributes => f.write_str("averaged_attributes"),
            ScoringMode::DirectScore => f.write_str("direct_score"),
        }
    }
}

/// `sum * 10 / parsed_count`, clamped to 1..=100
pub fn average_score(record: &EvaluationRecord) -> Result<Score, EvaluationFailure> {
    let count = record.parsed_count() as u64;
    if count == 0 {
        return Err(EvaluationFailure::NoScores);
    }
    let sum: u64 = record.parsed_values().map(u64::from).sum();
    Ok(Score::saturating(sum * 10 / count))
}

/// Score taken from an explicit `Score:` line.
///
/// Needs description, score and reason lines; attribute lines are kept for
/// the log but do not affect the score.
pub fn direct_score(raw: &str) -> Result<Evaluation, EvaluationFailure> {
    let fields = ResponseFields::scan(raw);

    let score_line = match (&fields.description, &fields.reason, &fields.score_line) {
        (Some(_), Some(_), Some(line)) => line.clone(),
        _ => return Err(EvaluationFailure::InvalidFormat(fields.text)),
    };

    let value = score_line
        .split_once(':')
        .and_then(|(_, v)| leading_integer(v))
        .ok_or_else(|| EvaluationFailure::UnparsableScore(score_line.clone()))?;
    let score = Score::new(value).ok_or(EvaluationFailure::ScoreOutOfRange(value))?;

    let text = fields.text.clone();
    let record = fields
        .into_record()
        .ok_or(EvaluationFailure::InvalidFormat(text))?;

    Ok(Evaluation { score, record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{Attribute, AttributeValue};

    fn record_with(values: &[(Attribute, AttributeValue)]) -> EvaluationRecord {
        EvaluationRecord {
            description: "test".to_string(),
            attributes: values.iter().copied().collect(),
            final_analysis: None,
        }
    }

    #[test]
    fn test_all_fives_score_fifty() {
        let values: Vec<_> = Attribute::ALL
            .iter()
            .map(|a| (*a, AttributeValue::Scored(5)))
            .collect();
        assert_eq!(average_score(&record_with(&values)).unwrap().value(), 50);
    }

    #[test]
    fn test_average_rounds_down() {
        // 250 / 3 = 83.33
        let record = record_with(&[
            (Attribute::Composition, AttributeValue::Scored(9)),
            (Attribute::Color, AttributeValue::Scored(8)),
            (Attribute::Lighting, AttributeValue::Scored(8)),
        ]);
        assert_eq!(average_score(&record).unwrap().value(), 83);
    }

    #[test]
    fn test_unreadable_values_are_not_counted() {
        let record = record_with(&[
            (Attribute::Composition, AttributeValue::Scored(6)),
            (Attribute::Color, AttributeValue::Unreadable),
        ]);
        assert_eq!(average_score(&record).unwrap().value(), 60);
    }

    #[test]
    fn test_average_is_clamped() {
        let zeros = record_with(&[(Attribute::Clarity, AttributeValue::Scored(0))]);
        assert_eq!(average_score(&zeros).unwrap().value(), 1);

        let tens = record_with(&[(Attribute::Clarity, AttributeValue::Scored(10))]);
        assert_eq!(average_score(&tens).unwrap().value(), 100);
    }

    #[test]
    fn test_no_parsed_values() {
        let record = record_with(&[(Attribute::Color, AttributeValue::Unreadable)]);
        assert_eq!(average_score(&record), Err(EvaluationFailure::NoScores));
    }

    #[test]
    fn test_direct_score_mode() {
        let text = "Description: Beach\nComposition: 3\nScore: 72\nReason: Warm tones";
        let evaluation = ScoringMode::DirectScore.evaluate(text).unwrap();
        assert_eq!(evaluation.score.value(), 72);
        assert_eq!(evaluation.record.value(Attribute::Composition), 3);
        assert_eq!(evaluation.record.final_analysis.as_deref(), Some("Warm tones"));
    }

    #[test]
    fn test_direct_score_requires_reason() {
        let err = direct_score("Description: Beach\nScore: 72").unwrap_err();
        assert!(matches!(err, EvaluationFailure::InvalidFormat(_)));
    }

    #[test]
    fn test_direct_score_range() {
        let err = direct_score("Description: x\nScore: 150\nReason: y").unwrap_err();
        assert_eq!(err, EvaluationFailure::ScoreOutOfRange(150));

        let err = direct_score("Description: x\nScore: 0\nReason: y").unwrap_err();
        assert_eq!(err.to_string(), "Invalid score value: 0");
    }

    #[test]
    fn test_direct_score_overflow_is_range_error() {
        let err = direct_score("Description: x\nScore: 99999999999999999999999\nReason: y")
            .unwrap_err();
        assert_eq!(err, EvaluationFailure::ScoreOutOfRange(u64::MAX));

        let record = crate::evaluation::parse_response(
            "Description: x\nColor: 99999999999999999999999\nClarity: 6",
        )
        .unwrap();
        assert_eq!(average_score(&record), Ok(Score::new(60).unwrap()));
    }

    #[test]
    fn test_direct_score_unparsable() {
        let err = direct_score("Description: x\nScore: high\nReason: y").unwrap_err();
        assert_eq!(err.to_string(), "Could not parse score from: Score: high");
    }

    #[test]
    fn test_modes_diverge_on_same_reply() {
        let text = "Description: x\nComposition: 5\nColor: 5\nScore: 90\nReason: y";
        assert_eq!(ScoringMode::AveragedAttributes.evaluate(text).unwrap().score.value(), 50);
        assert_eq!(ScoringMode::DirectScore.evaluate(text).unwrap().score.value(), 90);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("direct".parse::<ScoringMode>(), Ok(ScoringMode::DirectScore));
        assert_eq!(
            "Averaged-Attributes".parse::<ScoringMode>(),
            Ok(ScoringMode::AveragedAttributes)
        );
        assert!("median".parse::<ScoringMode>().is_err());
    }

    #[test]
    fn test_score_bounds() {
        assert!(Score::new(0).is_none());
        assert!(Score::new(101).is_none());
        assert_eq!(Score::new(100).map(Score::value), Some(100));
        assert_eq!(Score::saturating(0).value(), 1);
        assert_eq!(Score::saturating(1000).value(), 100);
    }
}
