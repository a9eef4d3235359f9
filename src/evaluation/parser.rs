// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Parsing of the model's `Key: value` reply
//!
//! Replies are untrusted and loosely formatted. Nothing in here panics or
//! returns an error type other than [`EvaluationFailure`]; a reply that
//! cannot be used becomes a failure reason for the log.

use std::collections::BTreeMap;

use super::{Attribute, AttributeValue, EvaluationRecord};
use crate::EvaluationFailure;

/// Every field we look for in a reply, before any validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFields {
    /// Reply text with bold markers removed, used in failure messages
    pub text: String,
    pub description: Option<String>,
    pub attributes: BTreeMap<Attribute, AttributeValue>,
    pub reason: Option<String>,
    /// Full `Score:` line, kept for error messages
    pub score_line: Option<String>,
}

impl ResponseFields {
    /// Scan a reply for known lines. Always succeeds.
    pub fn scan(raw: &str) -> Self {
        let text = raw.replace("**", "").trim().to_string();
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let description = find_value(&lines, "description").map(String::from);
        let reason = find_value(&lines, "reason").map(String::from);
        let score_line = find_line(&lines, "score").map(String::from);

        let mut attributes = BTreeMap::new();
        for attribute in Attribute::ALL {
            if let Some(value) = find_value(&lines, attribute.label()) {
                let parsed = leading_integer(value)
                    .filter(|n| *n <= u64::from(Attribute::MAX_VALUE))
                    .map(|n| AttributeValue::Scored(n as u8))
                    .unwrap_or(AttributeValue::Unreadable);
                attributes.insert(attribute, parsed);
            }
        }

        Self {
            text,
            description,
            attributes,
            reason,
            score_line,
        }
    }

    /// Turn the scanned fields into a record, given a description is present
    pub fn into_record(self) -> Option<EvaluationRecord> {
        Some(EvaluationRecord {
            description: self.description?,
            attributes: self.attributes,
            final_analysis: self.reason,
        })
    }
}

/// Parse a reply into a record.
///
/// The reply must contain a `Description:` line and at least one attribute
/// line with a readable number.
pub fn parse_response(raw: &str) -> Result<EvaluationRecord, EvaluationFailure> {
    let fields = ResponseFields::scan(raw);
    let has_score = fields
        .attributes
        .values()
        .any(|v| matches!(v, AttributeValue::Scored(_)));

    if !has_score {
        return Err(EvaluationFailure::InvalidFormat(fields.text));
    }

    let text = fields.text.clone();
    fields
        .into_record()
        .ok_or(EvaluationFailure::InvalidFormat(text))
}

/// First run of ASCII digits in `value`, e.g. `8` for `"8/10"` or `"[8]"`.
///
/// Returns `None` when there are no digits. A run too long for `u64`
/// saturates to `u64::MAX` so it still reads as out of range.
pub fn leading_integer(value: &str) -> Option<u64> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = &value[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    Some(digits[..end].parse().unwrap_or(u64::MAX))
}

/// First line whose key matches `key`, case-insensitively
fn find_line<'a>(lines: &[&'a str], key: &str) -> Option<&'a str> {
    let prefix = format!("{}:", key.to_lowercase());
    lines
        .iter()
        .copied()
        .find(|line| line.to_lowercase().starts_with(&prefix))
}

/// Trimmed text after the first colon of the matching line
fn find_value<'a>(lines: &[&'a str], key: &str) -> Option<&'a str> {
    find_line(lines, key)
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_reply() {
        let text = "Description: A red bicycle\nComposition: 8\nColor: 7\nReason: Nice framing";
        let record = parse_response(text).unwrap();

        assert_eq!(record.description, "A red bicycle");
        assert_eq!(record.value(Attribute::Composition), 8);
        assert_eq!(record.value(Attribute::Color), 7);
        for attribute in &Attribute::ALL[2..] {
            assert_eq!(record.value(*attribute), 0);
        }
        assert_eq!(record.final_analysis.as_deref(), Some("Nice framing"));
        assert_eq!(record.parsed_count(), 2);
    }

    #[test]
    fn test_missing_reason_is_not_an_error() {
        let record = parse_response("Description: Fog\nLighting: 6").unwrap();
        assert_eq!(record.final_analysis, None);
        assert_eq!(record.value(Attribute::Lighting), 6);
    }

    #[test]
    fn test_bold_markup_and_case() {
        let text = "**Description:** Harbor at dusk\n**TECHNICAL SKILL:** 9\n  \n**reason:** Sharp";
        let record = parse_response(text).unwrap();
        assert_eq!(record.description, "Harbor at dusk");
        assert_eq!(record.value(Attribute::TechnicalSkill), 9);
        assert_eq!(record.final_analysis.as_deref(), Some("Sharp"));
    }

    #[test]
    fn test_out_of_ten_suffix() {
        let record = parse_response("Description: x\nComposition: 8/10\nColor: [7]").unwrap();
        assert_eq!(record.value(Attribute::Composition), 8);
        assert_eq!(record.value(Attribute::Color), 7);
    }

    #[test]
    fn test_only_first_colon_splits() {
        let record =
            parse_response("Description: Sign reading: STOP\nClarity: 5\nReason: Note: faded")
                .unwrap();
        assert_eq!(record.description, "Sign reading: STOP");
        assert_eq!(record.final_analysis.as_deref(), Some("Note: faded"));
    }

    #[test]
    fn test_unreadable_values_default_to_zero() {
        let text = "Description: x\nComposition: n/a\nColor: 42\nEmotion: 4";
        let record = parse_response(text).unwrap();
        assert_eq!(
            record.attributes.get(&Attribute::Composition),
            Some(&AttributeValue::Unreadable)
        );
        assert_eq!(
            record.attributes.get(&Attribute::Color),
            Some(&AttributeValue::Unreadable)
        );
        assert_eq!(record.value(Attribute::Emotion), 4);
        assert_eq!(record.parsed_count(), 1);
    }

    #[test]
    fn test_first_matching_line_wins() {
        let record = parse_response("Description: first\nDescription: second\nColor: 3\nColor: 9")
            .unwrap();
        assert_eq!(record.description, "first");
        assert_eq!(record.value(Attribute::Color), 3);
    }

    #[test]
    fn test_invalid_without_description() {
        let err = parse_response("Composition: 8\nColor: 7").unwrap_err();
        assert_eq!(
            err,
            EvaluationFailure::InvalidFormat("Composition: 8\nColor: 7".to_string())
        );
    }

    #[test]
    fn test_invalid_without_any_score() {
        let err = parse_response("**Description:** A cat\nComposition: great").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid response format: Description: A cat\nComposition: great"
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "Description: Dune\nComposition: 6\nCreativity: 8\nReason: Calm";
        assert_eq!(parse_response(text), parse_response(text));
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("8"), Some(8));
        assert_eq!(leading_integer(" 8/10"), Some(8));
        assert_eq!(leading_integer("7.5"), Some(7));
        assert_eq!(leading_integer("score of 85 overall"), Some(85));
        assert_eq!(leading_integer("none"), None);
        assert_eq!(leading_integer("99999999999999999999999"), Some(u64::MAX));
        assert_eq!(leading_integer("007"), Some(7));
    }
}
