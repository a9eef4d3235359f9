// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;

use aesthete::evaluation::parser::{leading_integer, parse_response};
use aesthete::evaluation::score::{average_score, ScoringMode};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(record) = parse_response(text) {
        if let Ok(score) = average_score(&record) {
            assert!((1..=100).contains(&score.value()));
        }
    }

    if let Ok(evaluation) = ScoringMode::DirectScore.evaluate(text) {
        assert!((1..=100).contains(&evaluation.score.value()));
    }

    let _ = leading_integer(text);
});
